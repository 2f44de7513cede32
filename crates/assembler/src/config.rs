//! Assembler limits.
//!
//! Every table the assembler fills is capped by one of these limits. The
//! limits are fixed for the lifetime of a compile.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Widest register index the encoder can pack (6-bit fields).
pub const REGISTER_FIELD_LIMIT: usize = 64;

/// Errors reported by [`AssemblerConfig::validate`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("limit '{0}' must be greater than zero")]
    Zero(&'static str),

    #[error("max_registers {0} exceeds the encodable maximum of {REGISTER_FIELD_LIMIT}")]
    TooManyRegisters(usize),

    #[error("max_name_len {0} exceeds max_word_len {1}")]
    NameLongerThanWord(usize, usize),
}

/// Configuration for one compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Maximum number of instructions in a program.
    pub max_instructions: usize,
    /// Maximum number of labels across all functions.
    pub max_labels: usize,
    /// Maximum number of functions.
    pub max_functions: usize,
    /// Maximum line length in bytes, excluding line terminators.
    pub max_line_len: usize,
    /// Maximum number of words on one line.
    pub max_words_per_line: usize,
    /// Maximum length of a single word.
    pub max_word_len: usize,
    /// Number of general purpose registers (`R0` .. `R{n-1}`).
    pub max_registers: usize,
    /// Maximum length of a label or function name.
    pub max_name_len: usize,
    /// Maximum number of operands of any instruction.
    pub max_operands: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_instructions: 256,
            max_labels: 128,
            max_functions: 32,
            max_line_len: 256,
            max_words_per_line: 8,
            max_word_len: 64,
            max_registers: 16,
            max_name_len: 32,
            max_operands: 4,
        }
    }
}

impl AssemblerConfig {
    /// Check that the limits are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("max_instructions", self.max_instructions),
            ("max_labels", self.max_labels),
            ("max_functions", self.max_functions),
            ("max_line_len", self.max_line_len),
            ("max_words_per_line", self.max_words_per_line),
            ("max_word_len", self.max_word_len),
            ("max_registers", self.max_registers),
            ("max_name_len", self.max_name_len),
            ("max_operands", self.max_operands),
        ];
        if let Some(&(name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero(name));
        }
        if self.max_registers > REGISTER_FIELD_LIMIT {
            return Err(ConfigError::TooManyRegisters(self.max_registers));
        }
        if self.max_name_len > self.max_word_len {
            return Err(ConfigError::NameLongerThanWord(
                self.max_name_len,
                self.max_word_len,
            ));
        }
        Ok(())
    }
}
