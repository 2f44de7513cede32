//! Two-pass assembler for sensor scripts.
//!
//! Sensor scripts are small line-oriented programs that drive a sensor over
//! I2C. This crate compiles them into the fixed two-word instruction records
//! consumed by the sensor firmware.
//!
//! # Example
//!
//! ```
//! use sensorasm_assembler::{assemble, AssemblerConfig};
//!
//! let source = b"
//! .function main
//! MOVB R0, $10
//! LOOP:
//! SUB R0, R0, $1
//! JNZ R0, @LOOP
//! .endfunction
//! ";
//!
//! let image = assemble(source, &AssemblerConfig::default()).expect("failed to assemble");
//! assert_eq!(image.instructions.len(), 3);
//! assert_eq!(image.function("main"), Some(0));
//! ```
//!
//! # Pipeline
//!
//! A [`Program`] moves through three stages:
//!
//! 1. **Parse** - Lines are split into words and analyzed one at a time.
//!    Instructions are validated against their operand shape and appended
//!    to the open function; labels and functions go into bounded tables.
//! 2. **Link** - Label references are resolved within their own function,
//!    function references against the global function table.
//! 3. **Encode** - Each instruction is packed into two 32-bit words.
//!
//! Every table has a hard capacity from [`AssemblerConfig`]. The first
//! failure aborts the pipeline and leaves the program in [`Stage::Failed`].

pub mod builder;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod image;
pub mod instruction;
pub mod lexer;
pub mod linker;
pub mod literal;
pub mod operand;
pub mod parser;
pub mod program;
pub mod symbols;

use thiserror::Error;

/// Assembler errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssemblerError {
    #[error("line {line}: {error}")]
    Parse {
        line: usize,
        #[source]
        error: parser::ParseError,
    },

    #[error(transparent)]
    Link(#[from] linker::LinkError),

    #[error(transparent)]
    Encode(#[from] encoder::EncodeError),

    #[error("invalid config: {0}")]
    Config(#[from] config::ConfigError),

    #[error("cannot {operation} a program in stage {stage:?}")]
    InvalidStage {
        operation: &'static str,
        stage: program::Stage,
    },
}

impl AssemblerError {
    /// Source line for parse failures
    pub fn line(&self) -> Option<usize> {
        match self {
            AssemblerError::Parse { line, .. } => Some(*line),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AssemblerError>;

/// Compile a script into a firmware image
///
/// Runs parse, link and encode on a fresh [`Program`].
///
/// # Errors
///
/// Returns the first error hit by any stage:
/// - Lexical or syntax errors, with the 1-based source line
/// - Scoping errors such as a label outside a function
/// - A table exceeding its configured capacity
/// - An unresolved label or function reference
pub fn assemble(source: &[u8], config: &AssemblerConfig) -> Result<Image> {
    assemble_with_program(source, config).map(|(_, image)| image)
}

/// Compile a script and return the linked program alongside the image
///
/// Useful for listings and debugging, where the symbol tables and source
/// lines are wanted as well as the encoded words.
pub fn assemble_with_program(source: &[u8], config: &AssemblerConfig) -> Result<(Program, Image)> {
    let span = tracing::info_span!("assemble", bytes = source.len());
    let _enter = span.enter();

    let mut program = Program::new(config.clone())?;
    program.parse(source)?;
    program.link()?;
    let image = program.encode()?;

    tracing::info!(
        instructions = image.instructions.len(),
        functions = image.functions.len(),
        "assembled script"
    );
    Ok((program, image))
}

// Re-export commonly used types
pub use config::{AssemblerConfig, ConfigError};
pub use decoder::{decode, DecodeError, Decoded};
pub use encoder::{EncodeError, EncodedInstruction};
pub use image::{FunctionEntry, Image, ImageError};
pub use instruction::{Instruction, Opcode, Shape};
pub use linker::LinkError;
pub use operand::{Bank, Memory, Offset, Operand, OperandError, Symbol};
pub use parser::ParseError;
pub use program::{Program, Stage};
pub use symbols::{Function, Label, TableFull};
