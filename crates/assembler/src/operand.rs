//! Operand model and the sigil-driven operand parser.
//!
//! | Sigil | Operand |
//! |---|---|
//! | `R<n>` | register `n` |
//! | `$<n>`, `$0x<h>` | immediate |
//! | `@<name>` | label, or function inside `CALL` |
//! | `M0[...]`, `M1[...]` | memory, offset is a register or immediate |

use crate::config::AssemblerConfig;
use crate::literal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Operand errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperandError {
    #[error("operand too short: '{0}'")]
    TooShort(String),

    #[error("unknown operand sigil: '{0}'")]
    UnknownSigil(String),

    #[error("invalid register: '{0}'")]
    InvalidRegister(String),

    #[error("register out of range: '{token}' (R0-R{max})")]
    RegisterOutOfRange { token: String, max: usize },

    #[error("invalid immediate: '{0}'")]
    InvalidImmediate(String),

    #[error("invalid symbol name: '{0}'")]
    InvalidName(String),

    #[error("symbol name too long: '{name}' (max {max} characters)")]
    NameTooLong { name: String, max: usize },

    #[error("invalid memory operand: '{0}'")]
    InvalidMemory(String),

    #[error("memory offset must be a register or immediate: '{0}'")]
    InvalidMemoryOffset(String),
}

pub type Result<T> = std::result::Result<T, OperandError>;

/// Memory bank selected by `M0` / `M1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bank {
    M0,
    M1,
}

impl Bank {
    pub fn index(self) -> u32 {
        match self {
            Bank::M0 => 0,
            Bank::M1 => 1,
        }
    }

    pub fn from_index(index: u32) -> Self {
        if index == 0 {
            Bank::M0
        } else {
            Bank::M1
        }
    }
}

/// Offset inside a memory bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Offset {
    Register(u8),
    Immediate(u32),
}

/// Memory reference `M<bank>[<offset>]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub bank: Bank,
    pub offset: Offset,
}

/// A symbolic reference, resolved to a numeric index by the linker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub index: Option<u32>,
}

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }
}

/// Instruction operand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Register(u8),
    Immediate(u32),
    Memory(Memory),
    Label(Symbol),
    Function(Symbol),
}

/// Operand kind, used in diagnostics and shape checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Register,
    Immediate,
    Memory,
    Label,
    Function,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperandKind::Register => "register",
            OperandKind::Immediate => "immediate",
            OperandKind::Memory => "memory",
            OperandKind::Label => "label",
            OperandKind::Function => "function",
        };
        f.write_str(name)
    }
}

impl Operand {
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::Register(_) => OperandKind::Register,
            Operand::Immediate(_) => OperandKind::Immediate,
            Operand::Memory(_) => OperandKind::Memory,
            Operand::Label(_) => OperandKind::Label,
            Operand::Function(_) => OperandKind::Function,
        }
    }

    pub fn is_register(&self) -> bool {
        matches!(self, Operand::Register(_))
    }

    pub fn is_reg_or_imm(&self) -> bool {
        matches!(self, Operand::Register(_) | Operand::Immediate(_))
    }

    pub fn is_reg_or_mem(&self) -> bool {
        matches!(self, Operand::Register(_) | Operand::Memory(_))
    }

    pub fn is_value(&self) -> bool {
        matches!(
            self,
            Operand::Register(_) | Operand::Immediate(_) | Operand::Memory(_)
        )
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "R{}", r),
            Operand::Immediate(v) => write!(f, "${}", v),
            Operand::Memory(mem) => {
                write!(f, "M{}[", mem.bank.index())?;
                match mem.offset {
                    Offset::Register(r) => write!(f, "R{}]", r),
                    Offset::Immediate(v) => write!(f, "${}]", v),
                }
            }
            Operand::Label(sym) | Operand::Function(sym) => write!(f, "@{}", sym.name),
        }
    }
}

/// Where an operand appears; `@name` means a function only inside `CALL`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Plain,
    Call,
}

/// Parse one operand token.
pub fn parse_operand(token: &str, context: Context, config: &AssemblerConfig) -> Result<Operand> {
    if token.len() < 2 {
        return Err(OperandError::TooShort(token.to_string()));
    }

    match token.as_bytes()[0] {
        b'R' => parse_register(token, config).map(Operand::Register),
        b'$' => literal::parse_u32(&token[1..], true)
            .map(Operand::Immediate)
            .ok_or_else(|| OperandError::InvalidImmediate(token.to_string())),
        b'@' => {
            let symbol = Symbol::new(parse_name(&token[1..], config)?);
            Ok(match context {
                Context::Plain => Operand::Label(symbol),
                Context::Call => Operand::Function(symbol),
            })
        }
        b'M' => parse_memory(token, config).map(Operand::Memory),
        _ => Err(OperandError::UnknownSigil(token.to_string())),
    }
}

fn parse_register(token: &str, config: &AssemblerConfig) -> Result<u8> {
    let index = literal::parse_u32(&token[1..], false)
        .ok_or_else(|| OperandError::InvalidRegister(token.to_string()))?;

    if index as usize >= config.max_registers {
        return Err(OperandError::RegisterOutOfRange {
            token: token.to_string(),
            max: config.max_registers - 1,
        });
    }

    Ok(index as u8)
}

/// Validate a label or function name.
pub fn parse_name<'t>(name: &'t str, config: &AssemblerConfig) -> Result<&'t str> {
    if name.is_empty() || name.contains(|c: char| "@$[]:".contains(c)) {
        return Err(OperandError::InvalidName(name.to_string()));
    }
    if name.chars().count() > config.max_name_len {
        return Err(OperandError::NameTooLong {
            name: name.to_string(),
            max: config.max_name_len,
        });
    }
    Ok(name)
}

fn parse_memory(token: &str, config: &AssemblerConfig) -> Result<Memory> {
    let bytes = token.as_bytes();
    let bank = match bytes[1] {
        b'0' => Bank::M0,
        b'1' => Bank::M1,
        _ => return Err(OperandError::InvalidMemory(token.to_string())),
    };

    let inner = token[2..]
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| OperandError::InvalidMemory(token.to_string()))?;

    let offset = match parse_operand(inner, Context::Plain, config) {
        Ok(Operand::Register(r)) => Offset::Register(r),
        Ok(Operand::Immediate(v)) => Offset::Immediate(v),
        _ => return Err(OperandError::InvalidMemoryOffset(token.to_string())),
    };

    Ok(Memory { bank, offset })
}
