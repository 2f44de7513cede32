//! Syntax analysis and the line-by-line parse loop.

use crate::builder::{self, ShapeMismatch};
use crate::instruction::Opcode;
use crate::lexer::{split_words, LexError, LineReader};
use crate::operand::OperandError;
use crate::program::Program;
use crate::symbols::TableFull;
use crate::AssemblerError;
use thiserror::Error;

/// Parse errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Operand(#[from] OperandError),

    #[error(transparent)]
    TableFull(#[from] TableFull),

    #[error("unknown instruction: '{0}'")]
    UnknownMnemonic(String),

    #[error("unknown directive: '{0}'")]
    UnknownDirective(String),

    #[error("invalid label: '{0}'")]
    InvalidLabel(String),

    #[error("unexpected text after '{0}'")]
    TrailingTokens(String),

    #[error("{directive} expects {expected} argument(s), found {found}")]
    DirectiveArguments {
        directive: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{mnemonic} expects {expected} operands, found {found}")]
    Arity {
        mnemonic: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("too many operands: {found} (max {max})")]
    TooManyOperands { found: usize, max: usize },

    #[error("{mnemonic}: {mismatch}")]
    Operands {
        mnemonic: &'static str,
        mismatch: ShapeMismatch,
    },

    #[error("{0} outside of a function")]
    OutsideFunction(&'static str),

    #[error("function '{name}' opened inside function '{open}'")]
    NestedFunction { name: String, open: String },

    #[error(".endfunction without an open function")]
    NoOpenFunction,

    #[error("function '{0}' is never closed")]
    UnclosedFunction(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Analyze one split line and apply it to `program`.
pub(crate) fn analyze(program: &mut Program, words: &[&str]) -> Result<()> {
    let Some((&first, args)) = words.split_first() else {
        return Ok(());
    };

    if let Some(opcode) = Opcode::from_mnemonic(first) {
        builder::build(program, opcode, args)?;
        return Ok(());
    }

    match first {
        ".function" => {
            if args.len() != 1 {
                return Err(ParseError::DirectiveArguments {
                    directive: ".function",
                    expected: 1,
                    found: args.len(),
                });
            }
            program.open_function(args[0])?;
        }
        ".endfunction" => {
            if !args.is_empty() {
                return Err(ParseError::DirectiveArguments {
                    directive: ".endfunction",
                    expected: 0,
                    found: args.len(),
                });
            }
            program.close_function()?;
        }
        _ if first.ends_with(':') => {
            if !args.is_empty() {
                return Err(ParseError::TrailingTokens(first.to_string()));
            }
            program.add_label(first)?;
        }
        _ if first.starts_with('.') => {
            return Err(ParseError::UnknownDirective(first.to_string()));
        }
        _ => return Err(ParseError::UnknownMnemonic(first.to_string())),
    }

    Ok(())
}

/// Parse a whole script buffer into `program`.
///
/// Stops at the first error, which carries the 1-based line it occurred on.
pub(crate) fn parse_source(program: &mut Program, source: &[u8]) -> std::result::Result<(), AssemblerError> {
    let config = program.config().clone();
    let mut reader = LineReader::new(source, config.max_line_len);

    while let Some(line) = reader.next() {
        let line_no = reader.line_number();
        program.set_line(line_no);

        let result = line.map_err(ParseError::from).and_then(|text| {
            let words = split_words(&text, &config)?;
            if words.is_empty() {
                return Ok(());
            }
            tracing::trace!(line = line_no, words = words.len(), "analyzing '{}'", text);
            analyze(program, &words)
        });

        result.map_err(|error| AssemblerError::Parse {
            line: line_no,
            error,
        })?;
    }

    if let Some(name) = program.open_function_name() {
        return Err(AssemblerError::Parse {
            line: reader.line_number(),
            error: ParseError::UnclosedFunction(name.to_string()),
        });
    }

    Ok(())
}
