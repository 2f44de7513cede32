//! Per-shape instruction builders.
//!
//! Every builder checks that a function is open and that the operand count
//! matches the opcode, parses each operand, checks the operand kinds against
//! the opcode's signature and appends the instruction.

use crate::instruction::{Opcode, Shape};
use crate::operand::{parse_operand, Context, Operand, OperandKind};
use crate::parser::ParseError;
use crate::program::Program;
use thiserror::Error;

/// Operand kinds accepted at one position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Register,
    RegisterOrImmediate,
    RegisterOrMemory,
    Value,
    Label,
    Function,
}

impl Accept {
    pub fn accepts(self, operand: &Operand) -> bool {
        match self {
            Accept::Register => operand.is_register(),
            Accept::RegisterOrImmediate => operand.is_reg_or_imm(),
            Accept::RegisterOrMemory => operand.is_reg_or_mem(),
            Accept::Value => operand.is_value(),
            Accept::Label => operand.kind() == OperandKind::Label,
            Accept::Function => operand.kind() == OperandKind::Function,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Accept::Register => "register",
            Accept::RegisterOrImmediate => "register or immediate",
            Accept::RegisterOrMemory => "register or memory",
            Accept::Value => "register, memory or immediate",
            Accept::Label => "label",
            Accept::Function => "function",
        }
    }
}

/// Operand signature of a shape
pub fn signature(shape: Shape) -> &'static [Accept] {
    use Accept::*;
    match shape {
        Shape::Alu3 => &[Register, Register, RegisterOrImmediate],
        Shape::Alu2 => &[Register, RegisterOrImmediate],
        Shape::Mov => &[RegisterOrMemory, Value],
        Shape::Jump => &[RegisterOrImmediate, Label],
        Shape::Call => &[Function],
        Shape::Wi2c => &[RegisterOrImmediate, RegisterOrImmediate, RegisterOrImmediate],
        Shape::Ri2c => &[Register, RegisterOrImmediate, RegisterOrImmediate],
    }
}

/// Operand rejected by an opcode's signature
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeMismatch {
    #[error("expected {expected} operands, found {found}")]
    Arity { expected: usize, found: usize },

    #[error("operand {position}: expected {expected}, found {found}")]
    Kind {
        position: usize,
        expected: &'static str,
        found: OperandKind,
    },
}

/// Check operand kinds against the opcode's signature.
pub fn check_shape(opcode: Opcode, operands: &[Operand]) -> Result<(), ShapeMismatch> {
    let accepts = signature(opcode.shape());
    if accepts.len() != operands.len() {
        return Err(ShapeMismatch::Arity {
            expected: accepts.len(),
            found: operands.len(),
        });
    }

    for (position, (accept, operand)) in accepts.iter().zip(operands).enumerate() {
        if !accept.accepts(operand) {
            return Err(ShapeMismatch::Kind {
                position,
                expected: accept.describe(),
                found: operand.kind(),
            });
        }
    }

    Ok(())
}

/// Build one instruction from its operand words and append it to `program`.
///
/// Returns the new instruction's index. Nothing is committed on failure.
pub(crate) fn build(program: &mut Program, opcode: Opcode, args: &[&str]) -> Result<usize, ParseError> {
    if program.current_function().is_none() {
        return Err(ParseError::OutsideFunction("instruction"));
    }

    let config = program.config();
    if args.len() > config.max_operands {
        return Err(ParseError::TooManyOperands {
            found: args.len(),
            max: config.max_operands,
        });
    }
    if args.len() != opcode.arity() {
        return Err(ParseError::Arity {
            mnemonic: opcode.mnemonic(),
            expected: opcode.arity(),
            found: args.len(),
        });
    }

    let context = match opcode.shape() {
        Shape::Call => Context::Call,
        _ => Context::Plain,
    };
    let operands = args
        .iter()
        .map(|arg| parse_operand(arg, context, config))
        .collect::<Result<Vec<_>, _>>()?;

    check_shape(opcode, &operands).map_err(|mismatch| ParseError::Operands {
        mnemonic: opcode.mnemonic(),
        mismatch,
    })?;

    program.push_instruction(opcode, operands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssemblerConfig;

    fn program_in_function() -> Program {
        let mut program = Program::new(AssemblerConfig::default()).unwrap();
        program.open_function("main").unwrap();
        program
    }

    fn build_line(program: &mut Program, line: &str) -> Result<usize, ParseError> {
        let words: Vec<&str> = line.split([' ', ',']).filter(|w| !w.is_empty()).collect();
        let opcode = Opcode::from_mnemonic(words[0]).unwrap();
        build(program, opcode, &words[1..])
    }

    #[test]
    fn test_signatures_match_arity() {
        for shape in [
            Shape::Alu3,
            Shape::Alu2,
            Shape::Mov,
            Shape::Jump,
            Shape::Call,
            Shape::Wi2c,
            Shape::Ri2c,
        ] {
            assert_eq!(signature(shape).len(), shape.arity());
        }
    }

    #[test]
    fn test_accepted_shapes() {
        let mut program = program_in_function();
        for line in [
            "ADD R1, R2, R3",
            "XOR R1, R2, $0xff",
            "SHL R1, $2",
            "SHR R1, R2",
            "MOVB R0, $1",
            "MOVW M0[R1], M1[$4]",
            "MOVDW M1[$2], R3",
            "JGEZ $1, @later",
            "CALL @helper",
            "WI2C $0x3008, R1, $1",
            "RI2C R4, $0x3008, R2",
        ] {
            assert!(build_line(&mut program, line).is_ok(), "{}", line);
        }
        assert_eq!(program.instructions().len(), 11);
    }

    #[test]
    fn test_arity_rejected() {
        let mut program = program_in_function();
        assert!(matches!(
            build_line(&mut program, "ADD R1, R2"),
            Err(ParseError::Arity {
                mnemonic: "ADD",
                expected: 3,
                found: 2
            })
        ));
        assert!(program.instructions().is_empty());
    }

    #[test]
    fn test_too_many_operands() {
        let mut program = program_in_function();
        assert!(matches!(
            build_line(&mut program, "ADD R1, R2, R3, R4, R5"),
            Err(ParseError::TooManyOperands { found: 5, max: 4 })
        ));
    }

    #[test]
    fn test_kind_rejections() {
        let mut program = program_in_function();
        for (line, position) in [
            ("MOV $5, R1", 0),
            ("RI2C $1, R2, R3", 0),
            ("ADD R1, $2, R3", 1),
            ("JNZ R0, R1", 1),
            ("JNZ M0[R1], @x", 0),
            ("WI2C @addr, R1, $1", 0),
            ("WI2C $1, @value, $1", 1),
            ("WI2C $1, R1, @len", 2),
        ] {
            match build_line(&mut program, line) {
                Err(ParseError::Operands {
                    mismatch: ShapeMismatch::Kind { position: p, .. },
                    ..
                }) => assert_eq!(p, position, "{}", line),
                other => panic!("{}: unexpected {:?}", line, other),
            }
        }
        assert!(program.instructions().is_empty());
    }

    #[test]
    fn test_call_takes_function() {
        let mut program = program_in_function();
        build_line(&mut program, "CALL @helper").unwrap();
        assert_eq!(
            program.instructions()[0].operands[0].kind(),
            OperandKind::Function
        );
    }

    #[test]
    fn test_outside_function() {
        let mut program = Program::new(AssemblerConfig::default()).unwrap();
        assert_eq!(
            build_line(&mut program, "ADD R1, R2, R3"),
            Err(ParseError::OutsideFunction("instruction"))
        );
    }

    #[test]
    fn test_malformed_operand() {
        let mut program = program_in_function();
        assert!(matches!(
            build_line(&mut program, "ADD R1, R2, X5"),
            Err(ParseError::Operand(_))
        ));
    }
}
