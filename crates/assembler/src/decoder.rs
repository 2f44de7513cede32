//! Decode encoded instruction words back into readable form.
//!
//! Labels and functions come back as their resolved indices, printed as
//! `@<index>`.

use crate::encoder::layout::*;
use crate::encoder::EncodedInstruction;
use crate::instruction::{self, Opcode, Shape};
use crate::operand::{Bank, Memory, Offset, Operand, Symbol};
use std::fmt;
use thiserror::Error;

/// Decoder errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    #[error("invalid operand type {code} in {mnemonic}")]
    InvalidOperandType { mnemonic: &'static str, code: u32 },
}

/// A decoded instruction
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        instruction::write_operation(f, self.opcode, &self.operands)
    }
}

fn bits(word: u32, shift: u32, width: u32) -> u32 {
    (word >> shift) & mask(width)
}

fn index_symbol(index: u32) -> Symbol {
    Symbol {
        name: index.to_string(),
        index: Some(index),
    }
}

fn reg_or_imm(opcode: Opcode, code: u32, value: u32) -> Result<Operand, DecodeError> {
    match code {
        TYPE_REGISTER => Ok(Operand::Register(value as u8)),
        TYPE_IMMEDIATE => Ok(Operand::Immediate(value)),
        _ => Err(DecodeError::InvalidOperandType {
            mnemonic: opcode.mnemonic(),
            code,
        }),
    }
}

fn memory(bank: u32, off_type: u32, value: u32) -> Operand {
    let offset = if off_type == OFFSET_IMMEDIATE {
        Offset::Immediate(value)
    } else {
        Offset::Register(value as u8)
    };
    Operand::Memory(Memory {
        bank: Bank::from_index(bank),
        offset,
    })
}

/// Decode one instruction record.
pub fn decode(word: EncodedInstruction) -> Result<Decoded, DecodeError> {
    let EncodedInstruction { part1, part2 } = word;
    let opcode =
        Opcode::from_byte(word.opcode_bits()).ok_or(DecodeError::UnknownOpcode(word.opcode_bits()))?;

    let operands = match opcode.shape() {
        Shape::Alu3 | Shape::Alu2 => {
            let dst = Operand::Register(bits(part1, ALU_DST_SHIFT, ALU_REG_BITS) as u8);
            let arg = reg_or_imm(opcode, bits(part1, ALU_ARG_TYPE_SHIFT, TYPE_BITS), part2)?;
            if opcode.shape() == Shape::Alu2 {
                vec![dst, arg]
            } else {
                let src = Operand::Register(bits(part1, ALU_SRC_SHIFT, ALU_REG_BITS) as u8);
                vec![dst, src, arg]
            }
        }
        Shape::Mov => {
            let dst_value = bits(part1, MOV_DST_VALUE_SHIFT, MOV_DST_VALUE_BITS);
            let dst = match bits(part1, MOV_DST_KIND_SHIFT, TYPE_BITS) {
                TYPE_REGISTER => Operand::Register(dst_value as u8),
                TYPE_MEMORY => memory(
                    bits(part1, MOV_DST_BANK_SHIFT, 1),
                    bits(part1, MOV_DST_OFF_TYPE_SHIFT, 1),
                    dst_value,
                ),
                code => {
                    return Err(DecodeError::InvalidOperandType {
                        mnemonic: opcode.mnemonic(),
                        code,
                    })
                }
            };

            let src_reg = bits(part1, 0, MOV_SRC_REG_BITS);
            let src = match bits(part1, MOV_SRC_KIND_SHIFT, TYPE_BITS) {
                TYPE_REGISTER => Operand::Register(src_reg as u8),
                TYPE_IMMEDIATE => Operand::Immediate(part2),
                _ => {
                    let off_type = bits(part1, MOV_SRC_OFF_TYPE_SHIFT, 1);
                    let value = if off_type == OFFSET_IMMEDIATE { part2 } else { src_reg };
                    memory(bits(part1, MOV_SRC_BANK_SHIFT, 1), off_type, value)
                }
            };
            vec![dst, src]
        }
        Shape::Jump => {
            let cond = reg_or_imm(opcode, bits(part1, JUMP_COND_TYPE_SHIFT, TYPE_BITS), part2)?;
            let target = bits(part1, 0, TARGET_BITS);
            vec![cond, Operand::Label(index_symbol(target))]
        }
        Shape::Call => vec![Operand::Function(index_symbol(bits(part1, 0, TARGET_BITS)))],
        Shape::Wi2c | Shape::Ri2c => {
            let addr = reg_or_imm(
                opcode,
                bits(part1, I2C_ADDR_TYPE_SHIFT, 1),
                bits(part1, 0, I2C_ADDR_BITS),
            )?;
            let len = reg_or_imm(
                opcode,
                bits(part1, I2C_LEN_TYPE_SHIFT, 1),
                bits(part1, I2C_LEN_SHIFT, I2C_LEN_BITS),
            )?;
            if opcode == Opcode::Wi2c {
                let value = reg_or_imm(opcode, bits(part1, I2C_VALUE_TYPE_SHIFT, 1), part2)?;
                vec![addr, value, len]
            } else {
                vec![Operand::Register(part2 as u8), addr, len]
            }
        }
    };

    Ok(Decoded { opcode, operands })
}

/// Decode a whole instruction array into a numbered listing.
pub fn listing(words: &[EncodedInstruction]) -> Result<Vec<String>, DecodeError> {
    words
        .iter()
        .enumerate()
        .map(|(index, word)| {
            decode(*word).map(|decoded| {
                format!(
                    "{:4}: {:08x} {:08x}  {}",
                    index, word.part1, word.part2, decoded
                )
            })
        })
        .collect()
}
