//! Binary encoding of linked instructions.
//!
//! Each instruction becomes two 32-bit words. The opcode sits in the top six
//! bits of the first word; see [`layout`] for the remaining fields.

use crate::builder::{check_shape, ShapeMismatch};
use crate::instruction::{Instruction, Shape};
use crate::operand::{Memory, Offset, Operand};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field positions shared by the encoder and decoder
pub mod layout {
    pub const OPCODE_SHIFT: u32 = 26;
    pub const OPCODE_BITS: u32 = 6;

    // Operand type codes
    pub const TYPE_REGISTER: u32 = 0;
    pub const TYPE_IMMEDIATE: u32 = 1;
    pub const TYPE_MEMORY: u32 = 2;
    pub const TYPE_BITS: u32 = 2;

    // Memory offset type codes
    pub const OFFSET_REGISTER: u32 = 0;
    pub const OFFSET_IMMEDIATE: u32 = 1;

    // ALU: dst[25:20] src[19:14] arg_type[13:12]
    pub const ALU_DST_SHIFT: u32 = 20;
    pub const ALU_SRC_SHIFT: u32 = 14;
    pub const ALU_REG_BITS: u32 = 6;
    pub const ALU_ARG_TYPE_SHIFT: u32 = 12;

    // MOV destination: kind[25:24] bank[23] off_type[22] value[21:12]
    pub const MOV_DST_KIND_SHIFT: u32 = 24;
    pub const MOV_DST_BANK_SHIFT: u32 = 23;
    pub const MOV_DST_OFF_TYPE_SHIFT: u32 = 22;
    pub const MOV_DST_VALUE_SHIFT: u32 = 12;
    pub const MOV_DST_VALUE_BITS: u32 = 10;

    // MOV source: kind[11:10] bank[9] off_type[8] reg[7:0]
    pub const MOV_SRC_KIND_SHIFT: u32 = 10;
    pub const MOV_SRC_BANK_SHIFT: u32 = 9;
    pub const MOV_SRC_OFF_TYPE_SHIFT: u32 = 8;
    pub const MOV_SRC_REG_BITS: u32 = 8;

    // Jump: cond_type[25:24] target[23:0], CALL: function[23:0]
    pub const JUMP_COND_TYPE_SHIFT: u32 = 24;
    pub const TARGET_BITS: u32 = 24;

    // I2C: addr_type[25] value_type[24] len_type[23] len[22:16] addr[15:0]
    pub const I2C_ADDR_TYPE_SHIFT: u32 = 25;
    pub const I2C_VALUE_TYPE_SHIFT: u32 = 24;
    pub const I2C_LEN_TYPE_SHIFT: u32 = 23;
    pub const I2C_LEN_SHIFT: u32 = 16;
    pub const I2C_LEN_BITS: u32 = 7;
    pub const I2C_ADDR_BITS: u32 = 16;

    /// Mask of the low `bits` bits
    pub const fn mask(bits: u32) -> u32 {
        if bits >= 32 {
            u32::MAX
        } else {
            (1 << bits) - 1
        }
    }
}

use layout::*;

/// Encoder errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("instruction {index} ({mnemonic}): {mismatch}")]
    Shape {
        index: usize,
        mnemonic: &'static str,
        mismatch: ShapeMismatch,
    },

    #[error("instruction {index}: unresolved reference '{name}'")]
    Unresolved { index: usize, name: String },

    #[error("instruction {index}: {field} value {value} does not fit in {bits} bits")]
    FieldOverflow {
        index: usize,
        field: &'static str,
        value: u32,
        bits: u32,
    },
}

pub type Result<T> = std::result::Result<T, EncodeError>;

/// One encoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EncodedInstruction {
    pub part1: u32,
    pub part2: u32,
}

impl EncodedInstruction {
    pub fn opcode_bits(&self) -> u8 {
        ((self.part1 >> OPCODE_SHIFT) & mask(OPCODE_BITS)) as u8
    }
}

/// Encode a linked instruction sequence.
pub fn encode(instructions: &[Instruction]) -> Result<Vec<EncodedInstruction>> {
    instructions
        .iter()
        .enumerate()
        .map(|(index, instruction)| encode_instruction(index, instruction))
        .collect()
}

/// Encode the instruction at `index`.
pub fn encode_instruction(index: usize, instruction: &Instruction) -> Result<EncodedInstruction> {
    let opcode = instruction.opcode;
    check_shape(opcode, &instruction.operands).map_err(|mismatch| EncodeError::Shape {
        index,
        mnemonic: opcode.mnemonic(),
        mismatch,
    })?;

    let packer = Packer { index };
    let ops = &instruction.operands;
    let head = (opcode as u32) << OPCODE_SHIFT;

    match opcode.shape() {
        Shape::Alu3 => packer.alu(head, &ops[0], &ops[1], &ops[2]),
        // dst doubles as the source
        Shape::Alu2 => packer.alu(head, &ops[0], &ops[0], &ops[1]),
        Shape::Mov => packer.mov(head, &ops[0], &ops[1]),
        Shape::Jump => packer.jump(head, &ops[0], &ops[1]),
        Shape::Call => packer.call(head, &ops[0]),
        Shape::Wi2c => packer.wi2c(head, ops),
        Shape::Ri2c => packer.ri2c(head, ops),
    }
}

/// Packs fields of the instruction at `index`, range-checking each value
struct Packer {
    index: usize,
}

impl Packer {
    fn field(&self, field: &'static str, value: u32, bits: u32, shift: u32) -> Result<u32> {
        if value & !mask(bits) != 0 {
            return Err(EncodeError::FieldOverflow {
                index: self.index,
                field,
                value,
                bits,
            });
        }
        Ok(value << shift)
    }

    fn register(&self, operand: &Operand) -> u32 {
        match operand {
            Operand::Register(r) => *r as u32,
            _ => 0,
        }
    }

    /// Type code and value of a register-or-immediate operand
    fn reg_or_imm(&self, operand: &Operand) -> (u32, u32) {
        match operand {
            Operand::Register(r) => (TYPE_REGISTER, *r as u32),
            Operand::Immediate(v) => (TYPE_IMMEDIATE, *v),
            _ => (TYPE_REGISTER, 0),
        }
    }

    fn resolved(&self, operand: &Operand) -> Result<u32> {
        match operand {
            Operand::Label(symbol) | Operand::Function(symbol) => {
                symbol.index.ok_or_else(|| EncodeError::Unresolved {
                    index: self.index,
                    name: symbol.name.clone(),
                })
            }
            _ => Ok(0),
        }
    }

    fn alu(&self, head: u32, dst: &Operand, src: &Operand, arg: &Operand) -> Result<EncodedInstruction> {
        let (arg_type, arg_value) = self.reg_or_imm(arg);
        let part1 = head
            | self.field("destination register", self.register(dst), ALU_REG_BITS, ALU_DST_SHIFT)?
            | self.field("source register", self.register(src), ALU_REG_BITS, ALU_SRC_SHIFT)?
            | (arg_type << ALU_ARG_TYPE_SHIFT);
        Ok(EncodedInstruction {
            part1,
            part2: arg_value,
        })
    }

    fn mov(&self, head: u32, dst: &Operand, src: &Operand) -> Result<EncodedInstruction> {
        let mut part1 = head;

        match dst {
            Operand::Register(r) => {
                part1 |= TYPE_REGISTER << MOV_DST_KIND_SHIFT;
                part1 |= self.field("destination register", *r as u32, MOV_DST_VALUE_BITS, MOV_DST_VALUE_SHIFT)?;
            }
            Operand::Memory(Memory { bank, offset }) => {
                part1 |= TYPE_MEMORY << MOV_DST_KIND_SHIFT;
                part1 |= bank.index() << MOV_DST_BANK_SHIFT;
                let (off_type, value) = match offset {
                    Offset::Register(r) => (OFFSET_REGISTER, *r as u32),
                    Offset::Immediate(v) => (OFFSET_IMMEDIATE, *v),
                };
                part1 |= off_type << MOV_DST_OFF_TYPE_SHIFT;
                part1 |= self.field("destination offset", value, MOV_DST_VALUE_BITS, MOV_DST_VALUE_SHIFT)?;
            }
            _ => {}
        }

        let mut part2 = 0;
        match src {
            Operand::Register(r) => {
                part1 |= TYPE_REGISTER << MOV_SRC_KIND_SHIFT;
                part1 |= self.field("source register", *r as u32, MOV_SRC_REG_BITS, 0)?;
            }
            Operand::Immediate(v) => {
                part1 |= TYPE_IMMEDIATE << MOV_SRC_KIND_SHIFT;
                part2 = *v;
            }
            Operand::Memory(Memory { bank, offset }) => {
                part1 |= TYPE_MEMORY << MOV_SRC_KIND_SHIFT;
                part1 |= bank.index() << MOV_SRC_BANK_SHIFT;
                match offset {
                    Offset::Register(r) => {
                        part1 |= OFFSET_REGISTER << MOV_SRC_OFF_TYPE_SHIFT;
                        part1 |= self.field("source offset register", *r as u32, MOV_SRC_REG_BITS, 0)?;
                    }
                    Offset::Immediate(v) => {
                        part1 |= OFFSET_IMMEDIATE << MOV_SRC_OFF_TYPE_SHIFT;
                        part2 = *v;
                    }
                }
            }
            _ => {}
        }

        Ok(EncodedInstruction { part1, part2 })
    }

    fn jump(&self, head: u32, cond: &Operand, label: &Operand) -> Result<EncodedInstruction> {
        let (cond_type, cond_value) = self.reg_or_imm(cond);
        let target = self.resolved(label)?;
        let part1 = head
            | (cond_type << JUMP_COND_TYPE_SHIFT)
            | self.field("jump target", target, TARGET_BITS, 0)?;
        Ok(EncodedInstruction {
            part1,
            part2: cond_value,
        })
    }

    fn call(&self, head: u32, function: &Operand) -> Result<EncodedInstruction> {
        let target = self.resolved(function)?;
        Ok(EncodedInstruction {
            part1: head | self.field("call target", target, TARGET_BITS, 0)?,
            part2: 0,
        })
    }

    fn i2c_common(&self, head: u32, addr: &Operand, len: &Operand) -> Result<u32> {
        let (addr_type, addr_value) = self.reg_or_imm(addr);
        let (len_type, len_value) = self.reg_or_imm(len);
        Ok(head
            | (addr_type << I2C_ADDR_TYPE_SHIFT)
            | (len_type << I2C_LEN_TYPE_SHIFT)
            | self.field("i2c length", len_value, I2C_LEN_BITS, I2C_LEN_SHIFT)?
            | self.field("i2c address", addr_value, I2C_ADDR_BITS, 0)?)
    }

    fn wi2c(&self, head: u32, ops: &[Operand]) -> Result<EncodedInstruction> {
        let (value_type, value) = self.reg_or_imm(&ops[1]);
        let part1 = self.i2c_common(head, &ops[0], &ops[2])? | (value_type << I2C_VALUE_TYPE_SHIFT);
        Ok(EncodedInstruction { part1, part2: value })
    }

    fn ri2c(&self, head: u32, ops: &[Operand]) -> Result<EncodedInstruction> {
        Ok(EncodedInstruction {
            part1: self.i2c_common(head, &ops[1], &ops[2])?,
            part2: self.register(&ops[0]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Opcode;
    use crate::operand::{Bank, Symbol};

    fn instr(opcode: Opcode, operands: Vec<Operand>) -> Instruction {
        Instruction {
            opcode,
            operands,
            function: 0,
            line: 1,
        }
    }

    fn resolved(name: &str, index: u32) -> Symbol {
        Symbol {
            name: name.into(),
            index: Some(index),
        }
    }

    fn encode_one(instruction: Instruction) -> Result<EncodedInstruction> {
        encode_instruction(0, &instruction)
    }

    #[test]
    fn test_alu3_register() {
        let word = encode_one(instr(
            Opcode::Add,
            vec![Operand::Register(1), Operand::Register(2), Operand::Register(3)],
        ))
        .unwrap();
        assert_eq!(word.part1, (0x01 << 26) | (1 << 20) | (2 << 14));
        assert_eq!(word.part2, 3);
    }

    #[test]
    fn test_alu3_immediate() {
        let word = encode_one(instr(
            Opcode::Sub,
            vec![Operand::Register(0), Operand::Register(0), Operand::Immediate(1)],
        ))
        .unwrap();
        assert_eq!(word.part1, (0x02 << 26) | (1 << 12));
        assert_eq!(word.part2, 1);
    }

    #[test]
    fn test_alu2_uses_dst_as_source() {
        let word = encode_one(instr(
            Opcode::Shl,
            vec![Operand::Register(5), Operand::Immediate(4)],
        ))
        .unwrap();
        assert_eq!(word.part1, (0x05 << 26) | (5 << 20) | (5 << 14) | (1 << 12));
        assert_eq!(word.part2, 4);
    }

    #[test]
    fn test_mov_register_immediate() {
        let word = encode_one(instr(
            Opcode::MovDw,
            vec![Operand::Register(3), Operand::Immediate(0xdead)],
        ))
        .unwrap();
        assert_eq!(word.part1, (0x12 << 26) | (3 << 12) | (1 << 10));
        assert_eq!(word.part2, 0xdead);
    }

    #[test]
    fn test_mov_memory_to_memory() {
        let word = encode_one(instr(
            Opcode::MovB,
            vec![
                Operand::Memory(Memory {
                    bank: Bank::M1,
                    offset: Offset::Immediate(0x20),
                }),
                Operand::Memory(Memory {
                    bank: Bank::M0,
                    offset: Offset::Register(7),
                }),
            ],
        ))
        .unwrap();
        let expected: u32 = (0x10 << 26)
            | (2 << 24)
            | (1 << 23)
            | (1 << 22)
            | (0x20 << 12)
            | (2 << 10)
            | 7;
        assert_eq!(word.part1, expected);
        assert_eq!(word.part2, 0);
    }

    #[test]
    fn test_mov_memory_immediate_source() {
        let word = encode_one(instr(
            Opcode::MovW,
            vec![
                Operand::Register(2),
                Operand::Memory(Memory {
                    bank: Bank::M1,
                    offset: Offset::Immediate(0x1234),
                }),
            ],
        ))
        .unwrap();
        assert_eq!(
            word.part1,
            (0x11 << 26) | (2 << 12) | (2 << 10) | (1 << 9) | (1 << 8)
        );
        assert_eq!(word.part2, 0x1234);
    }

    #[test]
    fn test_jump() {
        let word = encode_one(instr(
            Opcode::Jnz,
            vec![Operand::Register(0), Operand::Label(resolved("LOOP", 1))],
        ))
        .unwrap();
        assert_eq!(word.part1, (0x20 << 26) | 1);
        assert_eq!(word.part2, 0);
    }

    #[test]
    fn test_call() {
        let word = encode_one(instr(
            Opcode::Call,
            vec![Operand::Function(resolved("helper", 1))],
        ))
        .unwrap();
        assert_eq!(word, EncodedInstruction { part1: (0x30 << 26) | 1, part2: 0 });
    }

    #[test]
    fn test_wi2c() {
        let word = encode_one(instr(
            Opcode::Wi2c,
            vec![
                Operand::Immediate(0x3008),
                Operand::Register(4),
                Operand::Immediate(2),
            ],
        ))
        .unwrap();
        assert_eq!(
            word.part1,
            (0x38 << 26) | (1 << 25) | (1 << 23) | (2 << 16) | 0x3008
        );
        assert_eq!(word.part2, 4);
    }

    #[test]
    fn test_ri2c() {
        let word = encode_one(instr(
            Opcode::Ri2c,
            vec![
                Operand::Register(9),
                Operand::Register(1),
                Operand::Immediate(1),
            ],
        ))
        .unwrap();
        assert_eq!(word.part1, (0x39 << 26) | (1 << 23) | (1 << 16) | 1);
        assert_eq!(word.part2, 9);
    }

    #[test]
    fn test_unresolved_label() {
        let err = encode_one(instr(
            Opcode::Jez,
            vec![Operand::Immediate(0), Operand::Label(Symbol::new("x"))],
        ))
        .unwrap_err();
        assert_eq!(
            err,
            EncodeError::Unresolved {
                index: 0,
                name: "x".into()
            }
        );
    }

    #[test]
    fn test_field_overflow() {
        let err = encode_one(instr(
            Opcode::Wi2c,
            vec![
                Operand::Immediate(0x1_0000),
                Operand::Immediate(0),
                Operand::Immediate(1),
            ],
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            EncodeError::FieldOverflow {
                field: "i2c address",
                bits: 16,
                ..
            }
        ));

        let err = encode_one(instr(
            Opcode::Ri2c,
            vec![
                Operand::Register(0),
                Operand::Immediate(0),
                Operand::Immediate(128),
            ],
        ))
        .unwrap_err();
        assert!(matches!(err, EncodeError::FieldOverflow { bits: 7, .. }));
    }

    #[test]
    fn test_shape_rechecked() {
        let err = encode_one(instr(
            Opcode::Add,
            vec![Operand::Immediate(1), Operand::Register(0), Operand::Register(0)],
        ))
        .unwrap_err();
        assert!(matches!(err, EncodeError::Shape { mnemonic: "ADD", .. }));
    }
}
