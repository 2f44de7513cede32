//! Opcodes and parsed instructions.

use crate::operand::Operand;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operand layout shared by a group of opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `dst, src, reg|imm`
    Alu3,
    /// `dst, reg|imm`
    Alu2,
    /// `reg|mem, reg|mem|imm`
    Mov,
    /// `reg|imm, @label`
    Jump,
    /// `@function`
    Call,
    /// `addr, value, len`
    Wi2c,
    /// `dst, addr, len`
    Ri2c,
}

impl Shape {
    /// Fixed operand count
    pub fn arity(self) -> usize {
        match self {
            Shape::Call => 1,
            Shape::Alu2 | Shape::Mov | Shape::Jump => 2,
            Shape::Alu3 | Shape::Wi2c | Shape::Ri2c => 3,
        }
    }
}

/// Firmware opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ALU (0x01-0x0F)
    Add = 0x01,
    Sub = 0x02,
    Mul = 0x03,
    Div = 0x04,
    Shl = 0x05,
    Shr = 0x06,
    And = 0x07,
    Or = 0x08,
    Xor = 0x09,

    // Moves (0x10-0x1F)
    MovB = 0x10,
    MovW = 0x11,
    MovDw = 0x12,

    // Conditional jumps (0x20-0x2F)
    Jnz = 0x20,
    Jez = 0x21,
    Jlz = 0x22,
    Jgz = 0x23,
    Jgez = 0x24,
    Jlez = 0x25,

    // Subroutines (0x30-0x37)
    Call = 0x30,

    // Sensor I2C (0x38-0x3F)
    Wi2c = 0x38,
    Ri2c = 0x39,
}

impl Opcode {
    /// Look up a mnemonic. Matching is exact and case-sensitive.
    pub fn from_mnemonic(word: &str) -> Option<Self> {
        let opcode = match word {
            "ADD" => Opcode::Add,
            "SUB" => Opcode::Sub,
            "MUL" => Opcode::Mul,
            "DIV" => Opcode::Div,
            "SHL" => Opcode::Shl,
            "SHR" => Opcode::Shr,
            "AND" => Opcode::And,
            "OR" => Opcode::Or,
            "XOR" => Opcode::Xor,
            "MOVB" => Opcode::MovB,
            "MOVW" => Opcode::MovW,
            "MOVDW" | "MOV" => Opcode::MovDw,
            "JNZ" => Opcode::Jnz,
            "JEZ" => Opcode::Jez,
            "JLZ" => Opcode::Jlz,
            "JGZ" => Opcode::Jgz,
            "JGEZ" => Opcode::Jgez,
            "JLEZ" => Opcode::Jlez,
            "CALL" => Opcode::Call,
            "WI2C" => Opcode::Wi2c,
            "RI2C" => Opcode::Ri2c,
            _ => return None,
        };
        Some(opcode)
    }

    /// Parse an encoded opcode field.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Opcode::Add),
            0x02 => Some(Opcode::Sub),
            0x03 => Some(Opcode::Mul),
            0x04 => Some(Opcode::Div),
            0x05 => Some(Opcode::Shl),
            0x06 => Some(Opcode::Shr),
            0x07 => Some(Opcode::And),
            0x08 => Some(Opcode::Or),
            0x09 => Some(Opcode::Xor),
            0x10 => Some(Opcode::MovB),
            0x11 => Some(Opcode::MovW),
            0x12 => Some(Opcode::MovDw),
            0x20 => Some(Opcode::Jnz),
            0x21 => Some(Opcode::Jez),
            0x22 => Some(Opcode::Jlz),
            0x23 => Some(Opcode::Jgz),
            0x24 => Some(Opcode::Jgez),
            0x25 => Some(Opcode::Jlez),
            0x30 => Some(Opcode::Call),
            0x38 => Some(Opcode::Wi2c),
            0x39 => Some(Opcode::Ri2c),
            _ => None,
        }
    }

    /// Canonical mnemonic
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Shl => "SHL",
            Opcode::Shr => "SHR",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::MovB => "MOVB",
            Opcode::MovW => "MOVW",
            Opcode::MovDw => "MOVDW",
            Opcode::Jnz => "JNZ",
            Opcode::Jez => "JEZ",
            Opcode::Jlz => "JLZ",
            Opcode::Jgz => "JGZ",
            Opcode::Jgez => "JGEZ",
            Opcode::Jlez => "JLEZ",
            Opcode::Call => "CALL",
            Opcode::Wi2c => "WI2C",
            Opcode::Ri2c => "RI2C",
        }
    }

    pub fn shape(self) -> Shape {
        match self {
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor => Shape::Alu3,
            Opcode::Shl | Opcode::Shr => Shape::Alu2,
            Opcode::MovB | Opcode::MovW | Opcode::MovDw => Shape::Mov,
            Opcode::Jnz
            | Opcode::Jez
            | Opcode::Jlz
            | Opcode::Jgz
            | Opcode::Jgez
            | Opcode::Jlez => Shape::Jump,
            Opcode::Call => Shape::Call,
            Opcode::Wi2c => Shape::Wi2c,
            Opcode::Ri2c => Shape::Ri2c,
        }
    }

    pub fn arity(self) -> usize {
        self.shape().arity()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A parsed instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    /// Index of the owning function
    pub function: usize,
    /// 1-based source line
    pub line: usize,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_operation(f, self.opcode, &self.operands)
    }
}

/// Write `MNEMONIC op, op, ...` in source syntax.
pub(crate) fn write_operation(
    f: &mut fmt::Formatter<'_>,
    opcode: Opcode,
    operands: &[Operand],
) -> fmt::Result {
    write!(f, "{}", opcode)?;
    for (i, operand) in operands.iter().enumerate() {
        let sep = if i == 0 { " " } else { ", " };
        write!(f, "{}{}", sep, operand)?;
    }
    Ok(())
}
