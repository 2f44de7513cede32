//! Firmware image: encoded instructions plus the function table.
//!
//! Serialized layout, all integers little-endian `u32`:
//!
//! ```text
//! magic "SCRP" | instruction count | function count
//! (part1, part2) * instruction count
//! (name length, name bytes, start, end) * function count
//! ```

use crate::encoder::EncodedInstruction;
use crate::symbols::Function;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Image header magic, the bytes "SCRP"
pub const IMAGE_MAGIC: u32 = u32::from_le_bytes(*b"SCRP");

/// Image decoding errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    #[error("bad image magic: {0:#010x}")]
    BadMagic(u32),

    #[error("image truncated at byte {0}")]
    Truncated(usize),

    #[error("function name is not valid utf-8")]
    InvalidName,

    #[error("{0} trailing bytes after image")]
    TrailingBytes(usize),
}

/// Function table entry copied through to the firmware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEntry {
    pub name: String,
    pub start: u32,
    pub end: u32,
}

impl From<&Function> for FunctionEntry {
    fn from(func: &Function) -> Self {
        Self {
            name: func.name.clone(),
            start: func.start as u32,
            end: func.end as u32,
        }
    }
}

/// Output of a successful compile
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Image {
    pub instructions: Vec<EncodedInstruction>,
    pub functions: Vec<FunctionEntry>,
}

impl Image {
    pub fn new(instructions: Vec<EncodedInstruction>, functions: &[Function]) -> Self {
        Self {
            instructions,
            functions: functions.iter().map(FunctionEntry::from).collect(),
        }
    }

    /// Index of the function named `name`
    pub fn function(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|func| func.name == name)
    }

    /// Serialize into the firmware byte layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(12 + self.instructions.len() * 8);
        bytes.extend_from_slice(&IMAGE_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&(self.instructions.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.functions.len() as u32).to_le_bytes());

        for word in &self.instructions {
            bytes.extend_from_slice(&word.part1.to_le_bytes());
            bytes.extend_from_slice(&word.part2.to_le_bytes());
        }

        for func in &self.functions {
            bytes.extend_from_slice(&(func.name.len() as u32).to_le_bytes());
            bytes.extend_from_slice(func.name.as_bytes());
            bytes.extend_from_slice(&func.start.to_le_bytes());
            bytes.extend_from_slice(&func.end.to_le_bytes());
        }

        bytes
    }

    /// Deserialize an image produced by [`Image::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let mut reader = ByteReader { bytes, pos: 0 };

        let magic = reader.u32()?;
        if magic != IMAGE_MAGIC {
            return Err(ImageError::BadMagic(magic));
        }
        let instruction_count = reader.u32()? as usize;
        let function_count = reader.u32()? as usize;

        let mut instructions = Vec::new();
        for _ in 0..instruction_count {
            instructions.push(EncodedInstruction {
                part1: reader.u32()?,
                part2: reader.u32()?,
            });
        }

        let mut functions = Vec::new();
        for _ in 0..function_count {
            let len = reader.u32()? as usize;
            let name = std::str::from_utf8(reader.take(len)?)
                .map_err(|_| ImageError::InvalidName)?
                .to_string();
            functions.push(FunctionEntry {
                name,
                start: reader.u32()?,
                end: reader.u32()?,
            });
        }

        let remaining = bytes.len() - reader.pos;
        if remaining != 0 {
            return Err(ImageError::TrailingBytes(remaining));
        }

        Ok(Self {
            instructions,
            functions,
        })
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], ImageError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(ImageError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, ImageError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Image {
        Image {
            instructions: vec![
                EncodedInstruction {
                    part1: 0x4800_0000,
                    part2: 10,
                },
                EncodedInstruction {
                    part1: 0xC000_0001,
                    part2: 0,
                },
            ],
            functions: vec![FunctionEntry {
                name: "main".into(),
                start: 0,
                end: 2,
            }],
        }
    }

    #[test]
    fn test_bytes_roundtrip() {
        let image = sample();
        let bytes = image.to_bytes();
        assert_eq!(&bytes[..4], b"SCRP");
        assert_eq!(bytes.len(), 12 + 2 * 8 + 4 + 4 + 8);
        assert_eq!(Image::from_bytes(&bytes), Ok(image));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample().to_bytes();
        bytes[0] = 0;
        assert!(matches!(Image::from_bytes(&bytes), Err(ImageError::BadMagic(_))));
    }

    #[test]
    fn test_truncated() {
        let bytes = sample().to_bytes();
        assert!(matches!(
            Image::from_bytes(&bytes[..bytes.len() - 1]),
            Err(ImageError::Truncated(_))
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = sample().to_bytes();
        bytes.push(0);
        assert_eq!(Image::from_bytes(&bytes), Err(ImageError::TrailingBytes(1)));
    }
}
