//! Line reader and word splitter for sensor scripts.
//!
//! Uses the logos crate to split a line into words.

use crate::config::AssemblerConfig;
use logos::Logos;
use std::borrow::Cow;
use thiserror::Error;

/// Lexical errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("line too long: {len} bytes (max {max})")]
    LineTooLong { len: usize, max: usize },

    #[error("line is not valid utf-8")]
    InvalidUtf8,

    #[error("word too long: '{word}' (max {max} characters)")]
    WordTooLong { word: String, max: usize },

    #[error("too many words on line (max {max})")]
    TooManyWords { max: usize },

    #[error("invalid character in '{0}'")]
    InvalidCharacter(String),
}

pub type Result<T> = std::result::Result<T, LexError>;

/// Word-level tokens of a single line
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t,]+")] // Separators
enum WordToken<'a> {
    #[regex(r"[^ \t,;]+", |lex| lex.slice())]
    Word(&'a str),

    // Everything after ';' belongs to no instruction
    #[token(";")]
    Terminator,
}

/// Reads `\n`-terminated lines out of a raw script buffer.
///
/// `\r` bytes are dropped. End of stream is `None`, an empty line is
/// `Some(Ok(""))`.
pub struct LineReader<'a> {
    buf: &'a [u8],
    pos: usize,
    line: usize,
    max_line_len: usize,
}

impl<'a> LineReader<'a> {
    /// Create a reader over `buf`
    pub fn new(buf: &'a [u8], max_line_len: usize) -> Self {
        Self {
            buf,
            pos: 0,
            line: 0,
            max_line_len,
        }
    }

    /// 1-based number of the line most recently returned (0 before the first)
    pub fn line_number(&self) -> usize {
        self.line
    }

    fn decode(&self, raw: &'a [u8]) -> Result<Cow<'a, str>> {
        let len = raw.iter().filter(|&&b| b != b'\r').count();
        if len > self.max_line_len {
            return Err(LexError::LineTooLong {
                len,
                max: self.max_line_len,
            });
        }

        if raw.contains(&b'\r') {
            let filtered: Vec<u8> = raw.iter().copied().filter(|&b| b != b'\r').collect();
            String::from_utf8(filtered)
                .map(Cow::Owned)
                .map_err(|_| LexError::InvalidUtf8)
        } else {
            std::str::from_utf8(raw)
                .map(Cow::Borrowed)
                .map_err(|_| LexError::InvalidUtf8)
        }
    }
}

impl<'a> Iterator for LineReader<'a> {
    type Item = Result<Cow<'a, str>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }

        let rest = &self.buf[self.pos..];
        let (raw, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;
        self.line += 1;

        Some(self.decode(raw))
    }
}

/// Split one line into words.
///
/// Space, tab and comma separate words; `;` ends the instruction.
pub fn split_words<'l>(line: &'l str, config: &AssemblerConfig) -> Result<Vec<&'l str>> {
    let mut words = Vec::with_capacity(config.max_words_per_line);
    let mut lexer = WordToken::lexer(line);

    while let Some(token) = lexer.next() {
        match token {
            Ok(WordToken::Word(word)) => {
                if word.chars().count() > config.max_word_len {
                    return Err(LexError::WordTooLong {
                        word: word.to_string(),
                        max: config.max_word_len,
                    });
                }
                if words.len() >= config.max_words_per_line {
                    return Err(LexError::TooManyWords {
                        max: config.max_words_per_line,
                    });
                }
                words.push(word);
            }
            Ok(WordToken::Terminator) => break,
            Err(()) => return Err(LexError::InvalidCharacter(lexer.slice().to_string())),
        }
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(source: &str) -> Vec<String> {
        LineReader::new(source.as_bytes(), 256)
            .map(|line| line.unwrap().into_owned())
            .collect()
    }

    #[test]
    fn test_read_lines() {
        assert_eq!(lines("ADD R0, R1, R2\nCALL @f\n"), vec!["ADD R0, R1, R2", "CALL @f"]);
    }

    #[test]
    fn test_empty_line_is_not_end_of_stream() {
        assert_eq!(lines("a\n\nb"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_empty_buffer() {
        let mut reader = LineReader::new(b"", 16);
        assert!(reader.next().is_none());
        assert_eq!(reader.line_number(), 0);
    }

    #[test]
    fn test_carriage_returns_filtered() {
        assert_eq!(lines("MOVB R0,\r $1\r\nX\r\n"), vec!["MOVB R0, $1", "X"]);
    }

    #[test]
    fn test_line_too_long() {
        let mut reader = LineReader::new(b"123456\nok", 5);
        assert_eq!(
            reader.next(),
            Some(Err(LexError::LineTooLong { len: 6, max: 5 }))
        );
        assert_eq!(reader.line_number(), 1);
    }

    #[test]
    fn test_line_numbers() {
        let mut reader = LineReader::new(b"a\nb\nc", 16);
        reader.next();
        reader.next();
        assert_eq!(reader.line_number(), 2);
        reader.next();
        assert_eq!(reader.line_number(), 3);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_split_words() {
        let config = AssemblerConfig::default();
        let words = split_words("  ADD\tR0,R1 , $0x10", &config).unwrap();
        assert_eq!(words, vec!["ADD", "R0", "R1", "$0x10"]);
    }

    #[test]
    fn test_semicolon_ends_instruction() {
        let config = AssemblerConfig::default();
        let words = split_words("JNZ R0, @LOOP; back to the top", &config).unwrap();
        assert_eq!(words, vec!["JNZ", "R0", "@LOOP"]);

        let words = split_words("; only a comment", &config).unwrap();
        assert!(words.is_empty());
    }

    #[test]
    fn test_word_too_long() {
        let config = AssemblerConfig {
            max_word_len: 4,
            ..Default::default()
        };
        assert!(matches!(
            split_words("MOVDW R0, R1", &config),
            Err(LexError::WordTooLong { ref word, max: 4 }) if word == "MOVDW"
        ));
    }

    #[test]
    fn test_too_many_words() {
        let config = AssemblerConfig {
            max_words_per_line: 3,
            ..Default::default()
        };
        assert!(split_words("ADD R0, R1", &config).is_ok());
        assert_eq!(
            split_words("ADD R0, R1, R2", &config),
            Err(LexError::TooManyWords { max: 3 })
        );
    }
}
