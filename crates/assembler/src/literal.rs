//! Numeric literal recognition.

/// Base of a recognized literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Decimal,
    Hex,
}

impl Radix {
    pub fn base(self) -> u32 {
        match self {
            Radix::Decimal => 10,
            Radix::Hex => 16,
        }
    }
}

/// Classify `token` as a numeric literal.
///
/// Decimal digit strings are always numeric. With `allow_hex`, a `0x`/`0X`
/// prefix followed by at least one hex digit is numeric too.
pub fn classify(token: &str, allow_hex: bool) -> Option<Radix> {
    if token.is_empty() {
        return None;
    }

    if token.bytes().all(|b| b.is_ascii_digit()) {
        return Some(Radix::Decimal);
    }

    if allow_hex
        && token.len() > 2
        && (token.starts_with("0x") || token.starts_with("0X"))
        && token[2..].bytes().all(|b| b.is_ascii_hexdigit())
    {
        return Some(Radix::Hex);
    }

    None
}

/// Parse a numeric literal into a 32-bit word.
///
/// Returns `None` if the token is not numeric or does not fit in 32 bits.
pub fn parse_u32(token: &str, allow_hex: bool) -> Option<u32> {
    match classify(token, allow_hex)? {
        Radix::Decimal => token.parse().ok(),
        Radix::Hex => u32::from_str_radix(&token[2..], Radix::Hex.base()).ok(),
    }
}
