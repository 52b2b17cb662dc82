use std::fmt;

/// A PDF string object, either literal (`(...)`) or hexadecimal (`<...>`).
///
/// Content is arbitrary bytes. The hex flag is part of the value: a literal
/// and a hex string with identical bytes are not equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PdfString {
    bytes: Vec<u8>,
    hex: bool,
}

impl PdfString {
    /// A literal string.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            hex: false,
        }
    }

    /// A hex string.
    pub fn hex(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            hex: true,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_hex(&self) -> bool {
        self.hex
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The escaped payload of the literal form, without the surrounding
    /// parentheses.
    pub fn escaped_literal(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(bytes.len());
        for &b in bytes {
            match b {
                b'\n' => out.extend_from_slice(b"\\n"),
                b'\r' => out.extend_from_slice(b"\\r"),
                b'\t' => out.extend_from_slice(b"\\t"),
                0x08 => out.extend_from_slice(b"\\b"),
                0x0C => out.extend_from_slice(b"\\f"),
                b'\\' => out.extend_from_slice(b"\\\\"),
                b'(' => out.extend_from_slice(b"\\("),
                b')' => out.extend_from_slice(b"\\)"),
                _ => out.push(b),
            }
        }
        out
    }

    /// The payload of the hex form, without the angle brackets.
    pub fn escaped_hex(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(bytes.len() * 2);
        for &b in bytes {
            out.extend_from_slice(format!("{:02X}", b).as_bytes());
        }
        out
    }
}

impl From<&str> for PdfString {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

impl From<String> for PdfString {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl fmt::Display for PdfString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hex {
            write!(
                f,
                "<{}>",
                String::from_utf8_lossy(&Self::escaped_hex(&self.bytes))
            )
        } else {
            write!(
                f,
                "({})",
                String::from_utf8_lossy(&Self::escaped_literal(&self.bytes))
            )
        }
    }
}
