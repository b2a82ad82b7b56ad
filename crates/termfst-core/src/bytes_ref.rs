// Byte slices
//
// Same window semantics as `IntsRef`, over bytes. Ordering is unsigned
// byte-wise, which matches code point order for UTF-8 text.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::CoreError;

#[derive(Debug, Clone, Default)]
pub struct BytesRef {
    bytes: Vec<u8>,
    offset: usize,
    length: usize,
}

impl BytesRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps `bytes[offset..offset + length]`.
    pub fn from_parts(bytes: Vec<u8>, offset: usize, length: usize) -> Result<Self, CoreError> {
        match offset.checked_add(length) {
            Some(end) if end <= bytes.len() => Ok(Self {
                bytes,
                offset,
                length,
            }),
            _ => Err(CoreError::OutOfBounds {
                offset,
                length,
                capacity: bytes.len(),
            }),
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[self.offset..self.offset + self.length]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Decodes the window as UTF-8.
    pub fn utf8_to_string(&self) -> Result<String, CoreError> {
        std::str::from_utf8(self.as_slice())
            .map(str::to_owned)
            .map_err(|_| CoreError::InvalidUtf8)
    }

    pub fn into_vec(self) -> Vec<u8> {
        if self.offset == 0 && self.length == self.bytes.len() {
            self.bytes
        } else {
            self.as_slice().to_vec()
        }
    }
}

impl From<Vec<u8>> for BytesRef {
    fn from(bytes: Vec<u8>) -> Self {
        let length = bytes.len();
        Self {
            bytes,
            offset: 0,
            length,
        }
    }
}

impl From<&str> for BytesRef {
    fn from(s: &str) -> Self {
        Self::from(s.as_bytes().to_vec())
    }
}

impl PartialEq for BytesRef {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for BytesRef {}

impl Hash for BytesRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl PartialOrd for BytesRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BytesRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl fmt::Display for BytesRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, b) in self.as_slice().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:x}")?;
        }
        f.write_str("]")
    }
}
