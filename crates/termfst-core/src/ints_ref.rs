// Integer-label key slices
//
// An `IntsRef` is an owned buffer plus an `offset`/`length` window into it.
// Comparison, equality and hashing only look at the window, so two keys
// carved out of different buffers compare equal when their labels match.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::CoreError;

/// A window of integer labels, the input key type of the FST builder.
#[derive(Debug, Clone, Default)]
pub struct IntsRef {
    ints: Vec<i32>,
    offset: usize,
    length: usize,
}

impl IntsRef {
    /// An empty key.
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero-length key backed by a zeroed buffer of `capacity` labels.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ints: vec![0; capacity],
            offset: 0,
            length: 0,
        }
    }

    /// Wraps `ints[offset..offset + length]`.
    ///
    /// Fails with [`CoreError::OutOfBounds`] when the window does not fit the
    /// buffer.
    pub fn from_parts(ints: Vec<i32>, offset: usize, length: usize) -> Result<Self, CoreError> {
        let end = offset.checked_add(length);
        match end {
            Some(end) if end <= ints.len() => Ok(Self {
                ints,
                offset,
                length,
            }),
            _ => Err(CoreError::OutOfBounds {
                offset,
                length,
                capacity: ints.len(),
            }),
        }
    }

    /// Copies `labels` into a fresh key.
    pub fn from_slice(labels: &[i32]) -> Self {
        Self {
            ints: labels.to_vec(),
            offset: 0,
            length: labels.len(),
        }
    }

    /// One label per byte, each in `0..=255`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let ints: Vec<i32> = bytes.iter().map(|&b| i32::from(b)).collect();
        let length = ints.len();
        Self {
            ints,
            offset: 0,
            length,
        }
    }

    /// One label per Unicode scalar value of `s`.
    pub fn from_chars(s: &str) -> Self {
        let ints: Vec<i32> = s.chars().map(|c| c as i32).collect();
        let length = ints.len();
        Self {
            ints,
            offset: 0,
            length,
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[i32] {
        &self.ints[self.offset..self.offset + self.length]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Replaces the contents with `labels`, reusing the buffer.
    pub fn copy_ints(&mut self, labels: &[i32]) {
        self.ints.clear();
        self.ints.extend_from_slice(labels);
        self.offset = 0;
        self.length = labels.len();
    }

    /// Interprets the labels as Unicode scalar values.
    pub fn to_code_point_string(&self) -> Result<String, CoreError> {
        self.as_slice()
            .iter()
            .map(|&label| {
                u32::try_from(label)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(CoreError::InvalidCodePoint(label))
            })
            .collect()
    }
}

impl From<&[i32]> for IntsRef {
    fn from(labels: &[i32]) -> Self {
        Self::from_slice(labels)
    }
}

impl PartialEq for IntsRef {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for IntsRef {}

impl Hash for IntsRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl PartialOrd for IntsRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IntsRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

/// Formats as space-separated hex labels, e.g. `[73 74 61]`.
impl fmt::Display for IntsRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, label) in self.as_slice().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{label:x}")?;
        }
        f.write_str("]")
    }
}
