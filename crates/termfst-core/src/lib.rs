//! Shared building blocks for the termfst workspace.
//!
//! - [`ints_ref`] -- Integer-label key slices used as FST inputs
//! - [`bytes_ref`] -- Byte slices used for raw storage and byte outputs
//! - [`array_util`] -- Geometric growth policy for reusable scratch arrays
//! - [`data_output`] -- Big-endian and variable-length integer writers
//! - [`unicode`] -- Conversion between UTF-8 text and code point labels

pub mod array_util;
pub mod bytes_ref;
pub mod data_output;
pub mod ints_ref;
pub mod unicode;

pub use bytes_ref::BytesRef;
pub use data_output::{ByteArrayDataOutput, DataOutput};
pub use ints_ref::IntsRef;

/// Errors raised by the shared building blocks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("slice out of bounds: offset={offset}, length={length}, capacity={capacity}")]
    OutOfBounds {
        offset: usize,
        length: usize,
        capacity: usize,
    },
    #[error("invalid UTF-8 in byte slice")]
    InvalidUtf8,
    #[error("invalid code point: {0:#x}")]
    InvalidCodePoint(i32),
    #[error("requested size overflows: {requested}")]
    SizeOverflow { requested: usize },
}
