// Scratch space for fixed-length arc nodes
//
// Holds the node header while binary-search arcs are moved into place, and
// the whole expanded node while a direct-addressing node is assembled.

use termfst_core::array_util;
use termfst_core::{ByteArrayDataOutput, DataOutput};

use crate::FstError;

/// Longest node header: flags byte plus two vInts.
pub(crate) const HEADER_MAX_LEN: usize = 1 + 5 + 5;

#[derive(Debug, Clone)]
pub(crate) struct FixedLengthArcsBuffer {
    out: ByteArrayDataOutput,
}

impl FixedLengthArcsBuffer {
    pub(crate) fn new() -> Self {
        Self {
            out: ByteArrayDataOutput::with_capacity(HEADER_MAX_LEN),
        }
    }

    /// Makes at least `capacity` bytes addressable, without moving the
    /// write position.
    pub(crate) fn ensure_capacity(&mut self, capacity: usize) -> Result<(), FstError> {
        if self.out.bytes().len() < capacity {
            let pos = self.out.position();
            self.out.reset(array_util::oversize(capacity, 1)?);
            self.out.set_position(pos);
        }
        Ok(())
    }

    /// Rewinds and writes `flags | a | b`. Returns the header length.
    pub(crate) fn write_header(&mut self, flags: u8, a: u32, b: u32) -> usize {
        self.out.set_position(0);
        self.out.write_byte(flags);
        self.out.write_vint(a);
        self.out.write_vint(b);
        self.out.position()
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        self.out.bytes()
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        self.out.bytes_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lengths() {
        let mut buf = FixedLengthArcsBuffer::new();
        assert_eq!(buf.write_header(0x20, 5, 7), 3);
        assert_eq!(&buf.bytes()[..3], &[0x20, 5, 7]);
        assert_eq!(buf.write_header(0x40, u32::MAX, u32::MAX), HEADER_MAX_LEN);
    }

    #[test]
    fn capacity_grows_and_keeps_header() {
        let mut buf = FixedLengthArcsBuffer::new();
        buf.write_header(0x20, 300, 1);
        buf.ensure_capacity(100).unwrap();
        assert!(buf.bytes().len() >= 100);
        assert_eq!(&buf.bytes()[..3], &[0x20, 0xAC, 0x02]);
    }
}
