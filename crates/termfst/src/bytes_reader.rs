// Cursor readers over FST bytes
//
// Nodes are written forward and then reversed in place, so lookups walk the
// store backward. Both directions share one trait; the FST code is generic
// over it and never cares which concrete reader it was handed.
//
// Every read is bounds-checked. Loaded bytes are untrusted, so a position
// outside the readable range is reported as corrupt data.

use crate::FstError;

/// A cursor over a byte sequence that can move in one fixed direction.
///
/// Positions are signed: a reverse cursor that has consumed byte 0 sits at
/// `-1`.
pub trait BytesReader {
    fn position(&self) -> i64;

    fn set_position(&mut self, pos: i64);

    /// `true` when reads move toward lower positions.
    fn reversed(&self) -> bool;

    fn read_byte(&mut self) -> Result<u8, FstError>;

    /// Fills `buf` with consecutive bytes in reading direction.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), FstError> {
        for slot in buf.iter_mut() {
            *slot = self.read_byte()?;
        }
        Ok(())
    }

    /// Moves `count` bytes in reading direction.
    fn skip_bytes(&mut self, count: i64) {
        let pos = self.position();
        if self.reversed() {
            self.set_position(pos.saturating_sub(count));
        } else {
            self.set_position(pos.saturating_add(count));
        }
    }

    fn read_short(&mut self) -> Result<i16, FstError> {
        let hi = self.read_byte()?;
        let lo = self.read_byte()?;
        Ok(i16::from_be_bytes([hi, lo]))
    }

    fn read_int(&mut self) -> Result<i32, FstError> {
        let mut buf = [0u8; 4];
        for b in &mut buf {
            *b = self.read_byte()?;
        }
        Ok(i32::from_be_bytes(buf))
    }

    fn read_vint(&mut self) -> Result<u32, FstError> {
        let mut b = self.read_byte()?;
        let mut value = u32::from(b & 0x7F);
        let mut shift = 7;
        while b & 0x80 != 0 && shift < 32 {
            b = self.read_byte()?;
            value |= u32::from(b & 0x7F) << shift;
            shift += 7;
        }
        Ok(value)
    }

    fn read_vlong(&mut self) -> Result<u64, FstError> {
        let mut b = self.read_byte()?;
        let mut value = u64::from(b & 0x7F);
        let mut shift = 7;
        while b & 0x80 != 0 && shift < 64 {
            b = self.read_byte()?;
            value |= u64::from(b & 0x7F) << shift;
            shift += 7;
        }
        Ok(value)
    }
}

fn out_of_bounds(pos: i64, len: i64) -> FstError {
    FstError::Corrupt(format!("read at position {pos} outside {len} bytes"))
}

fn byte_at(bytes: &[u8], pos: i64) -> Result<u8, FstError> {
    usize::try_from(pos)
        .ok()
        .and_then(|i| bytes.get(i))
        .copied()
        .ok_or_else(|| out_of_bounds(pos, bytes.len() as i64))
}

// ---------------------------------------------------------------------------
// Single-slice readers
// ---------------------------------------------------------------------------

/// Reads a contiguous slice front to back.
#[derive(Debug, Clone)]
pub struct ForwardBytesReader<'a> {
    bytes: &'a [u8],
    pos: i64,
}

impl<'a> ForwardBytesReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }
}

impl BytesReader for ForwardBytesReader<'_> {
    #[inline]
    fn position(&self) -> i64 {
        self.pos
    }

    #[inline]
    fn set_position(&mut self, pos: i64) {
        self.pos = pos;
    }

    fn reversed(&self) -> bool {
        false
    }

    #[inline]
    fn read_byte(&mut self) -> Result<u8, FstError> {
        let b = byte_at(self.bytes, self.pos)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), FstError> {
        let src = usize::try_from(self.pos)
            .ok()
            .and_then(|start| self.bytes.get(start..start.checked_add(buf.len())?))
            .ok_or_else(|| out_of_bounds(self.pos, self.bytes.len() as i64))?;
        buf.copy_from_slice(src);
        self.pos += buf.len() as i64;
        Ok(())
    }
}

/// Reads a contiguous slice back to front.
#[derive(Debug, Clone)]
pub struct ReverseBytesReader<'a> {
    bytes: &'a [u8],
    pos: i64,
}

impl<'a> ReverseBytesReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }
}

impl BytesReader for ReverseBytesReader<'_> {
    #[inline]
    fn position(&self) -> i64 {
        self.pos
    }

    #[inline]
    fn set_position(&mut self, pos: i64) {
        self.pos = pos;
    }

    fn reversed(&self) -> bool {
        true
    }

    #[inline]
    fn read_byte(&mut self) -> Result<u8, FstError> {
        let b = byte_at(self.bytes, self.pos)?;
        self.pos -= 1;
        Ok(b)
    }
}

// ---------------------------------------------------------------------------
// Block-paged readers
// ---------------------------------------------------------------------------

/// Reads a sequence of equal-size blocks front to back.
#[derive(Debug, Clone)]
pub struct StoreForwardReader<'a> {
    blocks: &'a [Vec<u8>],
    block_bits: u32,
    block_mask: i64,
    /// Readable bytes; the last block may be longer.
    len: i64,
    pos: i64,
}

impl<'a> StoreForwardReader<'a> {
    pub(crate) fn new(blocks: &'a [Vec<u8>], block_bits: u32, len: i64) -> Self {
        Self {
            blocks,
            block_bits,
            block_mask: (1i64 << block_bits) - 1,
            len,
            pos: 0,
        }
    }

    fn byte_at(&self, pos: i64) -> Result<u8, FstError> {
        if pos < 0 || pos >= self.len {
            return Err(out_of_bounds(pos, self.len));
        }
        let block = &self.blocks[(pos >> self.block_bits) as usize];
        Ok(block[(pos & self.block_mask) as usize])
    }
}

impl BytesReader for StoreForwardReader<'_> {
    #[inline]
    fn position(&self) -> i64 {
        self.pos
    }

    #[inline]
    fn set_position(&mut self, pos: i64) {
        self.pos = pos;
    }

    fn reversed(&self) -> bool {
        false
    }

    #[inline]
    fn read_byte(&mut self) -> Result<u8, FstError> {
        let b = self.byte_at(self.pos)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), FstError> {
        if self.pos < 0 || self.len - self.pos < buf.len() as i64 {
            return Err(out_of_bounds(self.pos, self.len));
        }
        let block_size = 1usize << self.block_bits;
        let mut written = 0;
        while written < buf.len() {
            let block = &self.blocks[(self.pos >> self.block_bits) as usize];
            let offset = (self.pos & self.block_mask) as usize;
            let chunk = (block_size - offset).min(buf.len() - written);
            buf[written..written + chunk].copy_from_slice(&block[offset..offset + chunk]);
            written += chunk;
            self.pos += chunk as i64;
        }
        Ok(())
    }
}

/// Reads a sequence of equal-size blocks back to front, crossing into lower
/// blocks as the cursor decrements.
#[derive(Debug, Clone)]
pub struct StoreReverseReader<'a> {
    blocks: &'a [Vec<u8>],
    block_bits: u32,
    block_mask: i64,
    /// Readable bytes; the last block may be longer.
    len: i64,
    pos: i64,
}

impl<'a> StoreReverseReader<'a> {
    pub(crate) fn new(blocks: &'a [Vec<u8>], block_bits: u32, len: i64) -> Self {
        Self {
            blocks,
            block_bits,
            block_mask: (1i64 << block_bits) - 1,
            len,
            pos: 0,
        }
    }

    fn byte_at(&self, pos: i64) -> Result<u8, FstError> {
        if pos < 0 || pos >= self.len {
            return Err(out_of_bounds(pos, self.len));
        }
        let block = &self.blocks[(pos >> self.block_bits) as usize];
        Ok(block[(pos & self.block_mask) as usize])
    }
}

impl BytesReader for StoreReverseReader<'_> {
    #[inline]
    fn position(&self) -> i64 {
        self.pos
    }

    #[inline]
    fn set_position(&mut self, pos: i64) {
        self.pos = pos;
    }

    fn reversed(&self) -> bool {
        true
    }

    #[inline]
    fn read_byte(&mut self) -> Result<u8, FstError> {
        let b = self.byte_at(self.pos)?;
        self.pos -= 1;
        Ok(b)
    }
}
