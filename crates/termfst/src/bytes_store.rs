// Block-paged byte arena
//
// The builder appends node bytes here and patches them in place (fixed-arc
// expansion, header insertion, reversal). Blocks are `1 << block_bits` bytes
// and are never reallocated, so a write never moves existing bytes.

use std::io::{self, Write};

use termfst_core::DataOutput;

use crate::bytes_reader::{
    BytesReader, ForwardBytesReader, ReverseBytesReader, StoreForwardReader, StoreReverseReader,
};

/// Append-only byte buffer split into equal power-of-two blocks.
///
/// Invariant: `position() == (blocks.len() - 1) * block_size + next_write`,
/// with `next_write == block_size` while no block has been allocated.
#[derive(Debug, Clone)]
pub struct BytesStore {
    blocks: Vec<Vec<u8>>,
    block_bits: u32,
    block_size: usize,
    block_mask: usize,
    next_write: usize,
    finished: bool,
}

impl BytesStore {
    pub fn new(block_bits: u32) -> Self {
        assert!(
            (1..=30).contains(&block_bits),
            "block_bits must be in 1..=30, got {block_bits}"
        );
        let block_size = 1usize << block_bits;
        Self {
            blocks: Vec::new(),
            block_bits,
            block_size,
            block_mask: block_size - 1,
            next_write: block_size,
            finished: false,
        }
    }

    /// Loads `bytes` into blocks no larger than `1 << max_block_bits`, using a
    /// single block when the data fits.
    pub fn from_bytes(bytes: &[u8], max_block_bits: u32) -> Self {
        let mut block_bits = 1;
        while block_bits < max_block_bits && (1usize << block_bits) < bytes.len() {
            block_bits += 1;
        }
        let mut store = Self::new(block_bits);
        store.write_bytes(bytes);
        store.finish();
        store
    }

    #[inline]
    pub fn block_bits(&self) -> u32 {
        self.block_bits
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn position(&self) -> i64 {
        (self.blocks.len() as i64 - 1) * self.block_size as i64 + self.next_write as i64
    }

    pub fn is_empty(&self) -> bool {
        self.position() == 0
    }

    #[inline]
    fn split(&self, pos: usize) -> (usize, usize) {
        (pos >> self.block_bits, pos & self.block_mask)
    }

    fn assert_writable(&self) {
        assert!(!self.finished, "BytesStore is already finished");
    }

    fn assert_in_range(&self, dest: i64, len: usize) {
        assert!(dest >= 0, "negative store address {dest}");
        let end = dest as u64 + len as u64;
        assert!(
            end <= self.position() as u64,
            "write at {dest}..{end} beyond store length {}",
            self.position()
        );
    }

    fn new_block(&mut self) {
        self.blocks.push(vec![0; self.block_size]);
        self.next_write = 0;
    }

    /// Appends one byte.
    pub fn write_byte(&mut self, b: u8) {
        self.assert_writable();
        if self.next_write == self.block_size {
            self.new_block();
        }
        let idx = self.blocks.len() - 1;
        self.blocks[idx][self.next_write] = b;
        self.next_write += 1;
    }

    /// Appends `bytes`, spilling into new blocks as needed.
    pub fn write_bytes(&mut self, mut bytes: &[u8]) {
        self.assert_writable();
        while !bytes.is_empty() {
            if self.next_write == self.block_size {
                self.new_block();
            }
            let chunk = (self.block_size - self.next_write).min(bytes.len());
            let idx = self.blocks.len() - 1;
            self.blocks[idx][self.next_write..self.next_write + chunk]
                .copy_from_slice(&bytes[..chunk]);
            self.next_write += chunk;
            bytes = &bytes[chunk..];
        }
    }

    /// Overwrites one already-written byte.
    pub fn write_byte_at(&mut self, dest: i64, b: u8) {
        self.assert_in_range(dest, 1);
        let (block, offset) = self.split(dest as usize);
        self.blocks[block][offset] = b;
    }

    /// Overwrites already-written bytes starting at `dest`.
    pub fn write_bytes_at(&mut self, dest: i64, bytes: &[u8]) {
        self.assert_in_range(dest, bytes.len());
        let mut pos = dest as usize;
        let mut src = bytes;
        while !src.is_empty() {
            let (block, offset) = self.split(pos);
            let chunk = (self.block_size - offset).min(src.len());
            self.blocks[block][offset..offset + chunk].copy_from_slice(&src[..chunk]);
            pos += chunk;
            src = &src[chunk..];
        }
    }

    /// Overwrites four already-written bytes with `value`, big-endian.
    pub fn write_int_at(&mut self, dest: i64, value: i32) {
        self.write_bytes_at(dest, &value.to_be_bytes());
    }

    /// Copies `len` bytes from `src` to `dest` within the written region.
    ///
    /// `src < dest` is required; the ranges may overlap. Chunks are moved
    /// from the high end down so no source byte is overwritten before it is
    /// read.
    pub fn copy_bytes(&mut self, src: i64, dest: i64, len: usize) {
        assert!(src < dest, "copy_bytes requires src < dest (src={src}, dest={dest})");
        assert!(src >= 0, "negative copy source {src}");
        self.assert_in_range(dest, len);

        let src = src as usize;
        let dest = dest as usize;
        let mut remaining = len;
        while remaining > 0 {
            let (src_block, src_last) = self.split(src + remaining - 1);
            let (dest_block, dest_last) = self.split(dest + remaining - 1);
            let chunk = remaining.min(src_last + 1).min(dest_last + 1);
            let src_start = src_last + 1 - chunk;
            let dest_start = dest_last + 1 - chunk;

            if src_block == dest_block {
                self.blocks[src_block].copy_within(src_start..src_start + chunk, dest_start);
            } else {
                let (low, high) = self.blocks.split_at_mut(dest_block);
                high[0][dest_start..dest_start + chunk]
                    .copy_from_slice(&low[src_block][src_start..src_start + chunk]);
            }
            remaining -= chunk;
        }
    }

    /// Copies written bytes starting at `src` into `dest`.
    pub fn copy_to(&self, src: i64, dest: &mut [u8]) {
        assert!(src >= 0, "negative copy source {src}");
        let end = src as u64 + dest.len() as u64;
        assert!(end <= self.position() as u64, "copy_to past end of store");
        let mut pos = src as usize;
        let mut written = 0;
        while written < dest.len() {
            let (block, offset) = self.split(pos);
            let chunk = (self.block_size - offset).min(dest.len() - written);
            dest[written..written + chunk]
                .copy_from_slice(&self.blocks[block][offset..offset + chunk]);
            written += chunk;
            pos += chunk;
        }
    }

    /// Advances the write cursor by `len`, leaving zeroed bytes behind for
    /// later patching.
    pub fn skip_bytes(&mut self, mut len: usize) {
        self.assert_writable();
        while len > 0 {
            if self.next_write == self.block_size {
                self.new_block();
            }
            let chunk = (self.block_size - self.next_write).min(len);
            let idx = self.blocks.len() - 1;
            // Truncation can leave stale bytes past the cursor.
            self.blocks[idx][self.next_write..self.next_write + chunk].fill(0);
            self.next_write += chunk;
            len -= chunk;
        }
    }

    /// Reverses the bytes in `from..=to` in place.
    pub fn reverse(&mut self, from: i64, to: i64) {
        assert!(from < to, "reverse requires from < to (from={from}, to={to})");
        assert!(from >= 0, "negative reverse start {from}");
        assert!(to < self.position(), "reverse end {to} beyond store length");

        let (mut lo_block, mut lo) = self.split(from as usize);
        let (mut hi_block, mut hi) = self.split(to as usize);
        let half = (to - from + 1) / 2;
        for _ in 0..half {
            if lo_block == hi_block {
                self.blocks[lo_block].swap(lo, hi);
            } else {
                let (low, high) = self.blocks.split_at_mut(hi_block);
                std::mem::swap(&mut low[lo_block][lo], &mut high[0][hi]);
            }

            lo += 1;
            if lo == self.block_size {
                lo_block += 1;
                lo = 0;
            }
            if hi == 0 {
                hi_block = hi_block.wrapping_sub(1);
                hi = self.block_size - 1;
            } else {
                hi -= 1;
            }
        }
    }

    /// Discards everything past `new_len`, dropping blocks that become
    /// unreachable.
    pub fn truncate(&mut self, new_len: i64) {
        assert!(new_len >= 0, "negative truncate length {new_len}");
        assert!(
            new_len <= self.position(),
            "truncate to {new_len} beyond store length {}",
            self.position()
        );
        if new_len == 0 {
            self.blocks.clear();
            self.next_write = self.block_size;
            return;
        }
        let last = (new_len as usize - 1) >> self.block_bits;
        self.blocks.truncate(last + 1);
        self.next_write = new_len as usize - last * self.block_size;
        debug_assert_eq!(self.position(), new_len);
    }

    /// Trims the last block to its written length and freezes the store.
    pub fn finish(&mut self) {
        self.assert_writable();
        if let Some(last) = self.blocks.last_mut() {
            last.truncate(self.next_write);
            last.shrink_to_fit();
        }
        self.finished = true;
        log::debug!(
            "bytes store finished: {} bytes in {} blocks",
            self.position(),
            self.blocks.len()
        );
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// A cursor reading toward higher positions.
    pub fn forward_reader(&self) -> Box<dyn BytesReader + '_> {
        if self.blocks.len() == 1 {
            Box::new(ForwardBytesReader::new(&self.blocks[0][..self.next_write]))
        } else {
            Box::new(StoreForwardReader::new(
                &self.blocks,
                self.block_bits,
                self.position(),
            ))
        }
    }

    /// A cursor reading toward lower positions.
    pub fn reverse_reader(&self) -> Box<dyn BytesReader + '_> {
        if self.blocks.len() == 1 {
            Box::new(ReverseBytesReader::new(&self.blocks[0][..self.next_write]))
        } else {
            Box::new(StoreReverseReader::new(
                &self.blocks,
                self.block_bits,
                self.position(),
            ))
        }
    }

    /// Writes every stored byte to `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let Some((last, full)) = self.blocks.split_last() else {
            return Ok(());
        };
        for block in full {
            out.write_all(block)?;
        }
        out.write_all(&last[..self.next_write.min(last.len())])
    }

    /// Copies the stored bytes into one contiguous buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.position() as usize];
        self.copy_to(0, &mut out);
        out
    }
}

impl DataOutput for BytesStore {
    #[inline]
    fn write_byte(&mut self, b: u8) {
        BytesStore::write_byte(self, b);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        BytesStore::write_bytes(self, bytes);
    }
}
