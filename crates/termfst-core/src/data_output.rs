// Binary writers
//
// Fixed-width integers are big-endian. Variable-length integers carry
// 7 bits per byte, low bits first, with the high bit set on every byte
// except the last. Only unsigned values can be written.

/// A byte sink with integer encoders layered on top.
pub trait DataOutput {
    fn write_byte(&mut self, b: u8);

    fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_byte(b);
        }
    }

    fn write_short(&mut self, v: i16) {
        self.write_bytes(&v.to_be_bytes());
    }

    fn write_int(&mut self, v: i32) {
        self.write_bytes(&v.to_be_bytes());
    }

    fn write_vint(&mut self, mut v: u32) {
        while v & !0x7F != 0 {
            self.write_byte(((v & 0x7F) | 0x80) as u8);
            v >>= 7;
        }
        self.write_byte(v as u8);
    }

    fn write_vlong(&mut self, mut v: u64) {
        while v & !0x7F != 0 {
            self.write_byte(((v & 0x7F) | 0x80) as u8);
            v >>= 7;
        }
        self.write_byte(v as u8);
    }
}

impl DataOutput for Vec<u8> {
    #[inline]
    fn write_byte(&mut self, b: u8) {
        self.push(b);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Writes into a reusable buffer at an explicit position.
///
/// The buffer grows to fit; `reset` rewinds without releasing memory.
#[derive(Debug, Default, Clone)]
pub struct ByteArrayDataOutput {
    bytes: Vec<u8>,
    pos: usize,
}

impl ByteArrayDataOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
            pos: 0,
        }
    }

    /// Rewinds to position 0 and guarantees `capacity` addressable bytes.
    pub fn reset(&mut self, capacity: usize) {
        if self.bytes.len() < capacity {
            self.bytes.resize(capacity, 0);
        }
        self.pos = 0;
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        assert!(
            pos <= self.bytes.len(),
            "position {pos} beyond buffer length {}",
            self.bytes.len()
        );
        self.pos = pos;
    }

    /// The whole backing buffer, including bytes past `position`.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl DataOutput for ByteArrayDataOutput {
    fn write_byte(&mut self, b: u8) {
        if self.pos == self.bytes.len() {
            self.bytes.push(b);
        } else {
            self.bytes[self.pos] = b;
        }
        self.pos += 1;
    }

    fn write_bytes(&mut self, src: &[u8]) {
        let end = self.pos + src.len();
        if end > self.bytes.len() {
            self.bytes.resize(end, 0);
        }
        self.bytes[self.pos..end].copy_from_slice(src);
        self.pos = end;
    }
}
