// Save/load container for a finished FST
//
// Layout:
// - bytes 0..16: header (see `FstHeader`)
// - empty output, if flagged: vInt length, then its final-output encoding
//   stored back to front so a reverse cursor reads it like an arc's
// - vLong start node + 1, so FINAL_END_NODE encodes as 0
// - vLong byte count, then the byte store contents

use std::io::Write;

use termfst_core::DataOutput;

use crate::FstError;
use crate::bytes_reader::{BytesReader, ReverseBytesReader};
use crate::bytes_store::BytesStore;
use crate::config::MAX_BYTES_PAGE_BITS;
use crate::fst::{Fst, InputType};
use crate::node::FINAL_END_NODE;
use crate::outputs::Outputs;

/// Leading bytes of every container.
const MAGIC: [u8; 8] = *b"TSFTz\xF5\x01\x00";

/// Current container version.
pub const FORMAT_VERSION: u8 = 1;

/// Size of the binary header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Parsed container header.
///
/// - bytes 0..8: `MAGIC`
/// - byte 8: format version
/// - byte 9: input type code
/// - byte 10: empty-output flag (0x00 or 0x01)
/// - bytes 11..16: reserved (zero)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FstHeader {
    pub version: u8,
    pub input_type: InputType,
    pub has_empty_output: bool,
}

impl FstHeader {
    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[..8].copy_from_slice(&MAGIC);
        buf[8] = self.version;
        buf[9] = self.input_type.code();
        buf[10] = u8::from(self.has_empty_output);
        buf
    }
}

/// Parses and validates the 16-byte header.
pub fn parse_header(data: &[u8]) -> Result<FstHeader, FstError> {
    let Some(head) = data.get(..HEADER_SIZE) else {
        return Err(FstError::TooShort {
            expected: HEADER_SIZE,
            actual: data.len(),
        });
    };
    if head[..8] != MAGIC {
        return Err(FstError::InvalidMagic);
    }

    let version = head[8];
    if version != FORMAT_VERSION {
        return Err(FstError::UnsupportedVersion(version));
    }
    let has_empty_output = match head[10] {
        0x00 => false,
        0x01 => true,
        flag => {
            return Err(FstError::Corrupt(format!("empty-output flag {flag:#04x}")));
        }
    };

    Ok(FstHeader {
        version,
        input_type: InputType::from_code(head[9])?,
        has_empty_output,
    })
}

/// Bounds-checked cursor over the body after the header.
struct BodyReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BodyReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], FstError> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(FstError::TooShort {
                expected: self.pos.saturating_add(len),
                actual: self.data.len(),
            });
        };
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_vlong(&mut self) -> Result<u64, FstError> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let b = self.take(1)?[0];
            value |= u64::from(b & 0x7F) << shift;
            if b & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(FstError::Corrupt("variable-length integer is too long".into()))
    }
}

impl<O: Outputs> Fst<O> {
    /// Writes the container to `out`.
    ///
    /// Two FSTs built from the same inputs with the same configuration save
    /// to identical bytes.
    pub fn save<W: Write>(&self, out: &mut W) -> Result<(), FstError> {
        let header = FstHeader {
            version: FORMAT_VERSION,
            input_type: self.input_type,
            has_empty_output: self.empty_output.is_some(),
        };
        let mut prefix = header.to_bytes().to_vec();

        if let Some(empty) = &self.empty_output {
            let mut encoded = Vec::new();
            self.outputs.write_final_output(empty, &mut encoded)?;
            encoded.reverse();
            let len = u32::try_from(encoded.len())
                .map_err(|_| FstError::OutputTooLarge(encoded.len()))?;
            prefix.write_vint(len);
            prefix.write_bytes(&encoded);
        }

        prefix.write_vlong((self.start_node + 1) as u64);
        prefix.write_vlong(self.bytes.position() as u64);
        out.write_all(&prefix)?;
        self.bytes.write_to(out)?;
        log::debug!(
            "saved FST: {} header bytes, {} node bytes",
            prefix.len(),
            self.bytes.position()
        );
        Ok(())
    }

    /// Loads an FST written by [`Fst::save`]. `outputs` must match the
    /// algebra it was built with.
    pub fn from_bytes(data: &[u8], outputs: O) -> Result<Self, FstError> {
        let header = parse_header(data)?;
        let mut body = BodyReader {
            data,
            pos: HEADER_SIZE,
        };

        let empty_output = if header.has_empty_output {
            let len = body.read_vlong()? as usize;
            // zero bytes is a valid encoding for algebras that write nothing
            let encoded = body.take(len)?;
            let mut input = ReverseBytesReader::new(encoded);
            input.set_position(len as i64 - 1);
            Some(outputs.read_final_output(&mut input)?)
        } else {
            None
        };

        let start_node = i64::try_from(body.read_vlong()?)
            .map_err(|_| FstError::Corrupt("start node out of range".into()))?
            - 1;
        let num_bytes = usize::try_from(body.read_vlong()?)
            .map_err(|_| FstError::Corrupt("node byte count out of range".into()))?;
        let bytes = body.take(num_bytes)?;
        if start_node < FINAL_END_NODE || start_node >= num_bytes.max(1) as i64 {
            return Err(FstError::Corrupt(format!(
                "start node {start_node} outside {num_bytes} node bytes"
            )));
        }

        let store = BytesStore::from_bytes(bytes, MAX_BYTES_PAGE_BITS);
        Ok(Fst::from_parts(
            header.input_type,
            outputs,
            store,
            empty_output,
            start_node,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::{ByteSequenceOutputs, NoOutputs, PositiveIntOutputs};
    use crate::util::to_ints;
    use crate::{Builder, NoOutput};
    use termfst_core::BytesRef;

    fn header_bytes(input_type: InputType, has_empty_output: bool) -> Vec<u8> {
        FstHeader {
            version: FORMAT_VERSION,
            input_type,
            has_empty_output,
        }
        .to_bytes()
        .to_vec()
    }

    #[test]
    fn header_fields_survive_parsing() {
        for input_type in [InputType::Byte1, InputType::Byte2, InputType::Byte4] {
            for has_empty_output in [false, true] {
                let header = parse_header(&header_bytes(input_type, has_empty_output)).unwrap();
                assert_eq!(header.version, FORMAT_VERSION);
                assert_eq!(header.input_type, input_type);
                assert_eq!(header.has_empty_output, has_empty_output);
            }
        }
    }

    #[test]
    fn saved_header_describes_the_fst() {
        let mut builder = Builder::new(InputType::Byte4, NoOutputs::new());
        builder.add(&[0x1F600], NoOutput).unwrap();
        let fst = builder.finish().unwrap();
        let mut saved = Vec::new();
        fst.save(&mut saved).unwrap();

        assert_eq!(&saved[..8], &MAGIC);
        assert_eq!(saved[8], FORMAT_VERSION);
        assert_eq!(saved[9], InputType::Byte4.code());
        assert_eq!(saved[10], 0x00);
        assert!(saved[11..HEADER_SIZE].iter().all(|&b| b == 0));
    }

    #[test]
    fn header_cut_short_is_too_short() {
        let data = header_bytes(InputType::Byte1, false);
        assert!(matches!(
            parse_header(&data[..11]),
            Err(FstError::TooShort {
                expected: HEADER_SIZE,
                actual: 11
            })
        ));
    }

    #[test]
    fn foreign_file_is_not_a_container() {
        let mut data = b"%PDF-1.7".to_vec();
        data.resize(HEADER_SIZE, 0);
        assert!(matches!(parse_header(&data), Err(FstError::InvalidMagic)));
    }

    #[test]
    fn reject_unknown_version() {
        let mut data = header_bytes(InputType::Byte1, false);
        data[8] = 7;
        assert!(matches!(
            parse_header(&data),
            Err(FstError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn reject_unknown_input_type() {
        let mut data = header_bytes(InputType::Byte1, false);
        data[9] = 3;
        assert!(matches!(
            parse_header(&data),
            Err(FstError::InvalidInputType(3))
        ));
    }

    #[test]
    fn reject_unknown_empty_output_flag() {
        let mut data = header_bytes(InputType::Byte2, true);
        data[10] = 0x02;
        assert!(matches!(parse_header(&data), Err(FstError::Corrupt(_))));
    }

    #[test]
    fn round_trip_with_empty_output() {
        let mut builder = Builder::new(InputType::Byte1, ByteSequenceOutputs::new());
        builder.add(&[], BytesRef::from("root")).unwrap();
        builder.add(&to_ints(b"go"), BytesRef::from("went")).unwrap();
        builder.add(&to_ints(b"goes"), BytesRef::from("go")).unwrap();
        let fst = builder.finish().unwrap();

        let mut saved = Vec::new();
        fst.save(&mut saved).unwrap();
        assert_eq!(saved[10], 0x01);

        let loaded = Fst::from_bytes(&saved, ByteSequenceOutputs::new()).unwrap();
        assert_eq!(loaded.empty_output(), Some(&BytesRef::from("root")));
        assert_eq!(loaded.get(&to_ints(b"go")).unwrap(), Some(BytesRef::from("went")));
        assert_eq!(loaded.get(&to_ints(b"goes")).unwrap(), Some(BytesRef::from("go")));
        assert_eq!(loaded.start_node(), fst.start_node());

        let mut again = Vec::new();
        loaded.save(&mut again).unwrap();
        assert_eq!(again, saved);
    }

    #[test]
    fn empty_output_may_encode_to_nothing() {
        let mut builder = Builder::new(InputType::Byte1, NoOutputs::new());
        builder.add(&[], NoOutput).unwrap();
        builder.add(&to_ints(b"a"), NoOutput).unwrap();
        let fst = builder.finish().unwrap();
        let mut saved = Vec::new();
        fst.save(&mut saved).unwrap();
        // zero-length empty output right after the header
        assert_eq!(saved[10], 0x01);
        assert_eq!(saved[HEADER_SIZE], 0x00);

        let loaded = Fst::from_bytes(&saved, NoOutputs::new()).unwrap();
        assert_eq!(loaded.empty_output(), Some(&NoOutput));
        assert_eq!(loaded.get(&to_ints(b"a")).unwrap(), Some(NoOutput));
    }

    #[test]
    fn reject_truncated_body() {
        let mut builder = Builder::new(InputType::Byte1, PositiveIntOutputs::new());
        builder.add(&to_ints(b"one"), 1).unwrap();
        let fst = builder.finish().unwrap();
        let mut saved = Vec::new();
        fst.save(&mut saved).unwrap();

        saved.truncate(saved.len() - 2);
        let err = Fst::from_bytes(&saved, PositiveIntOutputs::new()).unwrap_err();
        assert!(matches!(err, FstError::TooShort { .. }));
    }

    #[test]
    fn reject_start_node_past_end() {
        let mut data = header_bytes(InputType::Byte1, false);
        data.write_vlong(50); // start node 49
        data.write_vlong(1);
        data.push(0);
        let err = Fst::from_bytes(&data, PositiveIntOutputs::new()).unwrap_err();
        assert!(matches!(err, FstError::Corrupt(_)));
    }
}
