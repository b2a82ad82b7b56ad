use termfst_core::{BytesRef, DataOutput};

use super::Outputs;
use crate::FstError;
use crate::bytes_reader::BytesReader;

/// Byte-string outputs combined by concatenation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteSequenceOutputs;

impl ByteSequenceOutputs {
    pub fn new() -> Self {
        Self
    }
}

impl Outputs for ByteSequenceOutputs {
    type Value = BytesRef;

    fn name(&self) -> &'static str {
        "ByteSequenceOutputs"
    }

    fn no_output(&self) -> BytesRef {
        BytesRef::new()
    }

    fn common(&self, a: &BytesRef, b: &BytesRef) -> BytesRef {
        let (a, b) = (a.as_slice(), b.as_slice());
        let shared = a.iter().zip(b).take_while(|(x, y)| x == y).count();
        BytesRef::from(a[..shared].to_vec())
    }

    fn subtract(&self, output: &BytesRef, inc: &BytesRef) -> BytesRef {
        let (output, inc) = (output.as_slice(), inc.as_slice());
        assert!(
            output.starts_with(inc),
            "{inc:?} is not a prefix of {output:?}"
        );
        BytesRef::from(output[inc.len()..].to_vec())
    }

    fn add(&self, prefix: &BytesRef, output: &BytesRef) -> BytesRef {
        if prefix.is_empty() {
            return output.clone();
        }
        if output.is_empty() {
            return prefix.clone();
        }
        let mut joined = Vec::with_capacity(prefix.len() + output.len());
        joined.extend_from_slice(prefix.as_slice());
        joined.extend_from_slice(output.as_slice());
        BytesRef::from(joined)
    }

    fn write<D: DataOutput + ?Sized>(&self, output: &BytesRef, out: &mut D) -> Result<(), FstError> {
        let len = u32::try_from(output.len())
            .map_err(|_| FstError::OutputTooLarge(output.len()))?;
        out.write_vint(len);
        out.write_bytes(output.as_slice());
        Ok(())
    }

    fn read<R: BytesReader + ?Sized>(&self, input: &mut R) -> Result<BytesRef, FstError> {
        let len = input.read_vint()? as usize;
        // the length is untrusted until its bytes have been read
        let mut bytes = Vec::with_capacity(len.min(256));
        for _ in 0..len {
            bytes.push(input.read_byte()?);
        }
        Ok(BytesRef::from(bytes))
    }

    fn skip_output<R: BytesReader + ?Sized>(&self, input: &mut R) -> Result<(), FstError> {
        let len = input.read_vint()?;
        input.skip_bytes(i64::from(len));
        Ok(())
    }

    fn output_to_string(&self, output: &BytesRef) -> String {
        output
            .utf8_to_string()
            .unwrap_or_else(|_| output.to_string())
    }
}
