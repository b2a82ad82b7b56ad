use termfst_core::DataOutput;

use super::Outputs;
use crate::FstError;
use crate::bytes_reader::BytesReader;

/// Non-negative integer outputs combined by addition.
///
/// The common prefix of two values is their minimum, so shared paths carry
/// the smaller value and each branch carries the difference.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositiveIntOutputs;

impl PositiveIntOutputs {
    pub fn new() -> Self {
        Self
    }
}

impl Outputs for PositiveIntOutputs {
    type Value = u64;

    fn name(&self) -> &'static str {
        "PositiveIntOutputs"
    }

    fn no_output(&self) -> u64 {
        0
    }

    fn common(&self, a: &u64, b: &u64) -> u64 {
        if *a == 0 || *b == 0 { 0 } else { (*a).min(*b) }
    }

    fn subtract(&self, output: &u64, inc: &u64) -> u64 {
        assert!(inc <= output, "cannot subtract {inc} from {output}");
        output - inc
    }

    fn add(&self, prefix: &u64, output: &u64) -> u64 {
        prefix
            .checked_add(*output)
            .unwrap_or_else(|| panic!("output overflow adding {prefix} + {output}"))
    }

    fn write<D: DataOutput + ?Sized>(&self, output: &u64, out: &mut D) -> Result<(), FstError> {
        out.write_vlong(*output);
        Ok(())
    }

    fn read<R: BytesReader + ?Sized>(&self, input: &mut R) -> Result<u64, FstError> {
        input.read_vlong()
    }

    fn output_to_string(&self, output: &u64) -> String {
        output.to_string()
    }
}
