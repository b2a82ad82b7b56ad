use termfst_core::DataOutput;

use super::Outputs;
use crate::FstError;
use crate::bytes_reader::BytesReader;

/// The single value of [`NoOutputs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoOutput;

/// Membership-only algebra: every input maps to [`NoOutput`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOutputs;

impl NoOutputs {
    pub fn new() -> Self {
        Self
    }
}

impl Outputs for NoOutputs {
    type Value = NoOutput;

    fn name(&self) -> &'static str {
        "NoOutputs"
    }

    fn no_output(&self) -> NoOutput {
        NoOutput
    }

    fn common(&self, _a: &NoOutput, _b: &NoOutput) -> NoOutput {
        NoOutput
    }

    fn subtract(&self, _output: &NoOutput, _inc: &NoOutput) -> NoOutput {
        NoOutput
    }

    fn add(&self, _prefix: &NoOutput, _output: &NoOutput) -> NoOutput {
        NoOutput
    }

    fn merge(&self, _first: &NoOutput, _second: &NoOutput) -> Result<NoOutput, FstError> {
        Ok(NoOutput)
    }

    fn write<D: DataOutput + ?Sized>(&self, _output: &NoOutput, _out: &mut D) -> Result<(), FstError> {
        Ok(())
    }

    fn read<R: BytesReader + ?Sized>(&self, _input: &mut R) -> Result<NoOutput, FstError> {
        Ok(NoOutput)
    }

    fn output_to_string(&self, _output: &NoOutput) -> String {
        String::new()
    }
}
