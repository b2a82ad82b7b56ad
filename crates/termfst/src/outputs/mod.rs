// Output algebra
//
// Every arc carries a value from some monoid-like algebra. The builder only
// ever talks to values through this trait, so the same construction and
// serialization code serves membership sets, integer payloads, byte
// payloads and multi-valued entries.

use std::fmt::Debug;
use std::hash::Hash;

use termfst_core::DataOutput;

use crate::FstError;
use crate::bytes_reader::BytesReader;

mod byte_outputs;
mod int_outputs;
mod list_outputs;
mod no_outputs;

pub use byte_outputs::ByteSequenceOutputs;
pub use int_outputs::PositiveIntOutputs;
pub use list_outputs::ListOfOutputs;
pub use no_outputs::{NoOutput, NoOutputs};

/// Value algebra attached to FST arcs.
///
/// Laws the builder relies on:
/// - `common(a, a) == a` and `common(a, no_output) == no_output`
/// - `add(no_output, x) == x`
/// - `add(common(a, b), subtract(a, common(a, b))) == a`
pub trait Outputs: Clone + Debug {
    type Value: Clone + Eq + Hash + Debug;

    /// Short name used in error messages.
    fn name(&self) -> &'static str;

    /// The identity value.
    fn no_output(&self) -> Self::Value;

    fn is_no_output(&self, value: &Self::Value) -> bool {
        *value == self.no_output()
    }

    /// Greatest common prefix of `a` and `b`.
    fn common(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// `output` with the prefix `inc` removed. Panics if `inc` is not a prefix.
    fn subtract(&self, output: &Self::Value, inc: &Self::Value) -> Self::Value;

    /// `prefix` followed by `output`.
    fn add(&self, prefix: &Self::Value, output: &Self::Value) -> Self::Value;

    /// Combines two outputs recorded for the same input.
    fn merge(&self, first: &Self::Value, second: &Self::Value) -> Result<Self::Value, FstError> {
        let _ = (first, second);
        Err(FstError::UnsupportedMerge(self.name()))
    }

    /// Encodes an arc output.
    fn write<D: DataOutput + ?Sized>(
        &self,
        output: &Self::Value,
        out: &mut D,
    ) -> Result<(), FstError> {
        let _ = (output, out);
        Err(FstError::UnsupportedOutputEncoding(self.name()))
    }

    /// Encodes a final output. Defaults to [`Outputs::write`].
    fn write_final_output<D: DataOutput + ?Sized>(
        &self,
        output: &Self::Value,
        out: &mut D,
    ) -> Result<(), FstError> {
        self.write(output, out)
    }

    fn read<R: BytesReader + ?Sized>(&self, input: &mut R) -> Result<Self::Value, FstError> {
        let _ = input;
        Err(FstError::UnsupportedOutputEncoding(self.name()))
    }

    fn read_final_output<R: BytesReader + ?Sized>(
        &self,
        input: &mut R,
    ) -> Result<Self::Value, FstError> {
        self.read(input)
    }

    fn skip_output<R: BytesReader + ?Sized>(&self, input: &mut R) -> Result<(), FstError> {
        self.read(input).map(|_| ())
    }

    fn skip_final_output<R: BytesReader + ?Sized>(&self, input: &mut R) -> Result<(), FstError> {
        self.read_final_output(input).map(|_| ())
    }

    fn output_to_string(&self, output: &Self::Value) -> String {
        format!("{output:?}")
    }
}
