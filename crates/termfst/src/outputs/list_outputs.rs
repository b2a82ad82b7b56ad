use termfst_core::DataOutput;

use super::Outputs;
use crate::FstError;
use crate::bytes_reader::BytesReader;

/// Wraps another algebra so one input can map to several outputs.
///
/// Values are lists of inner values. Arc outputs are always single-element
/// lists; only final outputs grow past one element, when the same input is
/// added more than once and the outputs are merged.
#[derive(Debug, Clone, Default)]
pub struct ListOfOutputs<O> {
    inner: O,
}

impl<O: Outputs> ListOfOutputs<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    fn single<'v>(&self, value: &'v [O::Value]) -> &'v O::Value {
        assert_eq!(
            value.len(),
            1,
            "expected a single output, got {} outputs",
            value.len()
        );
        &value[0]
    }
}

impl<O: Outputs> Outputs for ListOfOutputs<O> {
    type Value = Vec<O::Value>;

    fn name(&self) -> &'static str {
        "ListOfOutputs"
    }

    fn no_output(&self) -> Vec<O::Value> {
        vec![self.inner.no_output()]
    }

    fn common(&self, a: &Vec<O::Value>, b: &Vec<O::Value>) -> Vec<O::Value> {
        vec![self.inner.common(self.single(a), self.single(b))]
    }

    fn subtract(&self, output: &Vec<O::Value>, inc: &Vec<O::Value>) -> Vec<O::Value> {
        vec![self.inner.subtract(self.single(output), self.single(inc))]
    }

    fn add(&self, prefix: &Vec<O::Value>, output: &Vec<O::Value>) -> Vec<O::Value> {
        let prefix = self.single(prefix);
        output.iter().map(|o| self.inner.add(prefix, o)).collect()
    }

    fn merge(
        &self,
        first: &Vec<O::Value>,
        second: &Vec<O::Value>,
    ) -> Result<Vec<O::Value>, FstError> {
        let mut merged = Vec::with_capacity(first.len() + second.len());
        merged.extend_from_slice(first);
        merged.extend_from_slice(second);
        Ok(merged)
    }

    fn write<D: DataOutput + ?Sized>(
        &self,
        output: &Vec<O::Value>,
        out: &mut D,
    ) -> Result<(), FstError> {
        self.inner.write(self.single(output), out)
    }

    fn write_final_output<D: DataOutput + ?Sized>(
        &self,
        output: &Vec<O::Value>,
        out: &mut D,
    ) -> Result<(), FstError> {
        let count =
            u32::try_from(output.len()).map_err(|_| FstError::OutputTooLarge(output.len()))?;
        out.write_vint(count);
        for value in output {
            self.inner.write(value, out)?;
        }
        Ok(())
    }

    fn read<R: BytesReader + ?Sized>(&self, input: &mut R) -> Result<Vec<O::Value>, FstError> {
        Ok(vec![self.inner.read(input)?])
    }

    fn read_final_output<R: BytesReader + ?Sized>(
        &self,
        input: &mut R,
    ) -> Result<Vec<O::Value>, FstError> {
        let count = input.read_vint()? as usize;
        let mut values = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            values.push(self.inner.read(input)?);
        }
        Ok(values)
    }

    fn skip_output<R: BytesReader + ?Sized>(&self, input: &mut R) -> Result<(), FstError> {
        self.inner.skip_output(input)
    }

    fn skip_final_output<R: BytesReader + ?Sized>(&self, input: &mut R) -> Result<(), FstError> {
        let count = input.read_vint()?;
        for _ in 0..count {
            self.inner.skip_output(input)?;
        }
        Ok(())
    }

    fn output_to_string(&self, output: &Vec<O::Value>) -> String {
        let parts: Vec<String> = output
            .iter()
            .map(|v| self.inner.output_to_string(v))
            .collect();
        format!("[{}]", parts.join(", "))
    }
}
