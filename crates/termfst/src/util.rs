// Lookup and enumeration over a finished FST
//
// Both walk the automaton with the arc reader only, so they double as
// checks that the encoding reads back as built.

use crate::FstError;
use crate::fst::{Arc, Fst};
use crate::outputs::Outputs;

/// Byte input as labels.
pub fn to_ints(bytes: &[u8]) -> Vec<i32> {
    bytes.iter().map(|&b| i32::from(b)).collect()
}

/// Unicode scalar values as labels, for [`InputType::Byte4`](crate::InputType::Byte4).
pub fn to_code_points(s: &str) -> Vec<i32> {
    s.chars().map(|c| c as i32).collect()
}

impl<O: Outputs> Fst<O> {
    /// Output for `input`, or `None` if it is not accepted.
    pub fn get(&self, input: &[i32]) -> Result<Option<O::Value>, FstError> {
        let mut reader = self.bytes_reader();
        let mut arc = self.first_arc();
        let mut output = self.outputs.no_output();
        for &label in input {
            match self.find_target_arc(label, &arc, reader.as_mut())? {
                Some(next) => {
                    output = self.outputs.add(&output, &next.output);
                    arc = next;
                }
                None => return Ok(None),
            }
        }
        if arc.is_final() {
            Ok(Some(self.outputs.add(&output, &arc.next_final_output)))
        } else {
            Ok(None)
        }
    }

    /// Every accepted input with its output, in ascending input order.
    pub fn entries(&self) -> Result<Vec<(Vec<i32>, O::Value)>, FstError> {
        let no_output = self.outputs.no_output();
        let mut entries = Vec::new();

        let root = self.first_arc();
        if root.is_final() {
            entries.push((Vec::new(), self.outputs.add(&no_output, &root.next_final_output)));
        }
        if !root.target_has_arcs() {
            return Ok(entries);
        }

        struct Frame<T> {
            arc: Arc<T>,
            /// Output accumulated before this arc.
            prefix: T,
        }

        let mut reader = self.bytes_reader();
        let mut input: Vec<i32> = Vec::new();
        let mut stack = vec![Frame {
            arc: self.read_first_real_target_arc(root.target, reader.as_mut())?,
            prefix: no_output,
        }];

        while let Some(top) = stack.last() {
            input.truncate(stack.len() - 1);
            input.push(top.arc.label);
            let output = self.outputs.add(&top.prefix, &top.arc.output);
            if top.arc.is_final() {
                entries.push((input.clone(), self.outputs.add(&output, &top.arc.next_final_output)));
            }

            if top.arc.target_has_arcs() {
                let child = self.read_first_real_target_arc(top.arc.target, reader.as_mut())?;
                stack.push(Frame {
                    arc: child,
                    prefix: output,
                });
                continue;
            }

            // step to the next sibling, unwinding exhausted nodes
            while let Some(top) = stack.last_mut() {
                if top.arc.is_last() {
                    stack.pop();
                } else {
                    self.read_next_real_arc(&mut top.arc, reader.as_mut())?;
                    break;
                }
            }
        }
        Ok(entries)
    }
}
