// Suffix dedup table
//
// Maps the content hash of a frozen node to the addresses of compiled nodes
// with that hash. A candidate is only reused after reading it back from the
// byte store and comparing it arc by arc with the node being frozen.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use hashbrown::HashMap;

use crate::FstError;
use crate::bytes_reader::BytesReader;
use crate::fst::{ARCS_FOR_BINARY_SEARCH, ARCS_FOR_DIRECT_ADDRESSING, Fst, count_bits};
use crate::node::{CompiledAddress, UnCompiledNode};
use crate::outputs::Outputs;

#[derive(Debug, Default)]
pub struct NodeHash {
    table: HashMap<u64, Vec<CompiledAddress>>,
    len: usize,
}

impl NodeHash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct nodes recorded.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Hash over everything that makes two nodes interchangeable: each arc's
    /// label, target, outputs and finality. All targets must be compiled.
    pub fn hash_node<T: Hash>(node: &UnCompiledNode<T>) -> u64 {
        let mut hasher = DefaultHasher::new();
        for arc in &node.arcs {
            arc.label.hash(&mut hasher);
            arc.target.address().hash(&mut hasher);
            arc.output.hash(&mut hasher);
            arc.next_final_output.hash(&mut hasher);
            arc.is_final.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Address of a compiled node equal to `node`, if one was recorded.
    pub fn find<O: Outputs>(
        &self,
        fst: &Fst<O>,
        node: &UnCompiledNode<O::Value>,
        hash: u64,
    ) -> Result<Option<CompiledAddress>, FstError> {
        let Some(candidates) = self.table.get(&hash) else {
            return Ok(None);
        };
        let mut input = fst.bytes_reader();
        for &address in candidates {
            if nodes_equal(fst, node, address, input.as_mut())? {
                return Ok(Some(address));
            }
        }
        Ok(None)
    }

    pub fn insert(&mut self, hash: u64, address: CompiledAddress) {
        self.table.entry(hash).or_default().push(address);
        self.len += 1;
    }
}

fn nodes_equal<O: Outputs, R: BytesReader + ?Sized>(
    fst: &Fst<O>,
    node: &UnCompiledNode<O::Value>,
    address: CompiledAddress,
    input: &mut R,
) -> Result<bool, FstError> {
    let mut arc = fst.read_first_real_target_arc(address, input)?;

    // cheap arc-count checks for fixed-stride nodes before walking arcs
    if arc.bytes_per_arc != 0 {
        match arc.node_flags {
            ARCS_FOR_BINARY_SEARCH => {
                if node.num_arcs() != arc.num_arcs {
                    return Ok(false);
                }
            }
            ARCS_FOR_DIRECT_ADDRESSING => {
                let first = node.arcs[0].label;
                let last = node.arcs[node.num_arcs() - 1].label;
                let label_range = (i64::from(last) - i64::from(first) + 1) as usize;
                if label_range != arc.num_arcs
                    || node.num_arcs() as i64 != count_bits(&arc, input)?
                {
                    return Ok(false);
                }
            }
            _ => {}
        }
    }

    let last_idx = node.num_arcs() - 1;
    for (idx, expected) in node.arcs.iter().enumerate() {
        if expected.label != arc.label
            || expected.output != arc.output
            || expected.target.address() != arc.target
            || expected.next_final_output != arc.next_final_output
            || expected.is_final != arc.is_final()
        {
            return Ok(false);
        }
        if arc.is_last() {
            return Ok(idx == last_idx);
        }
        if idx == last_idx {
            return Ok(false);
        }
        fst.read_next_real_arc(&mut arc, input)?;
    }
    Ok(false)
}
