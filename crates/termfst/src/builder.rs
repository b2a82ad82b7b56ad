// Incremental minimal-FST construction
//
// Inputs arrive in sorted order. The frontier holds one uncompiled node per
// depth along the previous input; when a new input diverges, every frontier
// node below the shared prefix can no longer change and is frozen (written
// to the byte store, or replaced by an identical node written earlier).
// Outputs are pushed as close to the root as the common-prefix algebra
// allows, so each arc carries only what all inputs through it share.

use std::mem;

use termfst_core::IntsRef;
use termfst_core::array_util;

use crate::FstError;
use crate::bytes_store::BytesStore;
use crate::config::BuilderConfig;
use crate::fixed_arcs::FixedLengthArcsBuffer;
use crate::fst::{Fst, InputType};
use crate::node::{CompiledAddress, NON_FINAL_END_NODE, Node, UnCompiledNode};
use crate::node_hash::NodeHash;
use crate::outputs::Outputs;

/// Initial number of frontier slots.
const INITIAL_FRONTIER_LEN: usize = 10;

/// Builds an [`Fst`] from inputs added in sorted order.
///
/// ```
/// use termfst::{Builder, InputType, PositiveIntOutputs};
/// use termfst::util::to_ints;
///
/// let mut builder = Builder::new(InputType::Byte1, PositiveIntOutputs::new());
/// builder.add(&to_ints(b"cat"), 5).unwrap();
/// builder.add(&to_ints(b"dog"), 7).unwrap();
/// let fst = builder.finish().unwrap();
/// assert_eq!(fst.get(&to_ints(b"dog")).unwrap(), Some(7));
/// ```
#[derive(Debug)]
pub struct Builder<O: Outputs> {
    pub(crate) fst: Fst<O>,
    pub(crate) config: BuilderConfig,
    no_output: O::Value,
    dedup_hash: Option<NodeHash>,
    frontier: Vec<UnCompiledNode<O::Value>>,
    last_input: IntsRef,
    finished: bool,

    // serializer state
    pub(crate) last_frozen_node: CompiledAddress,
    pub(crate) num_bytes_per_arc: Vec<usize>,
    pub(crate) num_label_bytes_per_arc: Vec<usize>,
    pub(crate) fixed_length_arcs_buffer: FixedLengthArcsBuffer,
    pub(crate) direct_addressing_expansion_credit: i64,

    // statistics
    pub(crate) node_count: u64,
    pub(crate) arc_count: u64,
    pub(crate) binary_search_node_count: u64,
    pub(crate) direct_addressing_node_count: u64,
    term_count: u64,
}

impl<O: Outputs> Builder<O> {
    /// A builder with default policy: no pruning, full suffix sharing and
    /// fixed-length arcs where they pay off.
    pub fn new(input_type: InputType, outputs: O) -> Self {
        Self::build(BuilderConfig::new(input_type), outputs)
    }

    pub fn with_config(config: BuilderConfig, outputs: O) -> Result<Self, FstError> {
        config.validate()?;
        Ok(Self::build(config, outputs))
    }

    fn build(config: BuilderConfig, outputs: O) -> Self {
        let no_output = outputs.no_output();
        let frontier = (0..INITIAL_FRONTIER_LEN)
            .map(|depth| UnCompiledNode::new(depth, no_output.clone()))
            .collect();
        let dedup_hash = config.share_suffix.then(NodeHash::new);
        Self {
            fst: Fst::new(config.input_type, outputs, config.bytes_page_bits),
            config,
            no_output,
            dedup_hash,
            frontier,
            last_input: IntsRef::new(),
            finished: false,
            last_frozen_node: 0,
            num_bytes_per_arc: Vec::new(),
            num_label_bytes_per_arc: Vec::new(),
            fixed_length_arcs_buffer: FixedLengthArcsBuffer::new(),
            direct_addressing_expansion_credit: 0,
            node_count: 0,
            arc_count: 0,
            binary_search_node_count: 0,
            direct_addressing_node_count: 0,
            term_count: 0,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Nodes written to the byte store so far.
    pub fn node_count(&self) -> u64 {
        self.node_count
    }

    /// Arcs written to the byte store so far.
    pub fn arc_count(&self) -> u64 {
        self.arc_count
    }

    /// Calls to [`Builder::add`], duplicates included.
    pub fn term_count(&self) -> u64 {
        self.term_count
    }

    pub fn binary_search_node_count(&self) -> u64 {
        self.binary_search_node_count
    }

    pub fn direct_addressing_node_count(&self) -> u64 {
        self.direct_addressing_node_count
    }

    /// Bytes written so far, including the leading pad byte.
    pub fn size_in_bytes(&self) -> i64 {
        self.fst.bytes.position()
    }

    /// Adds `input` with `output`.
    ///
    /// Inputs must be non-decreasing; an input equal to the previous one
    /// merges its output with the earlier one. The empty input may only be
    /// added before any other.
    ///
    /// # Panics
    ///
    /// On out-of-order input, labels outside the input type's range, or a
    /// call after [`Builder::finish`].
    pub fn add(&mut self, input: &[i32], output: O::Value) -> Result<(), FstError> {
        assert!(!self.finished, "add called after finish");
        assert!(
            self.last_input.is_empty() || input >= self.last_input.as_slice(),
            "inputs are added out of order: last input {} vs input {}",
            self.last_input,
            IntsRef::from_slice(input)
        );
        let max_label = self.config.input_type.max_label();
        if let Some(&label) = input.iter().find(|&&l| !(0..=max_label).contains(&l)) {
            panic!(
                "label {label} out of range for {:?}",
                self.config.input_type
            );
        }
        self.term_count += 1;

        if input.is_empty() {
            // The empty input never touches the frontier beyond the root.
            let root = &mut self.frontier[0];
            root.input_count += 1;
            root.is_final = true;
            return self.fst.set_empty_output(output);
        }

        // Find the shared prefix with the previous input, counting the new
        // input on every node it passes through.
        let last = self.last_input.as_slice();
        let stop = last.len().min(input.len());
        let mut pos = 0;
        loop {
            self.frontier[pos].input_count += 1;
            if pos >= stop || last[pos] != input[pos] {
                break;
            }
            pos += 1;
        }
        let prefix_len_plus1 = pos + 1;

        if self.frontier.len() < input.len() + 1 {
            let no_output = &self.no_output;
            array_util::grow_with(&mut self.frontier, input.len() + 1, |depth| {
                UnCompiledNode::new(depth, no_output.clone())
            })?;
        }

        self.freeze_tail(prefix_len_plus1)?;

        // The new suffix becomes a chain of fresh frontier nodes.
        for idx in prefix_len_plus1..=input.len() {
            self.frontier[idx - 1].add_arc(input[idx - 1], Node::Frontier(idx), &self.no_output);
            self.frontier[idx].input_count += 1;
        }

        let duplicate = self.last_input.len() == input.len() && prefix_len_plus1 == input.len() + 1;
        if !duplicate {
            let last_node = &mut self.frontier[input.len()];
            last_node.is_final = true;
            last_node.output = self.no_output.clone();
        }

        // Push outputs along the shared prefix: each arc keeps the part
        // common to old and new, the remainder moves one node down.
        let mut output = output;
        for idx in 1..prefix_len_plus1 {
            let label = input[idx - 1];
            let last_output = self.frontier[idx - 1].last_output(label).clone();
            let common = if last_output != self.no_output {
                let common = self.fst.outputs.common(&output, &last_output);
                let word_suffix = self.fst.outputs.subtract(&last_output, &common);
                self.frontier[idx - 1].set_last_output(label, common.clone());
                self.frontier[idx].prepend_output(&word_suffix, &self.fst.outputs);
                common
            } else {
                self.no_output.clone()
            };
            output = self.fst.outputs.subtract(&output, &common);
        }

        if duplicate {
            let last_node = &mut self.frontier[input.len()];
            last_node.output = self.fst.outputs.merge(&last_node.output, &output)?;
        } else {
            self.frontier[prefix_len_plus1 - 1].set_last_output(input[prefix_len_plus1 - 1], output);
        }

        self.last_input.copy_ints(input);
        Ok(())
    }

    /// Freezes (or prunes) frontier nodes deeper than `prefix_len_plus1 - 1`
    /// along the previous input.
    fn freeze_tail(&mut self, prefix_len_plus1: usize) -> Result<(), FstError> {
        let down_to = prefix_len_plus1.max(1);
        let last_len = self.last_input.len();
        let min1 = self.config.min_suffix_count1;
        let min2 = self.config.min_suffix_count2;

        for idx in (down_to..=last_len).rev() {
            let node_count = self.frontier[idx].input_count;
            let parent_count = self.frontier[idx - 1].input_count;

            let (do_prune, do_compile) = if node_count < min1 {
                (true, true)
            } else if idx > prefix_len_plus1 {
                // The parent is frozen in this pass too, so its count is final.
                let prune = parent_count < min2 || (min2 == 1 && parent_count == 1 && idx > 1);
                (prune, true)
            } else {
                // The parent stays on the frontier; only compile when no
                // later count could still prune this node.
                (false, min2 == 0)
            };

            if node_count < min2 || (min2 == 1 && node_count == 1 && idx > 1) {
                self.frontier[idx].arcs.clear();
            }

            let label = self.last_input.as_slice()[idx - 1];
            if do_prune {
                self.frontier[idx].clear(self.no_output.clone());
                self.frontier[idx - 1].delete_last(label);
                continue;
            }

            if min2 != 0 {
                self.compile_all_targets(idx, last_len - idx)?;
            }
            let next_final_output = self.frontier[idx].output.clone();
            // A node left without arcs accepts: the inputs below it were pruned.
            let is_final = self.frontier[idx].is_final || self.frontier[idx].num_arcs() == 0;

            let mut node = mem::replace(
                &mut self.frontier[idx],
                UnCompiledNode::new(idx, self.no_output.clone()),
            );
            node.is_final = is_final;
            let target = if do_compile {
                let address = self.compile_node(&mut node, 1 + last_len - idx)?;
                self.frontier[idx] = node;
                Node::Compiled(address)
            } else {
                Node::Pending(Box::new(node))
            };
            self.frontier[idx - 1].replace_last(label, target, next_final_output, is_final);
        }
        Ok(())
    }

    /// Compiles the pending targets of the frontier node at `idx`.
    fn compile_all_targets(&mut self, idx: usize, tail_length: usize) -> Result<(), FstError> {
        let mut node = mem::replace(
            &mut self.frontier[idx],
            UnCompiledNode::new(idx, self.no_output.clone()),
        );
        let result = self.compile_pending_targets(&mut node, tail_length);
        self.frontier[idx] = node;
        result
    }

    fn compile_pending_targets(
        &mut self,
        node: &mut UnCompiledNode<O::Value>,
        tail_length: usize,
    ) -> Result<(), FstError> {
        for arc in node.arcs.iter_mut() {
            let mut pending = match mem::replace(&mut arc.target, Node::Compiled(NON_FINAL_END_NODE)) {
                Node::Pending(pending) => pending,
                other => {
                    arc.target = other;
                    continue;
                }
            };
            if pending.num_arcs() == 0 {
                arc.is_final = true;
                pending.is_final = true;
            }
            let address = self.compile_node(&mut pending, tail_length.saturating_sub(1))?;
            arc.target = Node::Compiled(address);
        }
        Ok(())
    }

    /// Writes `node` (or finds an identical node already written) and
    /// clears it for reuse.
    fn compile_node(
        &mut self,
        node: &mut UnCompiledNode<O::Value>,
        tail_length: usize,
    ) -> Result<CompiledAddress, FstError> {
        let bytes_pos_start = self.fst.bytes.position();
        let share = self.dedup_hash.is_some()
            && (self.config.share_non_singleton_nodes || node.num_arcs() <= 1)
            && tail_length <= self.config.share_max_tail_length;

        let address = if share {
            if node.num_arcs() == 0 {
                let address = self.add_node(node)?;
                self.last_frozen_node = address;
                address
            } else {
                self.add_or_share(node)?
            }
        } else {
            self.add_node(node)?
        };

        if self.fst.bytes.position() != bytes_pos_start {
            self.last_frozen_node = address;
        }
        node.clear(self.no_output.clone());
        Ok(address)
    }

    fn add_or_share(&mut self, node: &UnCompiledNode<O::Value>) -> Result<CompiledAddress, FstError> {
        let hash = NodeHash::hash_node(node);
        let existing = match &self.dedup_hash {
            Some(table) => table.find(&self.fst, node, hash)?,
            None => None,
        };
        if let Some(address) = existing {
            return Ok(address);
        }
        let address = self.add_node(node)?;
        if let Some(table) = self.dedup_hash.as_mut() {
            table.insert(hash, address);
        }
        Ok(address)
    }

    /// Freezes the remaining frontier and returns the finished FST.
    ///
    /// With pruning active, an FST whose every input was pruned accepts
    /// nothing, not even the empty input.
    ///
    /// # Panics
    ///
    /// When called a second time.
    pub fn finish(&mut self) -> Result<Fst<O>, FstError> {
        assert!(!self.finished, "finish called twice");
        self.finished = true;

        self.freeze_tail(0)?;

        let last_len = self.last_input.len();
        let root = &self.frontier[0];
        let min1 = self.config.min_suffix_count1;
        let min2 = self.config.min_suffix_count2;
        if root.input_count < min1 || root.input_count < min2 || root.num_arcs() == 0 {
            if self.fst.empty_output.is_none() || self.config.prunes() {
                self.fst.empty_output = None;
                self.fst.finish(NON_FINAL_END_NODE);
                log::debug!("finished FST accepts nothing ({} inputs added)", self.term_count);
                return Ok(self.take_fst());
            }
        } else if min2 != 0 {
            self.compile_all_targets(0, last_len)?;
        }

        let mut root = mem::replace(&mut self.frontier[0], UnCompiledNode::new(0, self.no_output.clone()));
        let start_node = self.compile_node(&mut root, last_len)?;
        self.frontier[0] = root;
        self.fst.finish(start_node);

        log::debug!(
            "finished FST: {} inputs, {} nodes, {} arcs, {} bytes ({} binary-search, {} direct-addressing nodes, {} dedup entries)",
            self.term_count,
            self.node_count,
            self.arc_count,
            self.fst.size_in_bytes(),
            self.binary_search_node_count,
            self.direct_addressing_node_count,
            self.dedup_hash.as_ref().map_or(0, NodeHash::len),
        );
        Ok(self.take_fst())
    }

    fn take_fst(&mut self) -> Fst<O> {
        let placeholder = Fst::from_parts(
            self.fst.input_type,
            self.fst.outputs.clone(),
            BytesStore::new(self.config.bytes_page_bits),
            None,
            NON_FINAL_END_NODE,
        );
        mem::replace(&mut self.fst, placeholder)
    }
}
