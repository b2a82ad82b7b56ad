// Builder-side node and arc model
//
// Frontier nodes are mutable and owned by the builder, one slot per depth.
// Once frozen, a node is reduced to its address in the byte store. Arcs
// from a frontier node point either at the next frontier slot, at a
// compiled address, or (only when pruning holds a decision back) at a
// detached uncompiled node they own.

use crate::outputs::Outputs;

/// Address of a compiled node in the byte store.
pub type CompiledAddress = i64;

/// A node with no arcs that does not accept.
pub const NON_FINAL_END_NODE: CompiledAddress = 0;

/// A node with no arcs that accepts.
pub const FINAL_END_NODE: CompiledAddress = -1;

/// What a builder arc points at.
#[derive(Debug, Clone)]
pub enum Node<T> {
    /// Frozen and written.
    Compiled(CompiledAddress),
    /// The live frontier node at this depth.
    Frontier(usize),
    /// Detached from the frontier but not yet compiled.
    Pending(Box<UnCompiledNode<T>>),
}

impl<T> Node<T> {
    pub fn is_compiled(&self) -> bool {
        matches!(self, Node::Compiled(_))
    }

    /// The compiled address. Panics if the target is still uncompiled.
    pub fn address(&self) -> CompiledAddress {
        match self {
            Node::Compiled(address) => *address,
            Node::Frontier(depth) => panic!("arc target at depth {depth} is not compiled"),
            Node::Pending(_) => panic!("arc target is pending compilation"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuilderArc<T> {
    pub label: i32,
    pub target: Node<T>,
    pub is_final: bool,
    pub output: T,
    pub next_final_output: T,
}

/// A node still open to modification.
#[derive(Debug, Clone)]
pub struct UnCompiledNode<T> {
    /// Outgoing arcs in strictly increasing label order.
    pub arcs: Vec<BuilderArc<T>>,
    /// Output emitted when an input ends here. Becomes the incoming arc's
    /// final output when the node is frozen.
    pub output: T,
    pub is_final: bool,
    /// Number of inputs that pass through this node.
    pub input_count: u64,
    /// Distance from the root; fixed for the lifetime of the slot.
    pub depth: usize,
}

impl<T: Clone + PartialEq> UnCompiledNode<T> {
    pub fn new(depth: usize, no_output: T) -> Self {
        Self {
            arcs: Vec::new(),
            output: no_output,
            is_final: false,
            input_count: 0,
            depth,
        }
    }

    #[inline]
    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    /// Resets the slot for reuse, keeping the arc buffer's capacity.
    pub fn clear(&mut self, no_output: T) {
        self.arcs.clear();
        self.is_final = false;
        self.output = no_output;
        self.input_count = 0;
    }

    fn last_arc(&self, label: i32) -> &BuilderArc<T> {
        let arc = self
            .arcs
            .last()
            .unwrap_or_else(|| panic!("node at depth {} has no arcs", self.depth));
        assert_eq!(arc.label, label, "last arc label mismatch");
        arc
    }

    fn last_arc_mut(&mut self, label: i32) -> &mut BuilderArc<T> {
        let depth = self.depth;
        let arc = self
            .arcs
            .last_mut()
            .unwrap_or_else(|| panic!("node at depth {depth} has no arcs"));
        assert_eq!(arc.label, label, "last arc label mismatch");
        arc
    }

    pub fn last_output(&self, label: i32) -> &T {
        &self.last_arc(label).output
    }

    pub fn set_last_output(&mut self, label: i32, output: T) {
        self.last_arc_mut(label).output = output;
    }

    pub fn add_arc(&mut self, label: i32, target: Node<T>, no_output: &T) {
        assert!(label >= 0, "negative label {label}");
        if let Some(last) = self.arcs.last() {
            assert!(
                label > last.label,
                "arc labels out of order: last={} new={label}",
                last.label
            );
        }
        self.arcs.push(BuilderArc {
            label,
            target,
            is_final: false,
            output: no_output.clone(),
            next_final_output: no_output.clone(),
        });
    }

    pub fn replace_last(
        &mut self,
        label: i32,
        target: Node<T>,
        next_final_output: T,
        is_final: bool,
    ) {
        let arc = self.last_arc_mut(label);
        arc.target = target;
        arc.next_final_output = next_final_output;
        arc.is_final = is_final;
    }

    pub fn delete_last(&mut self, label: i32) {
        self.last_arc(label);
        self.arcs.pop();
    }

    /// Prefixes every arc output, and the final output if this node accepts,
    /// with `prefix`.
    pub fn prepend_output<O: Outputs<Value = T>>(&mut self, prefix: &T, outputs: &O) {
        for arc in &mut self.arcs {
            arc.output = outputs.add(prefix, &arc.output);
        }
        if self.is_final {
            self.output = outputs.add(prefix, &self.output);
        }
    }
}
