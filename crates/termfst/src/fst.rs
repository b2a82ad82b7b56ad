// The finished automaton and arc decoding
//
// A node is a run of arcs written forward and then reversed, so its
// address is its last byte and a reverse cursor placed there reads the arcs
// in label order. Each arc is
//
//   flags:u8 | label | output? | final output? | target:vlong?
//
// Wide nodes carry a header instead of a first flags byte and then store
// arcs at a fixed stride, either one slot per present arc (binary search)
// or one slot per present arc plus a presence bitmap over the whole label
// range (direct addressing).

use termfst_core::DataOutput;

use crate::FstError;
use crate::bytes_reader::BytesReader;
use crate::bytes_store::BytesStore;
use crate::node::{CompiledAddress, FINAL_END_NODE, NON_FINAL_END_NODE};
use crate::outputs::Outputs;

// ---------------------------------------------------------------------------
// Format constants
// ---------------------------------------------------------------------------

/// The arc accepts: an input may end after it.
pub const BIT_FINAL_ARC: u8 = 1 << 0;
/// Last arc of its node.
pub const BIT_LAST_ARC: u8 = 1 << 1;
/// The target node's bytes immediately precede this node; no address stored.
pub const BIT_TARGET_NEXT: u8 = 1 << 2;
/// The target node has no arcs.
pub const BIT_STOP_NODE: u8 = 1 << 3;
/// An output follows the label.
pub const BIT_ARC_HAS_OUTPUT: u8 = 1 << 4;
/// A final output follows the output.
pub const BIT_ARC_HAS_FINAL_OUTPUT: u8 = 1 << 5;
/// Reserved for absent slots in direct-addressing nodes.
pub const BIT_MISSING_ARC: u8 = 1 << 6;

/// Node header flag for fixed-stride arcs searched by label.
pub const ARCS_FOR_BINARY_SEARCH: u8 = BIT_ARC_HAS_FINAL_OUTPUT;
/// Node header flag for fixed-stride arcs indexed by label offset.
pub const ARCS_FOR_DIRECT_ADDRESSING: u8 = 1 << 6;

/// Label of the synthetic arc that stands for "the input may end here".
pub const END_LABEL: i32 = -1;

/// Nodes at most this deep get fixed-length arcs from this many arcs on.
pub const FIXED_LENGTH_ARC_SHALLOW_DEPTH: usize = 3;
pub const FIXED_LENGTH_ARC_SHALLOW_NUM_ARCS: usize = 5;
/// Nodes at any depth get fixed-length arcs from this many arcs on.
pub const FIXED_LENGTH_ARC_DEEP_NUM_ARCS: usize = 10;

/// Upper bound on how far expansion credit may push a direct-addressing
/// node past the binary-search size.
pub const DIRECT_ADDRESSING_MAX_OVERSIZE_WITH_CREDIT_FACTOR: f32 = 1.66;

/// Bytes needed for a presence bitmap over `label_range` labels.
#[inline]
pub fn num_presence_bytes(label_range: usize) -> usize {
    (label_range + 7) >> 3
}

// ---------------------------------------------------------------------------
// Input type
// ---------------------------------------------------------------------------

/// Width of input labels, which fixes how labels are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputType {
    /// Labels in `0..=255`, one byte each.
    #[default]
    Byte1,
    /// Labels in `0..=65535`, two bytes big-endian.
    Byte2,
    /// Any non-negative `i32`, as a vInt.
    Byte4,
}

impl InputType {
    pub fn max_label(self) -> i32 {
        match self {
            InputType::Byte1 => 0xFF,
            InputType::Byte2 => 0xFFFF,
            InputType::Byte4 => i32::MAX,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            InputType::Byte1 => 0,
            InputType::Byte2 => 1,
            InputType::Byte4 => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, FstError> {
        match code {
            0 => Ok(InputType::Byte1),
            1 => Ok(InputType::Byte2),
            2 => Ok(InputType::Byte4),
            other => Err(FstError::InvalidInputType(other)),
        }
    }

    /// Writes `label` in this width. Panics if it does not fit.
    pub fn write_label<D: DataOutput + ?Sized>(self, out: &mut D, label: i32) {
        assert!(
            (0..=self.max_label()).contains(&label),
            "label {label} out of range for {self:?}"
        );
        match self {
            InputType::Byte1 => out.write_byte(label as u8),
            InputType::Byte2 => out.write_short(label as u16 as i16),
            InputType::Byte4 => out.write_vint(label as u32),
        }
    }

    pub fn read_label<R: BytesReader + ?Sized>(self, input: &mut R) -> Result<i32, FstError> {
        Ok(match self {
            InputType::Byte1 => i32::from(input.read_byte()?),
            InputType::Byte2 => i32::from(input.read_short()? as u16),
            InputType::Byte4 => {
                let label = input.read_vint()?;
                i32::try_from(label)
                    .map_err(|_| FstError::Corrupt(format!("label {label} out of range")))?
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Read-side arc
// ---------------------------------------------------------------------------

/// One decoded arc plus the node-level state needed to step to its
/// siblings.
#[derive(Debug, Clone, PartialEq)]
pub struct Arc<T> {
    pub label: i32,
    pub output: T,
    pub next_final_output: T,
    /// Address of the target node, or one of the end-node sentinels.
    pub target: CompiledAddress,
    pub flags: u8,
    /// Header flags of the containing node; equal to `flags` for list nodes.
    pub node_flags: u8,
    /// List nodes: where the next sibling starts. For the synthetic
    /// [`END_LABEL`] arc: the node whose real arcs follow.
    pub next_arc: i64,
    /// Fixed-stride nodes: arc count, or label range for direct addressing.
    pub num_arcs: usize,
    /// Stride of fixed-length arcs; 0 for list nodes.
    pub bytes_per_arc: usize,
    /// Position of the first fixed-length arc.
    pub pos_arcs_start: i64,
    /// Index of this arc; the label offset for direct addressing.
    pub arc_idx: i64,
    /// Direct addressing: position of the first presence byte.
    pub bit_table_start: i64,
    /// Direct addressing: label of slot 0.
    pub first_label: i32,
    /// Direct addressing: rank of this arc among present arcs.
    pub presence_index: i64,
}

impl<T> Arc<T> {
    pub fn new(no_output: T) -> Self
    where
        T: Clone,
    {
        Self {
            label: 0,
            output: no_output.clone(),
            next_final_output: no_output,
            target: NON_FINAL_END_NODE,
            flags: 0,
            node_flags: 0,
            next_arc: 0,
            num_arcs: 0,
            bytes_per_arc: 0,
            pos_arcs_start: 0,
            arc_idx: -1,
            bit_table_start: 0,
            first_label: 0,
            presence_index: -1,
        }
    }

    #[inline]
    pub fn flag(&self, bit: u8) -> bool {
        self.flags & bit != 0
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.flag(BIT_FINAL_ARC)
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.flag(BIT_LAST_ARC)
    }

    /// `true` when the target node has outgoing arcs.
    #[inline]
    pub fn target_has_arcs(&self) -> bool {
        self.target > 0
    }
}

// ---------------------------------------------------------------------------
// FST
// ---------------------------------------------------------------------------

/// A minimal acyclic FST over a [`BytesStore`].
#[derive(Debug, Clone)]
pub struct Fst<O: Outputs> {
    pub(crate) input_type: InputType,
    pub(crate) outputs: O,
    pub(crate) bytes: BytesStore,
    pub(crate) empty_output: Option<O::Value>,
    pub(crate) start_node: CompiledAddress,
}

impl<O: Outputs> Fst<O> {
    /// An empty, unfinished FST whose store holds only the pad byte that
    /// keeps address 0 free for [`NON_FINAL_END_NODE`].
    pub(crate) fn new(input_type: InputType, outputs: O, bytes_page_bits: u32) -> Self {
        let mut bytes = BytesStore::new(bytes_page_bits);
        bytes.write_byte(0);
        Self {
            input_type,
            outputs,
            bytes,
            empty_output: None,
            start_node: FINAL_END_NODE,
        }
    }

    pub(crate) fn from_parts(
        input_type: InputType,
        outputs: O,
        bytes: BytesStore,
        empty_output: Option<O::Value>,
        start_node: CompiledAddress,
    ) -> Self {
        Self {
            input_type,
            outputs,
            bytes,
            empty_output,
            start_node,
        }
    }

    /// Records the output of the zero-length input, merging with any
    /// previous one.
    pub(crate) fn set_empty_output(&mut self, value: O::Value) -> Result<(), FstError> {
        let merged = match self.empty_output.take() {
            Some(existing) => self.outputs.merge(&existing, &value)?,
            None => value,
        };
        self.empty_output = Some(merged);
        Ok(())
    }

    /// Installs the root and freezes the store.
    pub(crate) fn finish(&mut self, start_node: CompiledAddress) {
        assert!(
            start_node <= self.bytes.position(),
            "start node {start_node} beyond store"
        );
        self.start_node = if start_node == FINAL_END_NODE && self.empty_output.is_some() {
            NON_FINAL_END_NODE
        } else {
            start_node
        };
        self.bytes.finish();
    }

    #[inline]
    pub fn input_type(&self) -> InputType {
        self.input_type
    }

    #[inline]
    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    pub fn empty_output(&self) -> Option<&O::Value> {
        self.empty_output.as_ref()
    }

    pub fn start_node(&self) -> CompiledAddress {
        self.start_node
    }

    /// Size of the encoded nodes, including the pad byte.
    pub fn size_in_bytes(&self) -> i64 {
        self.bytes.position()
    }

    pub fn bytes_store(&self) -> &BytesStore {
        &self.bytes
    }

    /// A reverse cursor, the direction nodes are read in.
    pub fn bytes_reader(&self) -> Box<dyn BytesReader + '_> {
        self.bytes.reverse_reader()
    }

    /// The virtual arc into the start node. It is final when the empty input
    /// is accepted.
    pub fn first_arc(&self) -> Arc<O::Value> {
        let no_output = self.outputs.no_output();
        let mut arc = Arc::new(no_output.clone());
        match &self.empty_output {
            Some(empty) => {
                arc.flags = BIT_FINAL_ARC | BIT_LAST_ARC;
                if *empty != no_output {
                    arc.flags |= BIT_ARC_HAS_FINAL_OUTPUT;
                }
                arc.next_final_output = empty.clone();
            }
            None => arc.flags = BIT_LAST_ARC,
        }
        arc.target = self.start_node;
        arc
    }

    /// First arc leaving `follow`'s target. When `follow` is final this is
    /// the synthetic [`END_LABEL`] arc carrying its final output.
    pub fn read_first_target_arc<R: BytesReader + ?Sized>(
        &self,
        follow: &Arc<O::Value>,
        input: &mut R,
    ) -> Result<Arc<O::Value>, FstError> {
        if follow.is_final() {
            let mut arc = Arc::new(self.outputs.no_output());
            arc.label = END_LABEL;
            arc.output = follow.next_final_output.clone();
            arc.flags = BIT_FINAL_ARC;
            if follow.target_has_arcs() {
                arc.next_arc = follow.target;
            } else {
                arc.flags |= BIT_LAST_ARC;
            }
            arc.target = FINAL_END_NODE;
            arc.node_flags = arc.flags;
            Ok(arc)
        } else {
            self.read_first_real_target_arc(follow.target, input)
        }
    }

    /// First stored arc of the node at `address`.
    pub fn read_first_real_target_arc<R: BytesReader + ?Sized>(
        &self,
        address: CompiledAddress,
        input: &mut R,
    ) -> Result<Arc<O::Value>, FstError> {
        let mut arc = Arc::new(self.outputs.no_output());
        input.set_position(address);
        let flags = input.read_byte()?;
        arc.node_flags = flags;
        if flags == ARCS_FOR_BINARY_SEARCH || flags == ARCS_FOR_DIRECT_ADDRESSING {
            self.read_fixed_length_header(&mut arc, input)?;
        } else {
            arc.next_arc = address;
            arc.bytes_per_arc = 0;
        }
        self.read_next_real_arc(&mut arc, input)?;
        Ok(arc)
    }

    /// Reads the header of a fixed-length node whose flags byte has just been
    /// read into `arc.node_flags`, leaving the cursor on the first arc.
    fn read_fixed_length_header<R: BytesReader + ?Sized>(
        &self,
        arc: &mut Arc<O::Value>,
        input: &mut R,
    ) -> Result<(), FstError> {
        arc.num_arcs = input.read_vint()? as usize;
        arc.bytes_per_arc = input.read_vint()? as usize;
        arc.arc_idx = -1;
        if arc.num_arcs == 0 || arc.bytes_per_arc == 0 {
            return Err(FstError::Corrupt("fixed-length node without arcs".into()));
        }

        if arc.node_flags == ARCS_FOR_DIRECT_ADDRESSING {
            arc.bit_table_start = input.position();
            input.skip_bytes(num_presence_bytes(arc.num_arcs) as i64);
            arc.first_label = self.input_type.read_label(input)?;
            arc.presence_index = -1;
            let last_label = i64::from(arc.first_label) + arc.num_arcs as i64 - 1;
            if last_label > i64::from(self.input_type.max_label()) {
                return Err(FstError::Corrupt(format!(
                    "direct-addressing labels run past {last_label}"
                )));
            }
            arc.pos_arcs_start = input.position();
        } else {
            arc.pos_arcs_start = input.position();
            // the arc array sits entirely below the header
            let span = (arc.num_arcs as i64).checked_mul(arc.bytes_per_arc as i64);
            if span.is_none_or(|span| span > arc.pos_arcs_start + 1) {
                return Err(FstError::Corrupt(format!(
                    "{} arcs of {} bytes do not fit below position {}",
                    arc.num_arcs, arc.bytes_per_arc, arc.pos_arcs_start
                )));
            }
        }
        Ok(())
    }

    /// Advances `arc` to its next sibling, leaving the synthetic
    /// [`END_LABEL`] arc for the first real one.
    pub fn read_next_arc<R: BytesReader + ?Sized>(
        &self,
        arc: &mut Arc<O::Value>,
        input: &mut R,
    ) -> Result<(), FstError> {
        if arc.label == END_LABEL {
            assert!(arc.next_arc > 0, "cannot read past the last arc");
            *arc = self.read_first_real_target_arc(arc.next_arc, input)?;
            Ok(())
        } else {
            self.read_next_real_arc(arc, input)
        }
    }

    /// Advances `arc` to its next stored sibling. The caller must check
    /// [`Arc::is_last`] first.
    pub fn read_next_real_arc<R: BytesReader + ?Sized>(
        &self,
        arc: &mut Arc<O::Value>,
        input: &mut R,
    ) -> Result<(), FstError> {
        match arc.node_flags {
            ARCS_FOR_BINARY_SEARCH => {
                arc.arc_idx += 1;
                if arc.arc_idx as usize >= arc.num_arcs {
                    return Err(FstError::Corrupt(format!(
                        "no arc after index {} of {}",
                        arc.arc_idx - 1,
                        arc.num_arcs
                    )));
                }
                input.set_position(arc_slot(arc, arc.arc_idx));
                arc.flags = input.read_byte()?;
            }
            ARCS_FOR_DIRECT_ADDRESSING => {
                let next = next_bit_set(arc.arc_idx, arc, input)?;
                if next < 0 {
                    return Err(FstError::Corrupt(
                        "no arc after the last direct-addressing slot".into(),
                    ));
                }
                return self.read_arc_by_direct_addressing(arc, input, next);
            }
            _ => {
                input.set_position(arc.next_arc);
                arc.flags = input.read_byte()?;
            }
        }
        self.read_arc(arc, input)
    }

    fn read_arc_by_direct_addressing<R: BytesReader + ?Sized>(
        &self,
        arc: &mut Arc<O::Value>,
        input: &mut R,
        range_index: i64,
    ) -> Result<(), FstError> {
        let presence_index = count_bits_up_to(range_index, arc, input)?;
        input.set_position(arc_slot(arc, presence_index));
        arc.arc_idx = range_index;
        arc.presence_index = presence_index;
        arc.flags = input.read_byte()?;
        self.read_arc(arc, input)
    }

    /// Decodes the arc body after its flags byte.
    fn read_arc<R: BytesReader + ?Sized>(
        &self,
        arc: &mut Arc<O::Value>,
        input: &mut R,
    ) -> Result<(), FstError> {
        arc.label = if arc.node_flags == ARCS_FOR_DIRECT_ADDRESSING {
            arc.first_label + arc.arc_idx as i32
        } else {
            self.input_type.read_label(input)?
        };

        arc.output = if arc.flag(BIT_ARC_HAS_OUTPUT) {
            self.outputs.read(input)?
        } else {
            self.outputs.no_output()
        };

        arc.next_final_output = if arc.flag(BIT_ARC_HAS_FINAL_OUTPUT) {
            self.outputs.read_final_output(input)?
        } else {
            self.outputs.no_output()
        };

        if arc.flag(BIT_STOP_NODE) {
            arc.target = if arc.flag(BIT_FINAL_ARC) {
                FINAL_END_NODE
            } else {
                NON_FINAL_END_NODE
            };
            arc.next_arc = input.position();
        } else if arc.flag(BIT_TARGET_NEXT) {
            arc.next_arc = input.position();
            if !arc.is_last() {
                if arc.bytes_per_arc == 0 {
                    self.seek_to_next_node(input)?;
                } else {
                    let num_arcs = if arc.node_flags == ARCS_FOR_DIRECT_ADDRESSING {
                        count_bits(arc, input)?
                    } else {
                        arc.num_arcs as i64
                    };
                    input.set_position(arc_slot(arc, num_arcs));
                }
            }
            arc.target = input.position();
        } else {
            let target = input.read_vlong()?;
            arc.next_arc = input.position();
            // targets are written before the nodes that point at them
            arc.target = match i64::try_from(target) {
                Ok(target) if target > 0 && target <= arc.next_arc => target,
                _ => {
                    return Err(FstError::Corrupt(format!(
                        "arc target {target} does not precede position {}",
                        arc.next_arc
                    )));
                }
            };
        }
        Ok(())
    }

    /// Skips the remaining arcs of a list node.
    fn seek_to_next_node<R: BytesReader + ?Sized>(&self, input: &mut R) -> Result<(), FstError> {
        loop {
            let flags = input.read_byte()?;
            self.input_type.read_label(input)?;
            if flags & BIT_ARC_HAS_OUTPUT != 0 {
                self.outputs.skip_output(input)?;
            }
            if flags & BIT_ARC_HAS_FINAL_OUTPUT != 0 {
                self.outputs.skip_final_output(input)?;
            }
            if flags & BIT_STOP_NODE == 0 && flags & BIT_TARGET_NEXT == 0 {
                input.read_vlong()?;
            }
            if flags & BIT_LAST_ARC != 0 {
                return Ok(());
            }
        }
    }

    /// The arc leaving `follow`'s target with `label`, if any.
    pub fn find_target_arc<R: BytesReader + ?Sized>(
        &self,
        label: i32,
        follow: &Arc<O::Value>,
        input: &mut R,
    ) -> Result<Option<Arc<O::Value>>, FstError> {
        if label == END_LABEL {
            if !follow.is_final() {
                return Ok(None);
            }
            let mut arc = Arc::new(self.outputs.no_output());
            if follow.target_has_arcs() {
                arc.flags = 0;
                arc.next_arc = follow.target;
            } else {
                arc.flags = BIT_LAST_ARC;
            }
            arc.output = follow.next_final_output.clone();
            arc.label = END_LABEL;
            arc.node_flags = arc.flags;
            return Ok(Some(arc));
        }

        if !follow.target_has_arcs() {
            return Ok(None);
        }

        let mut arc = Arc::new(self.outputs.no_output());
        input.set_position(follow.target);
        let flags = input.read_byte()?;
        arc.node_flags = flags;

        if flags == ARCS_FOR_DIRECT_ADDRESSING {
            self.read_fixed_length_header(&mut arc, input)?;
            let index = i64::from(label) - i64::from(arc.first_label);
            if index < 0 || index >= arc.num_arcs as i64 || !is_bit_set(index, &arc, input)? {
                return Ok(None);
            }
            self.read_arc_by_direct_addressing(&mut arc, input, index)?;
            return Ok(Some(arc));
        }

        if flags == ARCS_FOR_BINARY_SEARCH {
            self.read_fixed_length_header(&mut arc, input)?;
            let mut low = 0i64;
            let mut high = arc.num_arcs as i64 - 1;
            while low <= high {
                let mid = (low + high) / 2;
                // skip the flags byte
                input.set_position(arc_slot(&arc, mid) - 1);
                let mid_label = self.input_type.read_label(input)?;
                match mid_label.cmp(&label) {
                    std::cmp::Ordering::Less => low = mid + 1,
                    std::cmp::Ordering::Greater => high = mid - 1,
                    std::cmp::Ordering::Equal => {
                        arc.arc_idx = mid - 1;
                        self.read_next_real_arc(&mut arc, input)?;
                        return Ok(Some(arc));
                    }
                }
            }
            return Ok(None);
        }

        let mut arc = self.read_first_real_target_arc(follow.target, input)?;
        loop {
            if arc.label == label {
                return Ok(Some(arc));
            }
            if arc.label > label || arc.is_last() {
                return Ok(None);
            }
            self.read_next_real_arc(&mut arc, input)?;
        }
    }
}

// ---------------------------------------------------------------------------
// Presence bitmap of direct-addressing nodes
// ---------------------------------------------------------------------------

/// Position of the fixed-length arc slot `index`.
fn arc_slot<T>(arc: &Arc<T>, index: i64) -> i64 {
    arc.pos_arcs_start - (arc.bytes_per_arc as i64).saturating_mul(index)
}

fn read_presence_byte<T, R: BytesReader + ?Sized>(
    arc: &Arc<T>,
    byte_index: i64,
    input: &mut R,
) -> Result<u8, FstError> {
    input.set_position(arc.bit_table_start);
    input.skip_bytes(byte_index);
    input.read_byte()
}

fn is_bit_set<T, R: BytesReader + ?Sized>(
    index: i64,
    arc: &Arc<T>,
    input: &mut R,
) -> Result<bool, FstError> {
    let byte = read_presence_byte(arc, index >> 3, input)?;
    Ok(byte & (1 << (index & 7)) != 0)
}

/// Number of present arcs in the node.
pub(crate) fn count_bits<T, R: BytesReader + ?Sized>(
    arc: &Arc<T>,
    input: &mut R,
) -> Result<i64, FstError> {
    input.set_position(arc.bit_table_start);
    let mut count = 0i64;
    for _ in 0..num_presence_bytes(arc.num_arcs) {
        count += i64::from(input.read_byte()?.count_ones());
    }
    Ok(count)
}

/// Number of present arcs with a slot index below `index`.
fn count_bits_up_to<T, R: BytesReader + ?Sized>(
    index: i64,
    arc: &Arc<T>,
    input: &mut R,
) -> Result<i64, FstError> {
    input.set_position(arc.bit_table_start);
    let mut count = 0i64;
    for _ in 0..(index >> 3) {
        count += i64::from(input.read_byte()?.count_ones());
    }
    let rem = index & 7;
    if rem != 0 {
        let mask = (1u8 << rem) - 1;
        count += i64::from((input.read_byte()? & mask).count_ones());
    }
    Ok(count)
}

/// Index of the first present slot after `index`, or -1.
fn next_bit_set<T, R: BytesReader + ?Sized>(
    index: i64,
    arc: &Arc<T>,
    input: &mut R,
) -> Result<i64, FstError> {
    let start = index + 1;
    let range = arc.num_arcs as i64;
    if start >= range {
        return Ok(-1);
    }
    let num_bytes = num_presence_bytes(arc.num_arcs) as i64;
    let mut byte_index = start >> 3;
    let mut byte = read_presence_byte(arc, byte_index, input)? & (0xFFu8 << (start & 7));
    loop {
        if byte != 0 {
            let found = (byte_index << 3) + i64::from(byte.trailing_zeros());
            return Ok(if found < range { found } else { -1 });
        }
        byte_index += 1;
        if byte_index >= num_bytes {
            return Ok(-1);
        }
        byte = input.read_byte()?;
    }
}
