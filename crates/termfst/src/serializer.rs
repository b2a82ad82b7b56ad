// Node serialization
//
// A frozen node is appended to the byte store as a list of variable-length
// arcs. Wide nodes are then expanded in place to a fixed stride so readers
// can binary search them, or index them directly by label when the label
// range is dense enough. Finally the node's bytes are reversed so its
// address is its last byte.

use termfst_core::DataOutput;
use termfst_core::array_util;

use crate::FstError;
use crate::builder::Builder;
use crate::fixed_arcs::HEADER_MAX_LEN;
use crate::fst::{
    ARCS_FOR_BINARY_SEARCH, ARCS_FOR_DIRECT_ADDRESSING, BIT_ARC_HAS_FINAL_OUTPUT,
    BIT_ARC_HAS_OUTPUT, BIT_FINAL_ARC, BIT_LAST_ARC, BIT_STOP_NODE, BIT_TARGET_NEXT,
    DIRECT_ADDRESSING_MAX_OVERSIZE_WITH_CREDIT_FACTOR, FIXED_LENGTH_ARC_DEEP_NUM_ARCS,
    FIXED_LENGTH_ARC_SHALLOW_DEPTH, FIXED_LENGTH_ARC_SHALLOW_NUM_ARCS, num_presence_bytes,
};
use crate::node::{CompiledAddress, FINAL_END_NODE, NON_FINAL_END_NODE, UnCompiledNode};
use crate::outputs::Outputs;

impl<O: Outputs> Builder<O> {
    /// Writes `node` and returns its address. Nodes without arcs are not
    /// written; they map to the end-node sentinels.
    pub(crate) fn add_node(
        &mut self,
        node: &UnCompiledNode<O::Value>,
    ) -> Result<CompiledAddress, FstError> {
        let num_arcs = node.num_arcs();
        if num_arcs == 0 {
            return Ok(if node.is_final {
                FINAL_END_NODE
            } else {
                NON_FINAL_END_NODE
            });
        }

        let start_address = self.fst.bytes.position();
        let do_fixed = self.should_expand_with_fixed_length_arcs(node);
        if do_fixed {
            array_util::grow(&mut self.num_bytes_per_arc, num_arcs)?;
            array_util::grow(&mut self.num_label_bytes_per_arc, num_arcs)?;
        }
        self.arc_count += num_arcs as u64;

        let no_output = self.fst.outputs.no_output();
        let input_type = self.fst.input_type;
        let last_arc = num_arcs - 1;
        let mut last_arc_start = start_address;
        let mut max_bytes_per_arc = 0usize;
        let mut max_bytes_per_arc_without_label = 0usize;

        for (idx, arc) in node.arcs.iter().enumerate() {
            let target = arc.target.address();
            let target_has_arcs = target > 0;

            let mut flags = 0u8;
            if idx == last_arc {
                flags |= BIT_LAST_ARC;
            }
            if target_has_arcs && self.last_frozen_node == target && !do_fixed {
                flags |= BIT_TARGET_NEXT;
            }
            if arc.is_final {
                flags |= BIT_FINAL_ARC;
                if arc.next_final_output != no_output {
                    flags |= BIT_ARC_HAS_FINAL_OUTPUT;
                }
            } else {
                debug_assert!(arc.next_final_output == no_output);
            }
            if !target_has_arcs {
                flags |= BIT_STOP_NODE;
            }
            if arc.output != no_output {
                flags |= BIT_ARC_HAS_OUTPUT;
            }

            let bytes = &mut self.fst.bytes;
            bytes.write_byte(flags);
            let label_start = bytes.position();
            input_type.write_label(bytes, arc.label);
            let num_label_bytes = (bytes.position() - label_start) as usize;

            if flags & BIT_ARC_HAS_OUTPUT != 0 {
                self.fst.outputs.write(&arc.output, bytes)?;
            }
            if flags & BIT_ARC_HAS_FINAL_OUTPUT != 0 {
                self.fst
                    .outputs
                    .write_final_output(&arc.next_final_output, bytes)?;
            }
            if target_has_arcs && flags & BIT_TARGET_NEXT == 0 {
                bytes.write_vlong(target as u64);
            }

            if do_fixed {
                let arc_end = bytes.position();
                let num_arc_bytes = (arc_end - last_arc_start) as usize;
                self.num_bytes_per_arc[idx] = num_arc_bytes;
                self.num_label_bytes_per_arc[idx] = num_label_bytes;
                last_arc_start = arc_end;
                max_bytes_per_arc = max_bytes_per_arc.max(num_arc_bytes);
                max_bytes_per_arc_without_label =
                    max_bytes_per_arc_without_label.max(num_arc_bytes - num_label_bytes);
            }
        }

        if do_fixed {
            debug_assert!(max_bytes_per_arc > 0);
            let first_label = node.arcs[0].label;
            let label_range = (i64::from(node.arcs[last_arc].label) - i64::from(first_label) + 1) as usize;
            if self.should_expand_with_direct_addressing(
                num_arcs,
                max_bytes_per_arc,
                max_bytes_per_arc_without_label,
                label_range,
            ) {
                self.write_node_for_direct_addressing(
                    node,
                    start_address,
                    max_bytes_per_arc_without_label,
                    label_range,
                )?;
                self.direct_addressing_node_count += 1;
            } else {
                self.write_node_for_binary_search(num_arcs, start_address, max_bytes_per_arc);
                self.binary_search_node_count += 1;
            }
        }

        let this_node_address = self.fst.bytes.position() - 1;
        self.fst.bytes.reverse(start_address, this_node_address);
        self.node_count += 1;
        log::trace!(
            "node {} at {this_node_address}: {num_arcs} arcs, {} bytes",
            self.node_count,
            this_node_address - start_address + 1
        );
        Ok(this_node_address)
    }

    fn should_expand_with_fixed_length_arcs(&self, node: &UnCompiledNode<O::Value>) -> bool {
        self.config.allow_fixed_length_arcs
            && ((node.depth <= FIXED_LENGTH_ARC_SHALLOW_DEPTH
                && node.num_arcs() >= FIXED_LENGTH_ARC_SHALLOW_NUM_ARCS)
                || node.num_arcs() >= FIXED_LENGTH_ARC_DEEP_NUM_ARCS)
    }

    /// Picks direct addressing when it is no larger than the binary-search
    /// layout scaled by the oversizing factor, or when banked credit from
    /// earlier smaller nodes covers the difference.
    fn should_expand_with_direct_addressing(
        &mut self,
        num_arcs: usize,
        max_bytes_per_arc: usize,
        max_bytes_per_arc_without_label: usize,
        label_range: usize,
    ) -> bool {
        if !self.config.direct_addressing_enabled() {
            return false;
        }
        let factor = self.config.direct_addressing_max_oversizing_factor;
        let size_for_binary_search = (max_bytes_per_arc * num_arcs) as i64;
        let size_for_direct_addressing = (num_presence_bytes(label_range)
            + self.num_label_bytes_per_arc[0]
            + max_bytes_per_arc_without_label * num_arcs) as i64;

        let allowed_oversize = (size_for_binary_search as f64 * f64::from(factor)) as i64;
        let expansion_cost = size_for_direct_addressing - allowed_oversize;
        if expansion_cost <= 0
            || (self.direct_addressing_expansion_credit >= expansion_cost
                && size_for_direct_addressing as f64
                    <= allowed_oversize as f64
                        * f64::from(DIRECT_ADDRESSING_MAX_OVERSIZE_WITH_CREDIT_FACTOR))
        {
            self.direct_addressing_expansion_credit -= expansion_cost;
            return true;
        }
        false
    }

    /// Spreads the arcs written since `start_address` to a stride of
    /// `max_bytes_per_arc` and puts the header in front.
    fn write_node_for_binary_search(
        &mut self,
        num_arcs: usize,
        start_address: i64,
        max_bytes_per_arc: usize,
    ) {
        let header_len = self.fixed_length_arcs_buffer.write_header(
            ARCS_FOR_BINARY_SEARCH,
            num_arcs as u32,
            max_bytes_per_arc as u32,
        );

        let bytes = &mut self.fst.bytes;
        let mut src_pos = bytes.position();
        let mut dest_pos = start_address + (header_len + num_arcs * max_bytes_per_arc) as i64;
        debug_assert!(dest_pos > src_pos);
        bytes.skip_bytes((dest_pos - src_pos) as usize);

        // last arc first so no source is overwritten before it moves
        for arc_idx in (0..num_arcs).rev() {
            dest_pos -= max_bytes_per_arc as i64;
            let arc_len = self.num_bytes_per_arc[arc_idx];
            src_pos -= arc_len as i64;
            if src_pos != dest_pos {
                bytes.copy_bytes(src_pos, dest_pos, arc_len);
            }
        }

        bytes.write_bytes_at(start_address, &self.fixed_length_arcs_buffer.bytes()[..header_len]);
    }

    /// Rewrites the node as header, presence bitmap, first label and then
    /// one label-free slot per present arc.
    fn write_node_for_direct_addressing(
        &mut self,
        node: &UnCompiledNode<O::Value>,
        start_address: i64,
        max_bytes_per_arc_without_label: usize,
        label_range: usize,
    ) -> Result<(), FstError> {
        let num_arcs = node.num_arcs();
        let presence_bytes = num_presence_bytes(label_range);
        let total_arc_bytes =
            self.num_label_bytes_per_arc[0] + num_arcs * max_bytes_per_arc_without_label;
        let arcs_start = HEADER_MAX_LEN + presence_bytes;
        let mut buffer_offset = arcs_start + total_arc_bytes;

        self.fixed_length_arcs_buffer.ensure_capacity(buffer_offset)?;
        let buffer = self.fixed_length_arcs_buffer.bytes_mut();
        buffer[arcs_start..buffer_offset].fill(0);

        let bytes = &self.fst.bytes;
        let mut src_pos = bytes.position();
        for arc_idx in (0..num_arcs).rev() {
            buffer_offset -= max_bytes_per_arc_without_label;
            let src_arc_len = self.num_bytes_per_arc[arc_idx];
            src_pos -= src_arc_len as i64;
            let label_len = self.num_label_bytes_per_arc[arc_idx];

            // flags, then everything after the label
            bytes.copy_to(src_pos, &mut buffer[buffer_offset..buffer_offset + 1]);
            let remaining = src_arc_len - 1 - label_len;
            if remaining > 0 {
                bytes.copy_to(
                    src_pos + 1 + label_len as i64,
                    &mut buffer[buffer_offset + 1..buffer_offset + 1 + remaining],
                );
            }
            if arc_idx == 0 {
                buffer_offset -= label_len;
                bytes.copy_to(src_pos + 1, &mut buffer[buffer_offset..buffer_offset + label_len]);
            }
        }
        debug_assert_eq!(buffer_offset, arcs_start);

        let header_len = self.fixed_length_arcs_buffer.write_header(
            ARCS_FOR_DIRECT_ADDRESSING,
            label_range as u32,
            max_bytes_per_arc_without_label as u32,
        );

        let bytes = &mut self.fst.bytes;
        let node_end = start_address + (header_len + presence_bytes + total_arc_bytes) as i64;
        let current = bytes.position();
        if node_end >= current {
            bytes.skip_bytes((node_end - current) as usize);
        } else {
            bytes.truncate(node_end);
        }
        debug_assert_eq!(bytes.position(), node_end);

        let buffer = self.fixed_length_arcs_buffer.bytes();
        let mut write_offset = start_address;
        bytes.write_bytes_at(write_offset, &buffer[..header_len]);
        write_offset += header_len as i64;
        bytes.write_bytes_at(write_offset, &presence_bits(node, presence_bytes));
        write_offset += presence_bytes as i64;
        bytes.write_bytes_at(write_offset, &buffer[arcs_start..arcs_start + total_arc_bytes]);
        Ok(())
    }
}

/// One bit per label in the node's range, set for labels that have an arc.
fn presence_bits<T>(node: &UnCompiledNode<T>, presence_bytes: usize) -> Vec<u8> {
    let mut bits = vec![0u8; presence_bytes];
    let first_label = node.arcs[0].label;
    for arc in &node.arcs {
        let index = (arc.label - first_label) as usize;
        bits[index >> 3] |= 1 << (index & 7);
    }
    bits
}
