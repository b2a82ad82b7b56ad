// Builder configuration
//
// Pruning, suffix sharing and arc layout choices. The defaults build a
// minimal FST with every node kept, full suffix sharing and fixed-length
// arc arrays for wide nodes.

use crate::FstError;
use crate::fst::InputType;

/// Largest page size accepted for the byte store.
pub const MAX_BYTES_PAGE_BITS: u32 = 30;

/// Policy knobs for [`Builder`](crate::Builder).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BuilderConfig {
    /// Label width of every input.
    pub input_type: InputType,

    /// Drop a node (and its subtree) when fewer than this many inputs pass
    /// through it. 0 keeps everything.
    pub min_suffix_count1: u64,

    /// Drop a node when fewer than this many inputs pass through its
    /// parent. 0 keeps everything.
    pub min_suffix_count2: u64,

    /// Reuse an already-written node when an identical one is frozen.
    pub share_suffix: bool,

    /// Also share nodes with more than one arc. Only consulted when
    /// `share_suffix` is set.
    pub share_non_singleton_nodes: bool,

    /// Only share nodes at most this far from the end of an input.
    pub share_max_tail_length: usize,

    /// Allow binary-search and direct-addressing layouts for wide nodes.
    pub allow_fixed_length_arcs: bool,

    /// How much larger than the binary-search layout a direct-addressing
    /// node may be. 1.0 means "never larger"; a negative value disables
    /// direct addressing.
    pub direct_addressing_max_oversizing_factor: f32,

    /// Byte store page size as a power of two.
    pub bytes_page_bits: u32,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            input_type: InputType::Byte1,
            min_suffix_count1: 0,
            min_suffix_count2: 0,
            share_suffix: true,
            share_non_singleton_nodes: true,
            share_max_tail_length: usize::MAX,
            allow_fixed_length_arcs: true,
            direct_addressing_max_oversizing_factor: 1.0,
            bytes_page_bits: 15,
        }
    }
}

impl BuilderConfig {
    /// Defaults with the given label width.
    pub fn new(input_type: InputType) -> Self {
        Self {
            input_type,
            ..Self::default()
        }
    }

    /// Pruning thresholds; see the field docs.
    #[must_use]
    pub fn with_min_suffix_counts(mut self, min_suffix_count1: u64, min_suffix_count2: u64) -> Self {
        self.min_suffix_count1 = min_suffix_count1;
        self.min_suffix_count2 = min_suffix_count2;
        self
    }

    #[must_use]
    pub fn with_share_suffix(mut self, share_suffix: bool) -> Self {
        self.share_suffix = share_suffix;
        self
    }

    #[must_use]
    pub fn with_share_non_singleton_nodes(mut self, share: bool) -> Self {
        self.share_non_singleton_nodes = share;
        self
    }

    #[must_use]
    pub fn with_share_max_tail_length(mut self, max_tail_length: usize) -> Self {
        self.share_max_tail_length = max_tail_length;
        self
    }

    #[must_use]
    pub fn with_fixed_length_arcs(mut self, allow: bool) -> Self {
        self.allow_fixed_length_arcs = allow;
        self
    }

    #[must_use]
    pub fn with_direct_addressing_factor(mut self, factor: f32) -> Self {
        self.direct_addressing_max_oversizing_factor = factor;
        self
    }

    #[must_use]
    pub fn with_bytes_page_bits(mut self, bits: u32) -> Self {
        self.bytes_page_bits = bits;
        self
    }

    /// Checks values that would otherwise fail deep inside construction.
    pub fn validate(&self) -> Result<(), FstError> {
        if !(1..=MAX_BYTES_PAGE_BITS).contains(&self.bytes_page_bits) {
            return Err(FstError::InvalidConfig(format!(
                "bytes_page_bits must be in 1..={MAX_BYTES_PAGE_BITS}, got {}",
                self.bytes_page_bits
            )));
        }
        if !self.direct_addressing_max_oversizing_factor.is_finite() {
            return Err(FstError::InvalidConfig(format!(
                "direct_addressing_max_oversizing_factor must be finite, got {}",
                self.direct_addressing_max_oversizing_factor
            )));
        }
        Ok(())
    }

    /// `true` when any pruning threshold is active.
    pub fn prunes(&self) -> bool {
        self.min_suffix_count1 > 0 || self.min_suffix_count2 > 0
    }

    pub fn direct_addressing_enabled(&self) -> bool {
        self.allow_fixed_length_arcs && self.direct_addressing_max_oversizing_factor >= 0.0
    }
}
