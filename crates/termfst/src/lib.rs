//! Minimal acyclic finite-state transducers for sorted term dictionaries.
//!
//! Inputs are added in ascending order; the [`Builder`] freezes each suffix
//! as soon as no later input can touch it, shares identical suffixes and
//! pushes outputs toward the root. The result is a compact byte encoding
//! that can be read back with the arc-level API on [`Fst`].
//!
//! # Architecture
//!
//! - [`outputs`] -- Output algebra (none, integer, byte sequence, lists)
//! - [`bytes_store`] -- Block-paged byte arena with patching and reversal
//! - [`bytes_reader`] -- Forward and reverse cursors over stored bytes
//! - [`node`] -- Uncompiled frontier nodes and builder arcs
//! - [`node_hash`] -- Suffix dedup table keyed on frozen node content
//! - [`config`] -- Builder policy (pruning, sharing, arc layouts)
//! - [`builder`] -- Incremental minimal-FST construction
//! - [`serializer`] -- Node byte encoding (list, binary search, direct)
//! - [`fst`] -- The finished automaton and arc decoding
//! - [`format`] -- Self-describing save/load container
//! - [`util`] -- Lookup and enumeration over a finished FST

pub mod builder;
pub mod bytes_reader;
pub mod bytes_store;
pub mod config;
pub mod format;
pub mod fst;
pub mod node;
pub mod node_hash;
pub mod outputs;
pub mod serializer;
pub mod util;

mod fixed_arcs;

pub use builder::Builder;
pub use bytes_reader::BytesReader;
pub use bytes_store::BytesStore;
pub use config::BuilderConfig;
pub use fst::{Arc, Fst, InputType};
pub use outputs::{
    ByteSequenceOutputs, ListOfOutputs, NoOutput, NoOutputs, Outputs, PositiveIntOutputs,
};

use termfst_core::CoreError;

/// Error type for FST construction, encoding and loading.
#[derive(Debug, thiserror::Error)]
pub enum FstError {
    #[error("{0} cannot encode or decode outputs")]
    UnsupportedOutputEncoding(&'static str),
    #[error("{0} cannot merge outputs of duplicate inputs")]
    UnsupportedMerge(&'static str),
    #[error("output of {0} elements is too large to encode")]
    OutputTooLarge(usize),
    #[error("invalid builder configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid magic number in FST header")]
    InvalidMagic,
    #[error("unsupported FST format version {0}")]
    UnsupportedVersion(u8),
    #[error("invalid input type code {0}")]
    InvalidInputType(u8),
    #[error("data too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("corrupt FST data: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
}
