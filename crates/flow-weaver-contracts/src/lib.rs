//! Canonical data contracts shared across the Flow Weaver compilation
//! pipeline: port data types, port and node-type definitions, and a
//! content-hashing helper for structural-sharing equality.
//!
//! This crate has no knowledge of source text, macros, validation rules,
//! or planning — it only defines the vocabulary every pipeline stage in
//! `flow-weaver-core` agrees on.

pub mod data_type;
pub mod hash;
pub mod node_type;
pub mod port;

pub use data_type::{Coercion, CoercionClass, DataType};
pub use hash::ContentHash;
pub use node_type::{BranchingStrategy, ExecuteWhen, NodeType, NodeVariant, NodeVisuals};
pub use port::{PortDef, PortPlacement};
