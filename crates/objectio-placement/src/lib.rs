//! Static node registry and region-preferring shard placement (spec §4.2).

pub mod registry;

pub use registry::{NodeEntry, NodeRegistry};
