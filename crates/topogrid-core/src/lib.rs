//! topogrid-core: shared domain types for topology-aware node selection.
//!
//! - **`types`**: hosts, nodes, and the `NodeSet` selection result
//! - **`descriptor`**: placement policies (`TopologyDescriptor`) and
//!   the linkage functions used by proximity policies
//! - **`config`**: `TopologyConfig` feature flags and probe settings

pub mod config;
pub mod descriptor;
pub mod types;

pub use config::{ProbeConfig, TopologyConfig, parse_duration};
pub use descriptor::{DescriptorKind, DescriptorParseError, DistanceFunction, TopologyDescriptor};
pub use types::*;
