//! topogrid-topology: host distance graph and proximity clustering.
//!
//! Neither type here does any locking. The topology manager in
//! `topogrid-selection` owns the only mutable instance and guards it.
//!
//! # Components
//!
//! - **`topology`**: symmetric weighted graph over known hosts
//! - **`clustering`**: threshold-bounded agglomerative clustering used
//!   by the proximity placement policies

pub mod clustering;
pub mod topology;

pub use clustering::Hac;
pub use topology::{Topology, UNKNOWN_DISTANCE};
