//! Distance probing seam.
//!
//! A `Pinger` measures round-trip distance from a newly added node to one
//! representative node on every other known host. Real implementations
//! run the probe on the new node itself; `StaticPinger` answers from a
//! fixed table for layouts and tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use topogrid_core::{HostAddr, Node};

#[derive(Debug, Error)]
pub enum PingError {
    #[error("cannot start probe on {node}: {reason}")]
    Creation { node: String, reason: String },

    #[error("node {node} failed while probing: {reason}")]
    Node { node: String, reason: String },

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
}

/// Measures distances from one node to a set of target nodes.
///
/// Hosts missing from the returned map keep an unknown distance.
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(
        &self,
        from: &Node,
        targets: &[Node],
    ) -> Result<HashMap<HostAddr, u64>, PingError>;
}

/// Table-driven pinger. Distances are symmetric.
#[derive(Debug, Clone, Default)]
pub struct StaticPinger {
    distances: HashMap<(HostAddr, HostAddr), u64>,
}

impl StaticPinger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_distance(mut self, a: HostAddr, b: HostAddr, distance: u64) -> Self {
        self.insert(a, b, distance);
        self
    }

    pub fn insert(&mut self, a: HostAddr, b: HostAddr, distance: u64) {
        self.distances.insert(ordered(a, b), distance);
    }

    pub fn distance(&self, a: &HostAddr, b: &HostAddr) -> Option<u64> {
        self.distances.get(&ordered(*a, *b)).copied()
    }
}

#[async_trait]
impl Pinger for StaticPinger {
    async fn ping(
        &self,
        from: &Node,
        targets: &[Node],
    ) -> Result<HashMap<HostAddr, u64>, PingError> {
        Ok(targets
            .iter()
            .filter_map(|target| {
                self.distance(&from.host, &target.host)
                    .map(|distance| (target.host, distance))
            })
            .collect())
    }
}

fn ordered(a: HostAddr, b: HostAddr) -> (HostAddr, HostAddr) {
    if a <= b { (a, b) } else { (b, a) }
}
