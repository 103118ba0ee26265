//! Host distance graph.
//!
//! Stores one weighted edge per unordered pair of known hosts. Every write
//! goes through `add_host_topology`, `update_host_distances` or
//! `remove_host_topology`, each of which keeps both directions of an edge
//! in sync, so `distance(a, b) == distance(b, a)` always holds.

use std::collections::HashMap;

use tracing::debug;

use topogrid_core::{HostAddr, Node};

/// Distance reported for host pairs that were never measured.
pub const UNKNOWN_DISTANCE: u64 = u64::MAX;

/// Symmetric weighted graph of host-to-host distances.
///
/// `Clone` produces an independent snapshot; later writes to the
/// original are not visible through it.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// host → (other host → distance).
    distances: HashMap<HostAddr, HashMap<HostAddr, u64>>,
    /// host → display name.
    names: HashMap<HostAddr, String>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn known_host(&self, host: &HostAddr) -> bool {
        self.distances.contains_key(host)
    }

    /// Insert `host` and record every supplied distance in both directions.
    ///
    /// Distances to hosts that are not part of the graph are ignored.
    pub fn add_host_topology(
        &mut self,
        name: &str,
        host: HostAddr,
        distances: &HashMap<HostAddr, u64>,
    ) {
        self.names.insert(host, name.to_string());
        self.distances.entry(host).or_default();
        let recorded = self.record_distances(host, distances);
        debug!(%host, %name, edges = recorded, "host added to topology");
    }

    /// Overwrite distances from an already known `host`.
    ///
    /// Returns the number of edges written; zero when `host` is unknown.
    pub fn update_host_distances(
        &mut self,
        host: &HostAddr,
        distances: &HashMap<HostAddr, u64>,
    ) -> usize {
        if !self.known_host(host) {
            return 0;
        }
        self.record_distances(*host, distances)
    }

    /// Remove `host` and every edge touching it. Returns its display name.
    pub fn remove_host_topology(&mut self, host: &HostAddr) -> Option<String> {
        let edges = self.distances.remove(host)?;
        for other in edges.keys() {
            if let Some(back) = self.distances.get_mut(other) {
                back.remove(host);
            }
        }
        let name = self.names.remove(host);
        debug!(%host, edges = edges.len(), "host removed from topology");
        name
    }

    /// Distance between two hosts, `UNKNOWN_DISTANCE` if never measured.
    pub fn distance(&self, a: &HostAddr, b: &HostAddr) -> u64 {
        if a == b && self.known_host(a) {
            return 0;
        }
        self.distances
            .get(a)
            .and_then(|edges| edges.get(b))
            .copied()
            .unwrap_or(UNKNOWN_DISTANCE)
    }

    /// Distance between two hosts looked up by display name.
    pub fn distance_by_name(&self, a: &str, b: &str) -> Option<u64> {
        let a = self.host_by_name(a)?;
        let b = self.host_by_name(b)?;
        Some(self.distance(&a, &b))
    }

    /// Distance between the hosts of two nodes.
    pub fn node_distance(&self, a: &Node, b: &Node) -> u64 {
        self.distance(&a.host, &b.host)
    }

    /// Both hosts are known and a measured distance links them.
    pub fn knows(&self, a: &HostAddr, b: &HostAddr) -> bool {
        self.known_host(a) && self.known_host(b) && self.distance(a, b) != UNKNOWN_DISTANCE
    }

    pub fn on_same_host(&self, a: &Node, b: &Node) -> bool {
        a.host == b.host
    }

    pub fn host_name(&self, host: &HostAddr) -> Option<&str> {
        self.names.get(host).map(String::as_str)
    }

    /// Known hosts in address order.
    pub fn hosts(&self) -> Vec<HostAddr> {
        let mut hosts: Vec<HostAddr> = self.distances.keys().copied().collect();
        hosts.sort();
        hosts
    }

    /// Every recorded edge once, as `(a, b, distance)` with `a < b`.
    pub fn edges(&self) -> Vec<(HostAddr, HostAddr, u64)> {
        let mut edges: Vec<_> = self
            .distances
            .iter()
            .flat_map(|(a, others)| {
                others
                    .iter()
                    .filter(move |(b, _)| a < *b)
                    .map(move |(b, d)| (*a, *b, *d))
            })
            .collect();
        edges.sort();
        edges
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    fn host_by_name(&self, name: &str) -> Option<HostAddr> {
        self.names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(host, _)| *host)
    }

    fn record_distances(&mut self, host: HostAddr, distances: &HashMap<HostAddr, u64>) -> usize {
        let mut recorded = 0;
        for (other, distance) in distances {
            if *other == host || !self.known_host(other) {
                continue;
            }
            self.distances.entry(host).or_default().insert(*other, *distance);
            self.distances.entry(*other).or_default().insert(host, *distance);
            recorded += 1;
        }
        recorded
    }
}
