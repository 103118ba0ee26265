//! Guarded topology state: the distance graph plus the host → nodes index.
//!
//! Only the manager and its probe worker mutate this, always under the
//! manager's write lock. Handlers get a shared reference for the
//! duration of one selection.

use std::collections::{BTreeMap, HashMap};

use topogrid_core::{HostAddr, Node};
use topogrid_topology::{Topology, UNKNOWN_DISTANCE};

/// Outcome of registering a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Registration {
    /// The node joined a host that was already known.
    Joined,
    /// The node was already registered.
    Duplicate,
    /// The node brought a new host. `targets` holds one representative
    /// node per other known host, to be probed for distances.
    NewHost { epoch: u64, targets: Vec<Node> },
}

/// Outcome of deregistering a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Deregistration {
    UnknownHost,
    UnknownNode,
    Removed,
    /// The last node of its host left and the host was dropped.
    HostDropped,
}

/// Topology graph and node index, kept consistent with each other.
///
/// A host is present in the graph exactly when it has at least one
/// registered node.
#[derive(Debug, Default)]
pub struct TopologyState {
    topology: Topology,
    nodes_on_host: BTreeMap<HostAddr, Vec<Node>>,
    /// Incarnation of each host; bumped every time a host is re-added.
    epochs: HashMap<HostAddr, u64>,
    next_epoch: u64,
}

impl TopologyState {
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Nodes registered on `host`, in registration order.
    pub fn nodes_on_host(&self, host: &HostAddr) -> Option<&[Node]> {
        self.nodes_on_host.get(host).map(Vec::as_slice)
    }

    /// Hosts in address order with their nodes.
    pub fn hosts(&self) -> impl Iterator<Item = (&HostAddr, &[Node])> {
        self.nodes_on_host
            .iter()
            .map(|(host, nodes)| (host, nodes.as_slice()))
    }

    pub fn host_count(&self) -> usize {
        self.nodes_on_host.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes_on_host.values().map(Vec::len).sum()
    }

    pub(crate) fn register(&mut self, node: Node) -> Registration {
        if let Some(nodes) = self.nodes_on_host.get_mut(&node.host) {
            if nodes.contains(&node) {
                return Registration::Duplicate;
            }
            nodes.push(node);
            return Registration::Joined;
        }

        let targets: Vec<Node> = self
            .nodes_on_host
            .values()
            .filter_map(|nodes| nodes.first().cloned())
            .collect();
        let unknown: HashMap<HostAddr, u64> = targets
            .iter()
            .map(|target| (target.host, UNKNOWN_DISTANCE))
            .collect();

        let host = node.host;
        self.topology
            .add_host_topology(&node.host_name, host, &unknown);
        self.nodes_on_host.insert(host, vec![node]);

        self.next_epoch += 1;
        let epoch = self.next_epoch;
        self.epochs.insert(host, epoch);
        Registration::NewHost { epoch, targets }
    }

    pub(crate) fn deregister(&mut self, node: &Node) -> Deregistration {
        let Some(nodes) = self.nodes_on_host.get_mut(&node.host) else {
            return Deregistration::UnknownHost;
        };
        let Some(position) = nodes.iter().position(|n| n == node) else {
            return Deregistration::UnknownNode;
        };
        nodes.remove(position);
        if !nodes.is_empty() {
            return Deregistration::Removed;
        }

        self.nodes_on_host.remove(&node.host);
        self.epochs.remove(&node.host);
        self.topology.remove_host_topology(&node.host);
        Deregistration::HostDropped
    }

    /// Apply measured distances from `host` if it is still the same
    /// incarnation that was probed. Returns the number of edges written,
    /// `None` when the result is stale.
    pub(crate) fn apply_distances(
        &mut self,
        host: &HostAddr,
        epoch: u64,
        distances: &HashMap<HostAddr, u64>,
    ) -> Option<usize> {
        if self.epochs.get(host) != Some(&epoch) {
            return None;
        }
        Some(self.topology.update_host_distances(host, distances))
    }

    #[cfg(test)]
    pub(crate) fn with_nodes(nodes: &[Node]) -> Self {
        let mut state = Self::default();
        for node in nodes {
            state.register(node.clone());
        }
        state
    }

    #[cfg(test)]
    pub(crate) fn set_distance(&mut self, a: &HostAddr, b: &HostAddr, distance: u64) {
        self.topology
            .update_host_distances(a, &HashMap::from([(*b, distance)]));
    }
}
