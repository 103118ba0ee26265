//! Hosts, nodes, and selection results.
//!
//! A `Node` is a schedulable endpoint that lives on exactly one host.
//! Hosts are never created directly: they exist while at least one of
//! their nodes is registered with the topology manager.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Network address identifying a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostAddr(pub IpAddr);

impl HostAddr {
    pub fn ip(&self) -> IpAddr {
        self.0
    }
}

impl From<IpAddr> for HostAddr {
    fn from(ip: IpAddr) -> Self {
        Self(ip)
    }
}

impl FromStr for HostAddr {
    type Err = std::net::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<IpAddr>().map(Self)
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A single schedulable compute endpoint.
///
/// Nodes carry no free/busy state; a node is free for a given selection
/// when the caller passes it in the matched-nodes pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Node {
    /// Unique URL of the node.
    pub url: String,
    /// Address of the host the node runs on.
    pub host: HostAddr,
    /// Display name of the host.
    pub host_name: String,
}

impl Node {
    pub fn new(url: impl Into<String>, host: HostAddr, host_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            host,
            host_name: host_name.into(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Result of a selection: primary nodes plus optional surplus nodes.
///
/// Extra nodes sit on hosts touched by the selection and are offered to
/// the caller without counting towards the requested number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSet {
    nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    extra: Vec<Node>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            extra: Vec::new(),
        }
    }

    /// Split `nodes` into `number` primary nodes and the rest as extras.
    pub fn split_extra<'a, I>(nodes: I, number: usize) -> Self
    where
        I: IntoIterator<Item = &'a Node>,
    {
        let mut set = Self::new();
        for (i, node) in nodes.into_iter().enumerate() {
            if i < number {
                set.nodes.push(node.clone());
            } else {
                set.extra.push(node.clone());
            }
        }
        set
    }

    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn push_extra(&mut self, node: Node) {
        self.extra.push(node);
    }

    /// Append another set's primary and extra nodes to this one.
    pub fn merge(&mut self, other: NodeSet) {
        self.nodes.extend(other.nodes);
        self.extra.extend(other.extra);
    }

    /// Number of primary nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Surplus nodes, `None` when the selection offered none.
    pub fn extra_nodes(&self) -> Option<&[Node]> {
        if self.extra.is_empty() {
            None
        } else {
            Some(&self.extra)
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Primary nodes followed by extra nodes.
    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().chain(self.extra.iter())
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Node>) {
        (self.nodes, self.extra)
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl From<Vec<Node>> for NodeSet {
    fn from(nodes: Vec<Node>) -> Self {
        Self::from_nodes(nodes)
    }
}
