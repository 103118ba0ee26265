//! Placement handlers.
//!
//! One `SelectionHandler` per descriptor kind. Handlers are stateless
//! strategies; everything they read comes from the `SelectionContext`
//! handed in for a single call. `HandlerRegistry` maps kinds to handlers
//! and is where custom policies get plugged in.

use std::collections::HashMap;
use std::sync::Arc;

use topogrid_core::{DescriptorKind, Node, NodeSet, TopologyDescriptor};

use crate::error::SelectionResult;
use crate::state::TopologyState;

mod arbitrary;
mod exclusive;
mod proximity;
mod single_host;

pub use arbitrary::ArbitraryHandler;
pub use exclusive::{DifferentHostsExclusiveHandler, MultipleHostsExclusiveHandler};
pub use proximity::{BestProximityHandler, ThresholdProximityHandler};
pub use single_host::{SingleHostExclusiveHandler, SingleHostHandler};

/// Everything a handler may read during one selection.
pub struct SelectionContext<'a> {
    pub state: &'a TopologyState,
    pub descriptor: &'a TopologyDescriptor,
}

/// A placement strategy.
///
/// Implementations must return only nodes taken from `matched`, at most
/// `number` of them as primary nodes. They never block and never touch
/// the topology lock themselves.
pub trait SelectionHandler: Send + Sync {
    fn kind(&self) -> DescriptorKind;

    fn select(
        &self,
        ctx: &SelectionContext<'_>,
        number: usize,
        matched: &[Node],
    ) -> SelectionResult<NodeSet>;
}

/// Descriptor kind → handler.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<DescriptorKind, Arc<dyn SelectionHandler>>,
}

impl HandlerRegistry {
    /// A registry with no handlers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with a handler for every built-in descriptor kind.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ArbitraryHandler));
        registry.register(Arc::new(BestProximityHandler));
        registry.register(Arc::new(ThresholdProximityHandler));
        registry.register(Arc::new(SingleHostHandler));
        registry.register(Arc::new(SingleHostExclusiveHandler));
        registry.register(Arc::new(MultipleHostsExclusiveHandler));
        registry.register(Arc::new(DifferentHostsExclusiveHandler));
        registry
    }

    /// Register `handler` for its kind, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn SelectionHandler>) -> Option<Arc<dyn SelectionHandler>> {
        self.handlers.insert(handler.kind(), handler)
    }

    pub fn remove(&mut self, kind: DescriptorKind) -> Option<Arc<dyn SelectionHandler>> {
        self.handlers.remove(&kind)
    }

    pub fn get(&self, kind: DescriptorKind) -> Option<Arc<dyn SelectionHandler>> {
        self.handlers.get(&kind).cloned()
    }

    /// Registered kinds in a stable order.
    pub fn kinds(&self) -> Vec<DescriptorKind> {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared layout: a current host with six nodes, a neighbour one hop
    //! away with one node, and a distant host with two nodes.

    use topogrid_core::{HostAddr, Node};

    use crate::state::TopologyState;

    pub const CURRENT: &str = "10.1.0.1";
    pub const NEIGHBOR: &str = "10.1.0.2";
    pub const DISTANT: &str = "10.9.0.1";

    pub fn addr(s: &str) -> HostAddr {
        s.parse().unwrap()
    }

    pub fn nodes_on(host: &str, name: &str, count: usize) -> Vec<Node> {
        (0..count)
            .map(|i| Node::new(format!("node://{host}/{name}-{i}"), addr(host), name))
            .collect()
    }

    pub struct Layout {
        pub current: Vec<Node>,
        pub neighbor: Vec<Node>,
        pub distant: Vec<Node>,
    }

    impl Layout {
        pub fn all(&self) -> Vec<Node> {
            self.current
                .iter()
                .chain(&self.neighbor)
                .chain(&self.distant)
                .cloned()
                .collect()
        }
    }

    pub fn layout() -> (TopologyState, Layout) {
        let layout = Layout {
            current: nodes_on(CURRENT, "current", 6),
            neighbor: nodes_on(NEIGHBOR, "neighbor", 1),
            distant: nodes_on(DISTANT, "distant", 2),
        };
        let mut state = TopologyState::with_nodes(&layout.all());
        state.set_distance(&addr(CURRENT), &addr(NEIGHBOR), 5);
        state.set_distance(&addr(CURRENT), &addr(DISTANT), 50);
        state.set_distance(&addr(NEIGHBOR), &addr(DISTANT), 60);
        (state, layout)
    }

    /// One host per entry in `sizes`, at 10.2.0.1, 10.2.0.2, ...
    pub fn hosts_with_sizes(sizes: &[usize]) -> (TopologyState, Vec<Vec<Node>>) {
        let hosts: Vec<Vec<Node>> = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| {
                let host = format!("10.2.0.{}", i + 1);
                nodes_on(&host, &format!("h{}", i + 1), *size)
            })
            .collect();
        let all: Vec<Node> = hosts.iter().flatten().cloned().collect();
        (TopologyState::with_nodes(&all), hosts)
    }
}
