//! Topology manager: the single owner of topology state.
//!
//! Node lifecycle events (`add_node`, `remove_node`) take the write lock
//! briefly and never wait on a distance probe. Selections take the read
//! lock once for the whole run.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use topogrid_core::{HostAddr, Node, NodeSet, TopologyConfig, TopologyDescriptor};
use topogrid_topology::Topology;

use crate::error::{SelectionError, SelectionResult};
use crate::handlers::{HandlerRegistry, SelectionContext, SelectionHandler};
use crate::pinger::Pinger;
use crate::probe::{ProbeQueue, ProbeRequest};
use crate::state::{Deregistration, Registration, TopologyState};

/// Tracks hosts and nodes and hands out selection handlers.
pub struct TopologyManager {
    config: TopologyConfig,
    state: Arc<RwLock<TopologyState>>,
    registry: HandlerRegistry,
    /// Present once a pinger is attached and distances are enabled.
    probes: Option<ProbeQueue>,
}

impl TopologyManager {
    /// Create a manager with the standard handlers and no pinger.
    pub fn new(config: TopologyConfig) -> Self {
        info!(
            enabled = config.enabled,
            distance_enabled = config.distance_enabled,
            "topology manager created"
        );
        Self {
            config,
            state: Arc::new(RwLock::new(TopologyState::default())),
            registry: HandlerRegistry::standard(),
            probes: None,
        }
    }

    /// Replace the handler registry.
    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Attach a pinger and start the probe worker.
    ///
    /// Must be called from within a tokio runtime. Does nothing when
    /// distances are disabled.
    pub fn with_pinger(mut self, pinger: Arc<dyn Pinger>) -> Self {
        if !self.config.probes_distances() {
            debug!("distance probing disabled, pinger ignored");
            return self;
        }
        self.probes = Some(ProbeQueue::spawn(
            pinger,
            self.state.clone(),
            &self.config.probe,
        ));
        self
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    /// Register a node. A node on a new host adds the host with unknown
    /// distances and queues a probe to measure them.
    pub async fn add_node(&self, node: Node) {
        if !self.config.enabled {
            return;
        }

        let mut state = self.state.write().await;
        match state.register(node.clone()) {
            Registration::Joined => {
                debug!(%node, host = %node.host, "node added to known host");
            }
            Registration::Duplicate => {
                debug!(%node, "node already registered");
            }
            Registration::NewHost { epoch, targets } => {
                info!(%node, host = %node.host, name = %node.host_name, "new host added to topology");
                if !self.config.distance_enabled || targets.is_empty() {
                    return;
                }
                match &self.probes {
                    Some(probes) => {
                        probes.enqueue(ProbeRequest {
                            node,
                            epoch,
                            targets,
                        });
                    }
                    None => debug!(host = %node.host, "no pinger attached, distances stay unknown"),
                }
            }
        }
    }

    /// Deregister a node. The host goes away with its last node.
    pub async fn remove_node(&self, node: &Node) {
        if !self.config.enabled {
            return;
        }

        let mut state = self.state.write().await;
        match state.deregister(node) {
            Deregistration::Removed => debug!(%node, "node removed from topology"),
            Deregistration::HostDropped => {
                info!(%node, host = %node.host, "last node left, host removed from topology");
            }
            Deregistration::UnknownNode => {
                warn!(%node, host = %node.host, "node is not registered on its host");
            }
            Deregistration::UnknownHost => {
                warn!(%node, host = %node.host, "topology info does not exist for node");
            }
        }
    }

    /// Snapshot of the distance graph.
    pub async fn get_topology(&self) -> SelectionResult<Topology> {
        if !self.config.enabled {
            return Err(SelectionError::TopologyDisabled);
        }
        Ok(self.state.read().await.topology().clone())
    }

    /// Copy of the nodes registered on `host`, `None` if the host is unknown.
    pub async fn get_nodes_on_host(&self, host: &HostAddr) -> Option<Vec<Node>> {
        self.state
            .read()
            .await
            .nodes_on_host(host)
            .map(<[Node]>::to_vec)
    }

    /// Hosts with at least one registered node, in address order.
    pub async fn known_hosts(&self) -> Vec<HostAddr> {
        self.state
            .read()
            .await
            .hosts()
            .map(|(host, _)| *host)
            .collect()
    }

    /// Resolve the handler for `descriptor`.
    pub fn get_handler(&self, descriptor: &TopologyDescriptor) -> SelectionResult<Handler> {
        if descriptor.is_topology_based() && !self.config.enabled {
            return Err(SelectionError::TopologyDisabled);
        }
        if descriptor.requires_distance() && !self.config.distance_enabled {
            return Err(SelectionError::DistanceDisabled);
        }
        let strategy = self
            .registry
            .get(descriptor.kind())
            .ok_or(SelectionError::UnknownDescriptor(descriptor.kind()))?;

        Ok(Handler {
            descriptor: *descriptor,
            strategy,
            state: self.state.clone(),
        })
    }

    /// Resolve the handler for `descriptor` and run it.
    pub async fn select(
        &self,
        descriptor: &TopologyDescriptor,
        number: usize,
        matched: &[Node],
    ) -> SelectionResult<NodeSet> {
        self.get_handler(descriptor)?.select(number, matched).await
    }

    /// Wait until every queued distance probe has finished.
    pub async fn settled(&self) {
        if let Some(probes) = &self.probes {
            probes.settled().await;
        }
    }
}

/// A strategy bound to a descriptor and the manager's state.
///
/// Cheap to clone. Stays usable after the manager is dropped.
#[derive(Clone)]
pub struct Handler {
    descriptor: TopologyDescriptor,
    strategy: Arc<dyn SelectionHandler>,
    state: Arc<RwLock<TopologyState>>,
}

impl Handler {
    pub fn descriptor(&self) -> &TopologyDescriptor {
        &self.descriptor
    }

    /// Choose up to `number` nodes from `matched`, the nodes that are
    /// free and satisfy the caller's criteria.
    pub async fn select(&self, number: usize, matched: &[Node]) -> SelectionResult<NodeSet> {
        if number == 0 || matched.is_empty() {
            return Ok(NodeSet::new());
        }

        let state = self.state.read().await;
        let ctx = SelectionContext {
            state: &state,
            descriptor: &self.descriptor,
        };
        let result = self.strategy.select(&ctx, number, matched)?;
        drop(state);

        debug_assert!(
            result.len() <= number,
            "{} returned {} nodes for a request of {number}",
            self.descriptor,
            result.len()
        );
        debug_assert!(
            {
                let pool: HashSet<&Node> = matched.iter().collect();
                result.all_nodes().all(|node| pool.contains(node))
            },
            "{} selected a node outside the matched pool",
            self.descriptor
        );

        debug!(
            policy = %self.descriptor,
            requested = number,
            selected = result.len(),
            extra = result.extra_nodes().map_or(0, <[Node]>::len),
            "selection finished"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
