//! Single-host policies.
//!
//! Both shrink the request one node at a time until some host can
//! satisfy it, so they return fewer nodes rather than none.

use std::collections::HashSet;

use topogrid_core::{DescriptorKind, HostAddr, Node, NodeSet};

use crate::error::SelectionResult;
use crate::handlers::{SelectionContext, SelectionHandler};

/// As many matched nodes as possible from one host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleHostHandler;

/// A whole host whose nodes are all free. Nodes beyond the requested
/// number come back as extras.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleHostExclusiveHandler;

impl SelectionHandler for SingleHostHandler {
    fn kind(&self) -> DescriptorKind {
        DescriptorKind::SingleHost
    }

    fn select(
        &self,
        ctx: &SelectionContext<'_>,
        number: usize,
        matched: &[Node],
    ) -> SelectionResult<NodeSet> {
        let free: HashSet<&Node> = matched.iter().collect();
        let mut wanted = number.min(matched.len());

        while wanted > 0 {
            for (_, nodes) in ctx.state.hosts() {
                if nodes.len() < wanted {
                    continue;
                }
                let picked: Vec<Node> = nodes
                    .iter()
                    .filter(|node| free.contains(node))
                    .take(wanted)
                    .cloned()
                    .collect();
                if picked.len() == wanted {
                    return Ok(NodeSet::from_nodes(picked));
                }
            }
            wanted -= 1;
        }
        Ok(NodeSet::new())
    }
}

impl SelectionHandler for SingleHostExclusiveHandler {
    fn kind(&self) -> DescriptorKind {
        DescriptorKind::SingleHostExclusive
    }

    fn select(
        &self,
        ctx: &SelectionContext<'_>,
        number: usize,
        matched: &[Node],
    ) -> SelectionResult<NodeSet> {
        let free: HashSet<&Node> = matched.iter().collect();
        let mut hosts: Vec<(&HostAddr, &[Node])> = ctx.state.hosts().collect();
        // Stable, so equal-sized hosts keep address order.
        hosts.sort_by_key(|(_, nodes)| nodes.len());
        let mut wanted = number.min(matched.len());

        while wanted > 0 {
            let mut busy: HashSet<HostAddr> = HashSet::new();
            for (host, nodes) in &hosts {
                if nodes.len() < wanted {
                    continue;
                }
                if nodes.iter().all(|node| free.contains(node)) {
                    return Ok(NodeSet::split_extra(nodes.iter(), wanted));
                }
                busy.insert(**host);
            }
            hosts.retain(|(host, _)| !busy.contains(*host));
            wanted -= 1;
        }
        Ok(NodeSet::new())
    }
}
