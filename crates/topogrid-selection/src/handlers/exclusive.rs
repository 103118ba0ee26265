//! Multi-host exclusive policies. Only hosts whose every node is in the
//! matched pool are considered.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::warn;

use topogrid_core::{DescriptorKind, HostAddr, Node, NodeSet};

use crate::error::{SelectionError, SelectionResult};
use crate::handlers::{SelectionContext, SelectionHandler};

/// Whole free hosts, packed to reach the requested number with as
/// little surplus as possible.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultipleHostsExclusiveHandler;

/// One node from each free host, smallest hosts first. The rest of
/// each chosen host comes back as extras.
#[derive(Debug, Clone, Copy, Default)]
pub struct DifferentHostsExclusiveHandler;

impl SelectionHandler for MultipleHostsExclusiveHandler {
    fn kind(&self) -> DescriptorKind {
        DescriptorKind::MultipleHostsExclusive
    }

    fn select(
        &self,
        ctx: &SelectionContext<'_>,
        number: usize,
        matched: &[Node],
    ) -> SelectionResult<NodeSet> {
        let free: HashSet<&Node> = matched.iter().collect();
        let mut per_host: HashMap<HostAddr, usize> = HashMap::new();
        for node in matched {
            *per_host.entry(node.host).or_default() += 1;
        }

        // (node count, host), so the largest fitting host is a range query.
        let mut free_hosts: BTreeSet<(usize, HostAddr)> = BTreeSet::new();
        for (host, count) in per_host {
            let nodes = ctx.state.nodes_on_host(&host).ok_or_else(|| {
                warn!(%host, "matched node on a host unknown to the topology");
                SelectionError::InconsistentState(format!("host {host} has no registered nodes"))
            })?;
            if nodes.len() == count && nodes.iter().all(|node| free.contains(node)) {
                free_hosts.insert((count, host));
            }
        }

        let mut result = NodeSet::new();
        let mut remaining = number;
        while remaining > 0 {
            let Some(entry) = closest_fit(&free_hosts, remaining) else {
                break;
            };
            free_hosts.remove(&entry);
            let (count, host) = entry;
            let nodes = ctx.state.nodes_on_host(&host).unwrap_or_default();

            if count > remaining {
                result.merge(NodeSet::split_extra(nodes, remaining));
                break;
            }
            result.merge(NodeSet::from_nodes(nodes.to_vec()));
            remaining -= count;
        }
        Ok(result)
    }
}

/// Largest host holding at most `target` nodes, else the largest host.
fn closest_fit(hosts: &BTreeSet<(usize, HostAddr)>, target: usize) -> Option<(usize, HostAddr)> {
    hosts
        .iter()
        .rev()
        .find(|(count, _)| *count <= target)
        .or_else(|| hosts.last())
        .copied()
}

impl SelectionHandler for DifferentHostsExclusiveHandler {
    fn kind(&self) -> DescriptorKind {
        DescriptorKind::DifferentHostsExclusive
    }

    fn select(
        &self,
        ctx: &SelectionContext<'_>,
        number: usize,
        matched: &[Node],
    ) -> SelectionResult<NodeSet> {
        let free: HashSet<&Node> = matched.iter().collect();
        let mut by_size: BTreeMap<usize, Vec<&[Node]>> = BTreeMap::new();
        for (_, nodes) in ctx.state.hosts() {
            if nodes.iter().all(|node| free.contains(node)) {
                by_size.entry(nodes.len()).or_default().push(nodes);
            }
        }

        let mut result = NodeSet::new();
        let mut remaining = number;
        for nodes in by_size.values().flatten() {
            if remaining == 0 {
                break;
            }
            let Some((first, rest)) = nodes.split_first() else {
                continue;
            };
            result.push(first.clone());
            for node in rest {
                result.push_extra(node.clone());
            }
            remaining -= 1;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::fixtures;
    use crate::state::TopologyState;
    use topogrid_core::TopologyDescriptor;

    fn select(
        handler: &dyn SelectionHandler,
        state: &TopologyState,
        number: usize,
        matched: &[Node],
    ) -> SelectionResult<NodeSet> {
        let descriptor = TopologyDescriptor::MultipleHostsExclusive;
        let ctx = SelectionContext {
            state,
            descriptor: &descriptor,
        };
        handler.select(&ctx, number, matched)
    }

    fn all(hosts: &[Vec<Node>]) -> Vec<Node> {
        hosts.iter().flatten().cloned().collect()
    }

    #[test]
    fn packs_largest_fitting_hosts() {
        let (state, hosts) = fixtures::hosts_with_sizes(&[1, 3, 4]);
        let result = select(&MultipleHostsExclusiveHandler, &state, 5, &all(&hosts)).unwrap();

        let mut expected = hosts[2].clone();
        expected.extend(hosts[0].iter().cloned());
        assert_eq!(result.nodes(), &expected[..]);
        assert!(result.extra_nodes().is_none());
    }

    #[test]
    fn overshoot_becomes_extra() {
        let (state, hosts) = fixtures::hosts_with_sizes(&[4]);
        let result = select(&MultipleHostsExclusiveHandler, &state, 3, &all(&hosts)).unwrap();

        assert_eq!(result.nodes(), &hosts[0][..3]);
        assert_eq!(result.extra_nodes(), Some(&hosts[0][3..]));
    }

    #[test]
    fn runs_out_of_free_hosts() {
        let (state, hosts) = fixtures::hosts_with_sizes(&[2, 2]);
        let matched = all(&hosts);
        let result = select(&MultipleHostsExclusiveHandler, &state, 10, &matched).unwrap();
        assert_eq!(result.len(), 4);

        // Host 2 has a busy node.
        let partial: Vec<Node> = matched[..3].to_vec();
        let result = select(&MultipleHostsExclusiveHandler, &state, 10, &partial).unwrap();
        assert_eq!(result.nodes(), &hosts[0][..]);
    }

    #[test]
    fn unregistered_host_is_inconsistent() {
        let (state, _) = fixtures::hosts_with_sizes(&[2]);
        let stranger = fixtures::nodes_on("10.7.0.1", "stranger", 1);

        let err = select(&MultipleHostsExclusiveHandler, &state, 1, &stranger).unwrap_err();
        assert!(matches!(err, SelectionError::InconsistentState(_)));
    }

    #[test]
    fn different_hosts_take_smallest_first() {
        let (state, hosts) = fixtures::hosts_with_sizes(&[1, 1, 3]);
        let result = select(&DifferentHostsExclusiveHandler, &state, 2, &all(&hosts)).unwrap();

        assert_eq!(result.nodes(), &[hosts[0][0].clone(), hosts[1][0].clone()]);
        assert!(result.extra_nodes().is_none());
    }

    #[test]
    fn different_hosts_return_rest_of_host_as_extra() {
        let (state, hosts) = fixtures::hosts_with_sizes(&[1, 1, 3]);
        let result = select(&DifferentHostsExclusiveHandler, &state, 3, &all(&hosts)).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.nodes()[2], hosts[2][0]);
        assert_eq!(result.extra_nodes(), Some(&hosts[2][1..]));
    }

    #[test]
    fn different_hosts_skip_partially_busy_hosts() {
        let (state, hosts) = fixtures::hosts_with_sizes(&[2, 1]);
        let matched = vec![hosts[0][0].clone(), hosts[1][0].clone()];

        let result = select(&DifferentHostsExclusiveHandler, &state, 2, &matched).unwrap();
        assert_eq!(result.nodes(), &hosts[1][..]);
    }
}
