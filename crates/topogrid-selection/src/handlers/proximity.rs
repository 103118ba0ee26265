//! Proximity handlers, both backed by `Hac` clustering.

use tracing::info;

use topogrid_core::{DescriptorKind, DistanceFunction, Node, NodeSet};
use topogrid_topology::{Hac, UNKNOWN_DISTANCE};

use crate::error::SelectionResult;
use crate::handlers::{SelectionContext, SelectionHandler};

/// Closest group of nodes, no limit on how far apart they may be.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestProximityHandler;

/// Closest group of nodes whose merge distances stay within the
/// descriptor's threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdProximityHandler;

impl SelectionHandler for BestProximityHandler {
    fn kind(&self) -> DescriptorKind {
        DescriptorKind::BestProximity
    }

    fn select(
        &self,
        ctx: &SelectionContext<'_>,
        number: usize,
        matched: &[Node],
    ) -> SelectionResult<NodeSet> {
        let function = ctx.descriptor.distance_function().unwrap_or_default();
        Ok(cluster(ctx, function, UNKNOWN_DISTANCE, number, matched))
    }
}

impl SelectionHandler for ThresholdProximityHandler {
    fn kind(&self) -> DescriptorKind {
        DescriptorKind::ThresholdProximity
    }

    fn select(
        &self,
        ctx: &SelectionContext<'_>,
        number: usize,
        matched: &[Node],
    ) -> SelectionResult<NodeSet> {
        let function = ctx.descriptor.distance_function().unwrap_or_default();
        let threshold = ctx.descriptor.threshold().unwrap_or(UNKNOWN_DISTANCE);
        Ok(cluster(ctx, function, threshold, number, matched))
    }
}

fn cluster(
    ctx: &SelectionContext<'_>,
    function: DistanceFunction,
    threshold: u64,
    number: usize,
    matched: &[Node],
) -> NodeSet {
    info!(?function, threshold, requested = number, "running clustering to find closest nodes");
    let hac = Hac::new(ctx.state.topology(), function, threshold);
    NodeSet::from_nodes(hac.select(number, matched))
}
