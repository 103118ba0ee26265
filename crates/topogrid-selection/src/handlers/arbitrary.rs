use topogrid_core::{DescriptorKind, Node, NodeSet};

use crate::error::SelectionResult;
use crate::handlers::{SelectionContext, SelectionHandler};

/// First `number` matched nodes, in caller order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArbitraryHandler;

impl SelectionHandler for ArbitraryHandler {
    fn kind(&self) -> DescriptorKind {
        DescriptorKind::Arbitrary
    }

    fn select(
        &self,
        _ctx: &SelectionContext<'_>,
        number: usize,
        matched: &[Node],
    ) -> SelectionResult<NodeSet> {
        Ok(NodeSet::from_nodes(
            matched.iter().take(number).cloned().collect(),
        ))
    }
}
