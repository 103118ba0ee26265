//! Selection error types.

use thiserror::Error;

use topogrid_core::DescriptorKind;

/// Errors raised while resolving or running a selection handler.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("topology is disabled")]
    TopologyDisabled,

    #[error("topology distance is disabled, cannot use distance-based descriptors")]
    DistanceDisabled,

    #[error("unknown descriptor type: {0}")]
    UnknownDescriptor(DescriptorKind),

    #[error("inconsistent topology state: {0}")]
    InconsistentState(String),
}

pub type SelectionResult<T> = Result<T, SelectionError>;
