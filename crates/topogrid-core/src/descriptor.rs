//! Placement descriptors.
//!
//! A `TopologyDescriptor` names the placement policy a caller wants for a
//! selection request. Each variant is served by exactly one handler in
//! `topogrid-selection`, looked up through its `DescriptorKind`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the distance between two host groups is derived from the
/// pairwise host distances (the clustering linkage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceFunction {
    /// Closest pair of hosts (single linkage).
    Min,
    /// Farthest pair of hosts (complete linkage).
    #[default]
    Max,
    /// Mean over all host pairs (average linkage).
    Avg,
}

impl FromStr for DistanceFunction {
    type Err = DescriptorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "avg" | "average" => Ok(Self::Avg),
            other => Err(DescriptorParseError::UnknownDistanceFunction(other.to_string())),
        }
    }
}

/// Placement policy for a selection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum TopologyDescriptor {
    /// Any nodes, no topology awareness.
    #[default]
    Arbitrary,
    /// The tightest cluster of nodes, no distance cap.
    BestProximity {
        #[serde(default)]
        function: DistanceFunction,
    },
    /// The tightest cluster whose merge distance stays within `threshold`.
    ThresholdProximity {
        #[serde(default)]
        function: DistanceFunction,
        threshold: u64,
    },
    /// All nodes on one host.
    SingleHost,
    /// One host with no busy node on it.
    SingleHostExclusive,
    /// Several hosts with no busy node, packed to minimize waste.
    MultipleHostsExclusive,
    /// One node per entirely free host, smallest hosts first.
    DifferentHostsExclusive,
}

impl TopologyDescriptor {
    pub const BEST_PROXIMITY: Self = Self::BestProximity {
        function: DistanceFunction::Max,
    };

    /// Threshold proximity with the default (`Max`) linkage.
    pub fn threshold_proximity(threshold: u64) -> Self {
        Self::ThresholdProximity {
            function: DistanceFunction::default(),
            threshold,
        }
    }

    pub fn kind(&self) -> DescriptorKind {
        match self {
            Self::Arbitrary => DescriptorKind::Arbitrary,
            Self::BestProximity { .. } => DescriptorKind::BestProximity,
            Self::ThresholdProximity { .. } => DescriptorKind::ThresholdProximity,
            Self::SingleHost => DescriptorKind::SingleHost,
            Self::SingleHostExclusive => DescriptorKind::SingleHostExclusive,
            Self::MultipleHostsExclusive => DescriptorKind::MultipleHostsExclusive,
            Self::DifferentHostsExclusive => DescriptorKind::DifferentHostsExclusive,
        }
    }

    /// Whether serving this policy needs topology tracking at all.
    pub fn is_topology_based(&self) -> bool {
        !matches!(self, Self::Arbitrary)
    }

    /// Whether serving this policy needs measured host distances.
    pub fn requires_distance(&self) -> bool {
        matches!(self, Self::BestProximity { .. } | Self::ThresholdProximity { .. })
    }

    /// Linkage for proximity policies.
    pub fn distance_function(&self) -> Option<DistanceFunction> {
        match self {
            Self::BestProximity { function } | Self::ThresholdProximity { function, .. } => {
                Some(*function)
            }
            _ => None,
        }
    }

    /// Maximum merge distance; `u64::MAX` for best proximity.
    pub fn threshold(&self) -> Option<u64> {
        match self {
            Self::BestProximity { .. } => Some(u64::MAX),
            Self::ThresholdProximity { threshold, .. } => Some(*threshold),
            _ => None,
        }
    }
}

impl fmt::Display for TopologyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BestProximity { function } => write!(f, "best-proximity({function:?})"),
            Self::ThresholdProximity {
                function,
                threshold,
            } => write!(f, "threshold-proximity({function:?}, {threshold})"),
            other => fmt::Display::fmt(&other.kind(), f),
        }
    }
}

/// Tag of a descriptor, used as the handler registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    Arbitrary,
    BestProximity,
    ThresholdProximity,
    SingleHost,
    SingleHostExclusive,
    MultipleHostsExclusive,
    DifferentHostsExclusive,
}

impl DescriptorKind {
    pub const ALL: [DescriptorKind; 7] = [
        DescriptorKind::Arbitrary,
        DescriptorKind::BestProximity,
        DescriptorKind::ThresholdProximity,
        DescriptorKind::SingleHost,
        DescriptorKind::SingleHostExclusive,
        DescriptorKind::MultipleHostsExclusive,
        DescriptorKind::DifferentHostsExclusive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arbitrary => "arbitrary",
            Self::BestProximity => "best-proximity",
            Self::ThresholdProximity => "threshold-proximity",
            Self::SingleHost => "single-host",
            Self::SingleHostExclusive => "single-host-exclusive",
            Self::MultipleHostsExclusive => "multiple-hosts-exclusive",
            Self::DifferentHostsExclusive => "different-hosts-exclusive",
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DescriptorKind {
    type Err = DescriptorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| DescriptorParseError::UnknownPolicy(s.to_string()))
    }
}

/// Errors raised when a descriptor is parsed from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorParseError {
    #[error("unknown placement policy: {0}")]
    UnknownPolicy(String),

    #[error("unknown distance function: {0}")]
    UnknownDistanceFunction(String),
}
