//! Topology configuration parser.
//!
//! The two feature flags mirror what the surrounding resource manager
//! exposes; the probe section tunes background distance measurement.
//!
//! ```toml
//! enabled = true
//! distance_enabled = true
//!
//! [probe]
//! timeout = "5s"
//! queue_depth = 1024
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_QUEUE_DEPTH: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Track hosts and nodes at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Measure host-to-host distances when a new host appears.
    #[serde(default = "default_true")]
    pub distance_enabled: bool,
    #[serde(default)]
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Deadline for a single probe, e.g. "500ms" or "5s".
    pub timeout: Option<String>,
    /// Capacity of the pending probe queue.
    pub queue_depth: Option<usize>,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        self.timeout
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(DEFAULT_PROBE_TIMEOUT)
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth
            .filter(|depth| *depth > 0)
            .unwrap_or(DEFAULT_QUEUE_DEPTH)
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            distance_enabled: true,
            probe: ProbeConfig::default(),
        }
    }
}

impl TopologyConfig {
    /// Topology tracking switched off entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            distance_enabled: false,
            probe: ProbeConfig::default(),
        }
    }

    /// Hosts and nodes are tracked but distances are never measured.
    pub fn without_distances() -> Self {
        Self {
            distance_enabled: false,
            ..Self::default()
        }
    }

    /// Whether new hosts should be probed for distances.
    pub fn probes_distances(&self) -> bool {
        self.enabled && self.distance_enabled
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn default_true() -> bool {
    true
}

/// Parse a humanized duration: "250ms", "5s", "2m", "1h", or plain seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
