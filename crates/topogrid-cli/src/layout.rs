//! Cluster layout files.
//!
//! ```toml
//! [topology]
//! distance_enabled = true
//!
//! [[hosts]]
//! name = "rack-a"
//! address = "10.0.0.1"
//! nodes = 4
//! busy = 1
//!
//! [[distances]]
//! from = "rack-a"
//! to = "rack-b"
//! ms = 3
//! ```
//!
//! Node URLs are derived as `node://<address>/<name>-<index>`. The first
//! `busy` nodes of a host are left out of the matched pool.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::info;

use topogrid_core::{HostAddr, Node, TopologyConfig};
use topogrid_selection::{StaticPinger, TopologyManager};

#[derive(Debug, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub topology: TopologyConfig,
    #[serde(default)]
    pub hosts: Vec<HostSpec>,
    #[serde(default)]
    pub distances: Vec<DistanceSpec>,
}

#[derive(Debug, Deserialize)]
pub struct HostSpec {
    pub name: String,
    pub address: HostAddr,
    pub nodes: usize,
    #[serde(default)]
    pub busy: usize,
}

#[derive(Debug, Deserialize)]
pub struct DistanceSpec {
    pub from: String,
    pub to: String,
    pub ms: u64,
}

impl HostSpec {
    fn node_list(&self) -> Vec<Node> {
        (0..self.nodes)
            .map(|i| {
                Node::new(
                    format!("node://{}/{}-{i}", self.address, self.name),
                    self.address,
                    self.name.as_str(),
                )
            })
            .collect()
    }
}

impl Layout {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read layout {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid layout {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let layout: Self = toml::from_str(content)?;
        layout.validate()?;
        Ok(layout)
    }

    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        let mut addresses = HashSet::new();
        for host in &self.hosts {
            if !names.insert(host.name.as_str()) {
                bail!("duplicate host name '{}'", host.name);
            }
            if !addresses.insert(host.address) {
                bail!("duplicate host address {}", host.address);
            }
            if host.nodes == 0 {
                bail!("host '{}' has no nodes", host.name);
            }
            if host.busy > host.nodes {
                bail!(
                    "host '{}' marks {} of {} nodes busy",
                    host.name,
                    host.busy,
                    host.nodes
                );
            }
        }
        for distance in &self.distances {
            for name in [&distance.from, &distance.to] {
                if !names.contains(name.as_str()) {
                    bail!("distance refers to unknown host '{name}'");
                }
            }
        }
        Ok(())
    }

    /// Every node in the layout, host by host.
    pub fn nodes(&self) -> Vec<Node> {
        self.hosts.iter().flat_map(HostSpec::node_list).collect()
    }

    /// Nodes available for selection.
    pub fn matched(&self) -> Vec<Node> {
        self.hosts
            .iter()
            .flat_map(|host| host.node_list().into_iter().skip(host.busy))
            .collect()
    }

    pub fn pinger(&self) -> Result<StaticPinger> {
        let mut pinger = StaticPinger::new();
        for distance in &self.distances {
            let from = self.address_of(&distance.from)?;
            let to = self.address_of(&distance.to)?;
            pinger.insert(from, to, distance.ms);
        }
        Ok(pinger)
    }

    /// Register every node with a fresh manager and wait for distances.
    pub async fn build_manager(&self) -> Result<TopologyManager> {
        let manager = TopologyManager::new(self.topology.clone()).with_pinger(Arc::new(self.pinger()?));
        for node in self.nodes() {
            manager.add_node(node).await;
        }
        manager.settled().await;

        info!(
            hosts = self.hosts.len(),
            nodes = self.hosts.iter().map(|h| h.nodes).sum::<usize>(),
            "layout loaded"
        );
        Ok(manager)
    }

    fn address_of(&self, name: &str) -> Result<HostAddr> {
        self.hosts
            .iter()
            .find(|host| host.name == name)
            .map(|host| host.address)
            .with_context(|| format!("unknown host '{name}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = r#"
[[hosts]]
name = "rack-a"
address = "10.0.0.1"
nodes = 3
busy = 1

[[hosts]]
name = "rack-b"
address = "10.0.0.2"
nodes = 2

[[distances]]
from = "rack-a"
to = "rack-b"
ms = 7
"#;

    #[test]
    fn parse_layout() {
        let layout = Layout::parse(LAYOUT).unwrap();
        assert!(layout.topology.enabled);
        assert_eq!(layout.nodes().len(), 5);
        assert_eq!(layout.matched().len(), 4);
        assert_eq!(layout.nodes()[0].url, "node://10.0.0.1/rack-a-0");
        assert!(!layout.matched().contains(&layout.nodes()[0]));
    }

    #[test]
    fn rejects_bad_layouts() {
        let too_busy = "[[hosts]]\nname = \"a\"\naddress = \"10.0.0.1\"\nnodes = 1\nbusy = 2\n";
        assert!(Layout::parse(too_busy).is_err());

        let dangling = format!("{LAYOUT}\n[[distances]]\nfrom = \"rack-a\"\nto = \"rack-z\"\nms = 1\n");
        assert!(Layout::parse(&dangling).is_err());

        let duplicate = format!(
            "{LAYOUT}\n[[hosts]]\nname = \"rack-a\"\naddress = \"10.0.0.3\"\nnodes = 1\n"
        );
        assert!(Layout::parse(&duplicate).is_err());
    }

    #[tokio::test]
    async fn manager_sees_layout_distances() {
        let layout = Layout::parse(LAYOUT).unwrap();
        let manager = layout.build_manager().await.unwrap();

        let topology = manager.get_topology().await.unwrap();
        assert_eq!(topology.distance_by_name("rack-a", "rack-b"), Some(7));
        assert_eq!(manager.known_hosts().await.len(), 2);
    }
}
