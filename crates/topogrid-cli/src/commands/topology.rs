use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use topogrid_core::HostAddr;
use topogrid_topology::{Topology, UNKNOWN_DISTANCE};

use crate::layout::Layout;

#[derive(Debug, Serialize)]
struct TopologyReport {
    hosts: Vec<HostEntry>,
    distances: Vec<DistanceEntry>,
}

#[derive(Debug, Serialize)]
struct HostEntry {
    name: String,
    address: String,
    nodes: usize,
}

#[derive(Debug, Serialize)]
struct DistanceEntry {
    from: String,
    to: String,
    /// `None` while the distance is unknown.
    ms: Option<u64>,
}

pub async fn run(path: &Path, format: &str) -> Result<()> {
    let layout = Layout::load(path)?;
    let manager = layout.build_manager().await?;
    let topology = manager.get_topology().await?;

    let mut hosts = Vec::new();
    for host in topology.hosts() {
        hosts.push(HostEntry {
            name: topology.host_name(&host).unwrap_or_default().to_string(),
            address: host.to_string(),
            nodes: manager.get_nodes_on_host(&host).await.map_or(0, |nodes| nodes.len()),
        });
    }
    let report = TopologyReport {
        hosts,
        distances: distances(&topology),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", format_report(&report)),
    }
    Ok(())
}

fn distances(topology: &Topology) -> Vec<DistanceEntry> {
    let name = |host: &HostAddr| topology.host_name(host).unwrap_or_default().to_string();
    topology
        .edges()
        .into_iter()
        .map(|(a, b, d)| DistanceEntry {
            from: name(&a),
            to: name(&b),
            ms: (d != UNKNOWN_DISTANCE).then_some(d),
        })
        .collect()
}

fn format_report(report: &TopologyReport) -> String {
    let mut out = format!("hosts ({}):\n", report.hosts.len());
    for host in &report.hosts {
        out.push_str(&format!(
            "  {:<16} {:<40} {} nodes\n",
            host.name, host.address, host.nodes
        ));
    }
    out.push_str(&format!("distances ({}):\n", report.distances.len()));
    for edge in &report.distances {
        let ms = edge
            .ms
            .map_or_else(|| "unknown".to_string(), |ms| format!("{ms} ms"));
        out.push_str(&format!("  {} <-> {}: {ms}\n", edge.from, edge.to));
    }
    out
}
