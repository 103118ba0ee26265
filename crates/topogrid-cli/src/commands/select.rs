use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use topogrid_core::{DescriptorKind, DistanceFunction, Node, NodeSet, TopologyDescriptor};

use crate::layout::Layout;

#[derive(Debug, Serialize)]
struct SelectionReport {
    policy: String,
    requested: usize,
    nodes: Vec<String>,
    extra: Vec<String>,
}

/// Build a descriptor from command-line flags.
pub fn descriptor(
    kind: DescriptorKind,
    function: DistanceFunction,
    threshold: Option<u64>,
) -> Result<TopologyDescriptor> {
    Ok(match kind {
        DescriptorKind::Arbitrary => TopologyDescriptor::Arbitrary,
        DescriptorKind::BestProximity => TopologyDescriptor::BestProximity { function },
        DescriptorKind::ThresholdProximity => TopologyDescriptor::ThresholdProximity {
            function,
            threshold: threshold.context("--threshold is required for threshold-proximity")?,
        },
        DescriptorKind::SingleHost => TopologyDescriptor::SingleHost,
        DescriptorKind::SingleHostExclusive => TopologyDescriptor::SingleHostExclusive,
        DescriptorKind::MultipleHostsExclusive => TopologyDescriptor::MultipleHostsExclusive,
        DescriptorKind::DifferentHostsExclusive => TopologyDescriptor::DifferentHostsExclusive,
    })
}

pub async fn run(
    path: &Path,
    descriptor: &TopologyDescriptor,
    number: usize,
    format: &str,
) -> Result<()> {
    let layout = Layout::load(path)?;
    let manager = layout.build_manager().await?;
    let result = manager.select(descriptor, number, &layout.matched()).await?;

    let report = report(descriptor, number, &result);
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", format_report(&report)),
    }
    Ok(())
}

fn report(descriptor: &TopologyDescriptor, number: usize, result: &NodeSet) -> SelectionReport {
    let urls = |nodes: &[Node]| nodes.iter().map(|n| n.url.clone()).collect::<Vec<_>>();
    SelectionReport {
        policy: descriptor.to_string(),
        requested: number,
        nodes: urls(result.nodes()),
        extra: result.extra_nodes().map(urls).unwrap_or_default(),
    }
}

fn format_report(report: &SelectionReport) -> String {
    let mut out = format!(
        "policy:   {}\nselected: {} of {}\n",
        report.policy,
        report.nodes.len(),
        report.requested
    );
    for url in &report.nodes {
        out.push_str(&format!("  {url}\n"));
    }
    if !report.extra.is_empty() {
        out.push_str(&format!("extra:    {}\n", report.extra.len()));
        for url in &report.extra {
            out.push_str(&format!("  {url}\n"));
        }
    }
    out
}
