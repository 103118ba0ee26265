//! Threshold-bounded hierarchical agglomerative clustering (HAC).
//!
//! Candidates start grouped by host, one cluster per host. The two
//! closest clusters are merged repeatedly, where "closest" follows the
//! requested `DistanceFunction` as the linkage. Merging stops as soon as
//! one cluster holds enough candidate nodes, or when the closest pair is
//! farther apart than the threshold.
//!
//! This trades tightness for bounded time: the result is a good cluster,
//! not necessarily the optimal one.
//!
//! # Result
//!
//! - Some cluster reached `k` nodes: the first `k` nodes of the reaching
//!   cluster with the smallest diameter.
//! - Otherwise: every node of the largest cluster (fewer than `k`).

use std::collections::HashMap;

use tracing::debug;

use topogrid_core::{DistanceFunction, HostAddr, Node};

use crate::topology::{Topology, UNKNOWN_DISTANCE};

/// Clustering run over a borrowed topology.
pub struct Hac<'a> {
    topology: &'a Topology,
    function: DistanceFunction,
    threshold: u64,
}

/// A group of hosts and the candidate nodes on them.
#[derive(Debug)]
struct Cluster {
    hosts: Vec<HostAddr>,
    nodes: Vec<Node>,
    /// Largest host-to-host distance inside the cluster.
    diameter: u64,
}

impl<'a> Hac<'a> {
    /// `threshold` is the largest merge distance allowed; pass
    /// `UNKNOWN_DISTANCE` for no cap.
    pub fn new(topology: &'a Topology, function: DistanceFunction, threshold: u64) -> Self {
        Self {
            topology,
            function,
            threshold,
        }
    }

    /// Pick up to `k` close nodes from `candidates`.
    pub fn select(&self, k: usize, candidates: &[Node]) -> Vec<Node> {
        if k == 0 || candidates.is_empty() {
            return Vec::new();
        }

        let mut clusters = group_by_host(candidates);
        let mut active = vec![true; clusters.len()];
        let mut linkage = self.initial_linkage(&clusters);
        let mut merges = 0usize;

        while !clusters.iter().any(|c| c.nodes.len() >= k) {
            let Some((i, j, distance)) = closest_pair(&linkage, &active) else {
                break;
            };
            if distance > self.threshold {
                debug!(distance, threshold = self.threshold, "closest clusters exceed threshold");
                break;
            }

            self.merge(&mut clusters, &mut linkage, &active, i, j);
            active[j] = false;
            merges += 1;

            if clusters[i].nodes.len() >= k {
                break;
            }
        }

        let winner = pick_cluster(&clusters, &active, k);
        debug!(
            candidates = candidates.len(),
            requested = k,
            merges,
            "clustering finished"
        );

        match winner {
            Some(index) => clusters[index].nodes.iter().take(k).cloned().collect(),
            None => Vec::new(),
        }
    }

    fn initial_linkage(&self, clusters: &[Cluster]) -> Vec<Vec<u64>> {
        let n = clusters.len();
        let mut linkage = vec![vec![UNKNOWN_DISTANCE; n]; n];
        for i in 0..n {
            linkage[i][i] = 0;
            for j in (i + 1)..n {
                let d = self
                    .topology
                    .distance(&clusters[i].hosts[0], &clusters[j].hosts[0]);
                linkage[i][j] = d;
                linkage[j][i] = d;
            }
        }
        linkage
    }

    /// Fold cluster `j` into cluster `i` and refresh the linkage row of `i`.
    fn merge(
        &self,
        clusters: &mut [Cluster],
        linkage: &mut [Vec<u64>],
        active: &[bool],
        i: usize,
        j: usize,
    ) {
        let size_i = clusters[i].hosts.len() as u128;
        let size_j = clusters[j].hosts.len() as u128;

        for x in 0..clusters.len() {
            if !active[x] || x == i || x == j {
                continue;
            }
            let d = combine(self.function, linkage[i][x], size_i, linkage[j][x], size_j);
            linkage[i][x] = d;
            linkage[x][i] = d;
        }

        let span = self.cross_diameter(&clusters[i].hosts, &clusters[j].hosts);
        let absorbed = std::mem::take(&mut clusters[j].hosts);
        let absorbed_nodes = std::mem::take(&mut clusters[j].nodes);
        let absorbed_diameter = clusters[j].diameter;

        let target = &mut clusters[i];
        target.diameter = target.diameter.max(absorbed_diameter).max(span);
        target.hosts.extend(absorbed);
        target.nodes.extend(absorbed_nodes);
    }

    fn cross_diameter(&self, a: &[HostAddr], b: &[HostAddr]) -> u64 {
        let mut span = 0;
        for x in a {
            for y in b {
                span = span.max(self.topology.distance(x, y));
            }
        }
        span
    }
}

/// One cluster per host, in first-seen order.
fn group_by_host(candidates: &[Node]) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut index: HashMap<HostAddr, usize> = HashMap::new();
    for node in candidates {
        let slot = *index.entry(node.host).or_insert_with(|| {
            clusters.push(Cluster {
                hosts: vec![node.host],
                nodes: Vec::new(),
                diameter: 0,
            });
            clusters.len() - 1
        });
        clusters[slot].nodes.push(node.clone());
    }
    clusters
}

/// Lance-Williams style update of the distance to a third cluster.
fn combine(function: DistanceFunction, d_i: u64, size_i: u128, d_j: u64, size_j: u128) -> u64 {
    match function {
        DistanceFunction::Min => d_i.min(d_j),
        DistanceFunction::Max => d_i.max(d_j),
        DistanceFunction::Avg => {
            if d_i == UNKNOWN_DISTANCE || d_j == UNKNOWN_DISTANCE {
                UNKNOWN_DISTANCE
            } else {
                let weighted = u128::from(d_i) * size_i + u128::from(d_j) * size_j;
                (weighted / (size_i + size_j)) as u64
            }
        }
    }
}

/// Closest active pair `(i, j, distance)` with `i < j`; lowest indices win ties.
fn closest_pair(linkage: &[Vec<u64>], active: &[bool]) -> Option<(usize, usize, u64)> {
    let mut best: Option<(usize, usize, u64)> = None;
    for i in 0..linkage.len() {
        if !active[i] {
            continue;
        }
        for j in (i + 1)..linkage.len() {
            if !active[j] {
                continue;
            }
            let d = linkage[i][j];
            if best.is_none_or(|(_, _, current)| d < current) {
                best = Some((i, j, d));
            }
        }
    }
    best
}

/// Tightest cluster holding at least `k` nodes, else the largest one.
fn pick_cluster(clusters: &[Cluster], active: &[bool], k: usize) -> Option<usize> {
    let live: Vec<usize> = (0..clusters.len()).filter(|i| active[*i]).collect();

    let sufficient = live
        .iter()
        .copied()
        .filter(|i| clusters[*i].nodes.len() >= k)
        .min_by_key(|i| (clusters[*i].diameter, *i));
    if sufficient.is_some() {
        return sufficient;
    }

    live.into_iter().min_by_key(|i| {
        (
            std::cmp::Reverse(clusters[*i].nodes.len()),
            clusters[*i].diameter,
            *i,
        )
    })
}
