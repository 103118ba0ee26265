//! Topology manager integration tests.
//!
//! Drive the manager through its public API only: nodes come and go,
//! distances arrive from a table-driven pinger, and every placement
//! policy runs against the same three-site layout.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use topogrid_core::{DistanceFunction, HostAddr, Node, TopologyConfig, TopologyDescriptor};
use topogrid_selection::{SelectionError, StaticPinger, TopologyManager};

const CURRENT: &str = "192.168.10.1";
const NEIGHBOR: &str = "192.168.10.2";
const DISTANT: &str = "172.16.0.1";

fn addr(s: &str) -> HostAddr {
    s.parse().unwrap()
}

fn nodes_on(host: &str, name: &str, count: usize) -> Vec<Node> {
    (0..count)
        .map(|i| Node::new(format!("node://{host}/{name}-{i}"), addr(host), name))
        .collect()
}

struct Site {
    manager: TopologyManager,
    current: Vec<Node>,
    neighbor: Vec<Node>,
    distant: Vec<Node>,
}

impl Site {
    fn all(&self) -> Vec<Node> {
        self.current
            .iter()
            .chain(&self.neighbor)
            .chain(&self.distant)
            .cloned()
            .collect()
    }
}

fn pinger() -> StaticPinger {
    StaticPinger::new()
        .with_distance(addr(CURRENT), addr(NEIGHBOR), 5)
        .with_distance(addr(CURRENT), addr(DISTANT), 50)
        .with_distance(addr(NEIGHBOR), addr(DISTANT), 60)
}

async fn site(config: TopologyConfig) -> Site {
    let manager = TopologyManager::new(config).with_pinger(Arc::new(pinger()));
    let site = Site {
        manager,
        current: nodes_on(CURRENT, "current", 6),
        neighbor: nodes_on(NEIGHBOR, "neighbor", 1),
        distant: nodes_on(DISTANT, "distant", 2),
    };
    for node in site.all() {
        site.manager.add_node(node).await;
    }
    site.manager.settled().await;
    site
}

fn hosts_of<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> HashSet<HostAddr> {
    nodes.into_iter().map(|n| n.host).collect()
}

#[tokio::test]
async fn layout_is_registered_and_measured() {
    let site = site(TopologyConfig::default()).await;

    let mut expected = vec![addr(CURRENT), addr(NEIGHBOR), addr(DISTANT)];
    expected.sort();
    assert_eq!(site.manager.known_hosts().await, expected);
    assert_eq!(site.manager.get_nodes_on_host(&addr(CURRENT)).await, Some(site.current.clone()));

    let topology = site.manager.get_topology().await.unwrap();
    assert_eq!(topology.distance(&addr(CURRENT), &addr(NEIGHBOR)), 5);
    assert_eq!(topology.distance(&addr(DISTANT), &addr(NEIGHBOR)), 60);
    assert_eq!(topology.distance_by_name("current", "distant"), Some(50));
}

#[tokio::test]
async fn host_leaves_with_its_last_node() {
    let site = site(TopologyConfig::default()).await;

    site.manager.remove_node(&site.distant[0]).await;
    assert!(site.manager.get_topology().await.unwrap().known_host(&addr(DISTANT)));

    site.manager.remove_node(&site.distant[1]).await;
    let topology = site.manager.get_topology().await.unwrap();
    assert!(!topology.known_host(&addr(DISTANT)));
    assert!(site.manager.get_nodes_on_host(&addr(DISTANT)).await.is_none());

    // Re-adding the host measures it again.
    site.manager.add_node(site.distant[0].clone()).await;
    site.manager.settled().await;
    let topology = site.manager.get_topology().await.unwrap();
    assert_eq!(topology.distance(&addr(DISTANT), &addr(CURRENT)), 50);
}

#[tokio::test]
async fn topology_snapshot_is_detached() {
    let site = site(TopologyConfig::default()).await;
    let snapshot = site.manager.get_topology().await.unwrap();

    for node in &site.neighbor {
        site.manager.remove_node(node).await;
    }
    assert!(snapshot.known_host(&addr(NEIGHBOR)));
    assert!(!site.manager.get_topology().await.unwrap().known_host(&addr(NEIGHBOR)));
}

#[tokio::test]
async fn arbitrary_works_without_topology() {
    let site = site(TopologyConfig::disabled()).await;
    let all = site.all();

    let handler = site.manager.get_handler(&TopologyDescriptor::Arbitrary).unwrap();
    let result = handler.select(2, &all).await.unwrap();
    assert_eq!(result.nodes(), &all[..2]);

    assert!(matches!(
        site.manager.get_topology().await,
        Err(SelectionError::TopologyDisabled)
    ));
}

#[tokio::test]
async fn proximity_policies_follow_distances() {
    let site = site(TopologyConfig::default()).await;
    let all = site.all();

    let best = site
        .manager
        .select(&TopologyDescriptor::BEST_PROXIMITY, 7, &all)
        .await
        .unwrap();
    assert_eq!(hosts_of(&best), HashSet::from([addr(CURRENT), addr(NEIGHBOR)]));

    let capped = site
        .manager
        .select(&TopologyDescriptor::threshold_proximity(4), 9, &all)
        .await
        .unwrap();
    assert_eq!(capped.len(), 6);
    assert_eq!(hosts_of(&capped), HashSet::from([addr(CURRENT)]));

    let single_linkage = TopologyDescriptor::ThresholdProximity {
        function: DistanceFunction::Min,
        threshold: 50,
    };
    let everything = site.manager.select(&single_linkage, 9, &all).await.unwrap();
    assert_eq!(everything.len(), 9);
}

#[tokio::test]
async fn exclusive_policies_respect_busy_nodes() {
    let site = site(TopologyConfig::default()).await;
    // One node on the current host is busy.
    let free: Vec<Node> = site.all().into_iter().skip(1).collect();

    let single = site
        .manager
        .select(&TopologyDescriptor::SingleHostExclusive, 3, &free)
        .await
        .unwrap();
    assert_eq!(hosts_of(&single), HashSet::from([addr(DISTANT)]));
    assert_eq!(single.len(), 2);

    let multiple = site
        .manager
        .select(&TopologyDescriptor::MultipleHostsExclusive, 3, &free)
        .await
        .unwrap();
    assert_eq!(multiple.len(), 3);
    assert_eq!(hosts_of(&multiple), HashSet::from([addr(NEIGHBOR), addr(DISTANT)]));

    let different = site
        .manager
        .select(&TopologyDescriptor::DifferentHostsExclusive, 5, &free)
        .await
        .unwrap();
    assert_eq!(different.len(), 2);
    assert_eq!(different.extra_nodes().map(<[Node]>::len), Some(1));
}

#[tokio::test]
async fn single_host_fills_from_one_host() {
    let site = site(TopologyConfig::default()).await;
    let result = site
        .manager
        .select(&TopologyDescriptor::SingleHost, 4, &site.all())
        .await
        .unwrap();

    assert_eq!(result.len(), 4);
    assert_eq!(hosts_of(&result), HashSet::from([addr(CURRENT)]));
}

#[tokio::test]
async fn without_distances_host_policies_still_work() {
    let site = site(TopologyConfig::without_distances()).await;

    assert!(matches!(
        site.manager.get_handler(&TopologyDescriptor::BEST_PROXIMITY),
        Err(SelectionError::DistanceDisabled)
    ));
    let topology = site.manager.get_topology().await.unwrap();
    assert!(!topology.knows(&addr(CURRENT), &addr(NEIGHBOR)));

    let result = site
        .manager
        .select(&TopologyDescriptor::SingleHostExclusive, 1, &site.all())
        .await
        .unwrap();
    assert_eq!(result.nodes(), &site.neighbor[..]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_selections_and_churn() {
    let site = Arc::new(site(TopologyConfig::default()).await);
    let all = Arc::new(site.all());

    let mut readers = Vec::new();
    for reader in 0..8 {
        let site = site.clone();
        let all = all.clone();
        readers.push(tokio::spawn(async move {
            let descriptors = [
                TopologyDescriptor::Arbitrary,
                TopologyDescriptor::BEST_PROXIMITY,
                TopologyDescriptor::threshold_proximity(10),
                TopologyDescriptor::SingleHost,
                TopologyDescriptor::SingleHostExclusive,
                TopologyDescriptor::MultipleHostsExclusive,
                TopologyDescriptor::DifferentHostsExclusive,
            ];
            for round in 0..50 {
                let descriptor = descriptors[(reader + round) % descriptors.len()];
                let number = 1 + (round % 9);
                let result = site.manager.select(&descriptor, number, &all).await.unwrap();
                assert!(result.len() <= number);
                assert!(result.all_nodes().all(|n| all.contains(n)));
            }
        }));
    }

    let writer = {
        let site = site.clone();
        tokio::spawn(async move {
            let extra = nodes_on("10.200.0.1", "churn", 3);
            for _ in 0..50 {
                for node in &extra {
                    site.manager.add_node(node.clone()).await;
                }
                for node in &extra {
                    site.manager.remove_node(node).await;
                }
                tokio::task::yield_now().await;
            }
        })
    };

    tokio::time::timeout(Duration::from_secs(30), async {
        for reader in readers {
            reader.await.unwrap();
        }
        writer.await.unwrap();
    })
    .await
    .unwrap();

    site.manager.settled().await;
    assert_eq!(site.manager.known_hosts().await.len(), 3);
}

proptest! {
    #[test]
    fn selections_stay_inside_matched_pool(
        mask in prop::collection::vec(any::<bool>(), 9),
        number in 0usize..12,
        policy in 0usize..7,
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let site = site(TopologyConfig::default()).await;
            let matched: Vec<Node> = site
                .all()
                .into_iter()
                .zip(&mask)
                .filter(|(_, keep)| **keep)
                .map(|(node, _)| node)
                .collect();
            let descriptor = [
                TopologyDescriptor::Arbitrary,
                TopologyDescriptor::BEST_PROXIMITY,
                TopologyDescriptor::threshold_proximity(20),
                TopologyDescriptor::SingleHost,
                TopologyDescriptor::SingleHostExclusive,
                TopologyDescriptor::MultipleHostsExclusive,
                TopologyDescriptor::DifferentHostsExclusive,
            ][policy];

            let result = site.manager.select(&descriptor, number, &matched).await.unwrap();
            assert!(result.len() <= number);
            assert!(result.all_nodes().all(|n| matched.contains(n)));
            if number == 0 || matched.is_empty() {
                assert!(result.is_empty());
            }
        });
    }
}
