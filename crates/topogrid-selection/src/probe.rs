//! Background distance probing.
//!
//! `add_node` enqueues a `ProbeRequest` and returns. A single worker task
//! drains the queue, runs the pinger under a deadline, and writes the
//! result back under a short write lock. Results for a host that was
//! dropped or re-added in the meantime are discarded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use topogrid_core::{HostAddr, Node, ProbeConfig};

use crate::pinger::{PingError, Pinger};
use crate::state::TopologyState;

#[derive(Debug, Clone)]
pub(crate) struct ProbeRequest {
    pub node: Node,
    pub epoch: u64,
    pub targets: Vec<Node>,
}

/// Handle to the probe worker.
pub(crate) struct ProbeQueue {
    tx: mpsc::Sender<ProbeRequest>,
    /// Requests accepted but not yet finished.
    pending: Arc<watch::Sender<usize>>,
    handle: JoinHandle<()>,
}

impl ProbeQueue {
    pub fn spawn(
        pinger: Arc<dyn Pinger>,
        state: Arc<RwLock<TopologyState>>,
        config: &ProbeConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_depth());
        let (pending, _) = watch::channel(0usize);
        let pending = Arc::new(pending);
        let timeout = config.timeout();

        let worker_pending = pending.clone();
        let handle = tokio::spawn(async move {
            run_probe_loop(rx, pinger, state, timeout, worker_pending).await;
        });

        debug!(
            queue_depth = config.queue_depth(),
            timeout_ms = timeout.as_millis() as u64,
            "probe worker started"
        );
        Self {
            tx,
            pending,
            handle,
        }
    }

    /// Queue a probe without waiting. Returns false if it was dropped.
    pub fn enqueue(&self, request: ProbeRequest) -> bool {
        self.pending.send_modify(|n| *n += 1);
        let node = request.node.url.clone();
        let targets = request.targets.len();
        match self.tx.try_send(request) {
            Ok(()) => {
                debug!(%node, targets, "distance probe queued");
                true
            }
            Err(TrySendError::Full(request)) => {
                warn!(node = %request.node, "probe queue full, distances stay unknown");
                self.pending.send_modify(|n| *n = n.saturating_sub(1));
                false
            }
            Err(TrySendError::Closed(request)) => {
                warn!(node = %request.node, "probe worker stopped, distances stay unknown");
                self.pending.send_modify(|n| *n = n.saturating_sub(1));
                false
            }
        }
    }

    /// Resolves once every accepted probe has finished.
    pub async fn settled(&self) {
        let mut rx = self.pending.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Drop for ProbeQueue {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run_probe_loop(
    mut rx: mpsc::Receiver<ProbeRequest>,
    pinger: Arc<dyn Pinger>,
    state: Arc<RwLock<TopologyState>>,
    timeout: Duration,
    pending: Arc<watch::Sender<usize>>,
) {
    while let Some(request) = rx.recv().await {
        let host = request.node.host;
        // A panicking pinger takes down its own task, not the worker.
        let task = {
            let pinger = pinger.clone();
            let request = request.clone();
            tokio::spawn(async move { probe(pinger.as_ref(), &request, timeout).await })
        };
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(PingError::Node {
                node: request.node.url.clone(),
                reason: format!("probe task failed: {e}"),
            }),
        };
        match outcome {
            Ok(distances) => {
                let mut state = state.write().await;
                match state.apply_distances(&host, request.epoch, &distances) {
                    Some(edges) => debug!(%host, edges, "host distances updated"),
                    None => debug!(%host, "host changed while probing, result dropped"),
                }
            }
            Err(e) => {
                warn!(node = %request.node, error = %e, "distance probe failed, distances stay unknown");
            }
        }
        pending.send_modify(|n| *n = n.saturating_sub(1));
    }
    debug!("probe worker stopped");
}

async fn probe(
    pinger: &dyn Pinger,
    request: &ProbeRequest,
    timeout: Duration,
) -> Result<HashMap<HostAddr, u64>, PingError> {
    let start = Instant::now();
    let distances =
        match tokio::time::timeout(timeout, pinger.ping(&request.node, &request.targets)).await {
            Ok(result) => result?,
            Err(_) => return Err(PingError::Timeout(timeout)),
        };

    debug!(
        node = %request.node,
        targets = request.targets.len(),
        measured = distances.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "distance probe finished"
    );
    for (target, distance) in &distances {
        trace!(from = %request.node.host, to = %target, distance, "measured distance");
    }
    Ok(distances)
}
