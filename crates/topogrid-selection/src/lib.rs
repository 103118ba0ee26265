//! topogrid-selection: topology-aware node selection.
//!
//! Tracks which nodes live on which host, learns host-to-host distances
//! in the background, and answers "pick N of these free nodes" under a
//! placement policy.
//!
//! # Architecture
//!
//! ```text
//! TopologyManager
//!   ├── RwLock<TopologyState>
//!   │     ├── Topology (host distance graph)
//!   │     └── host → nodes index
//!   ├── ProbeQueue (bounded mpsc → worker → Pinger)
//!   └── HandlerRegistry (DescriptorKind → SelectionHandler)
//! ```
//!
//! Node registration never waits on a probe: a new host joins with
//! unknown distances and the worker fills them in once measured.

pub mod error;
pub mod handlers;
pub mod manager;
pub mod pinger;
mod probe;
pub mod state;

pub use error::{SelectionError, SelectionResult};
pub use handlers::{HandlerRegistry, SelectionContext, SelectionHandler};
pub use manager::{Handler, TopologyManager};
pub use pinger::{PingError, Pinger, StaticPinger};
pub use state::TopologyState;
