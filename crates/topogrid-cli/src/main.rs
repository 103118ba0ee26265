//! topogrid: inspect a cluster layout and dry-run node selections.
//!
//! # Usage
//!
//! ```text
//! topogrid topology --layout cluster.toml
//! topogrid select --layout cluster.toml --policy best-proximity -n 4
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use topogrid_core::{DescriptorKind, DistanceFunction};

mod commands;
mod layout;

#[derive(Parser)]
#[command(
    name = "topogrid",
    about = "TopoGrid: topology-aware node selection",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick nodes from a layout under a placement policy
    Select {
        /// Layout file describing hosts, nodes and distances
        #[arg(short, long)]
        layout: PathBuf,
        /// Placement policy, e.g. single-host-exclusive
        #[arg(short, long)]
        policy: DescriptorKind,
        /// Number of nodes to select
        #[arg(short, long)]
        number: usize,
        /// Linkage for proximity policies: min, max or avg
        #[arg(long, default_value = "max")]
        function: DistanceFunction,
        /// Largest merge distance for threshold-proximity
        #[arg(long)]
        threshold: Option<u64>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Show hosts and measured distances
    Topology {
        #[arg(short, long)]
        layout: PathBuf,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,topogrid=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Select {
            layout,
            policy,
            number,
            function,
            threshold,
            format,
        } => {
            let descriptor = commands::select::descriptor(policy, function, threshold)?;
            commands::select::run(&layout, &descriptor, number, &format).await
        }
        Commands::Topology { layout, format } => commands::topology::run(&layout, &format).await,
    }
}
