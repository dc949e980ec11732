//! Peerscope CLI
//!
//! Offline tooling over the topology model: fold collected self reports into
//! a graph, project a raw connection list, or look up a peer's pseudonym.
//! All input and output is JSON in the same shape nodes exchange.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use peerscope::{
    parse_relay_multiaddr, project, pseudonym_for_peer_id, ConnectionRecord, DebugInfo,
    GraphEdge, GraphNode, Multiaddr, PeerIdentifier, PeerscopeConfig, TopologyGraph,
};

/// Peerscope - peer liveness and topology inspection
#[derive(Parser, Debug)]
#[command(name = "peerscope")]
#[command(version)]
#[command(about = "Inspect peer connections and build topology graphs", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "peerscope.toml")]
    config: PathBuf,

    /// Primary relay multiaddr (overrides the config file)
    #[arg(long, env = "PEERSCOPE_PRIMARY_RELAY", value_parser = parse_relay_multiaddr)]
    primary_relay: Option<Multiaddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fold self reports into a topology graph
    Graph {
        /// Local peer id (defaults to the reporter of the first report)
        #[arg(long)]
        self_peer: Option<PeerIdentifier>,

        /// Files holding one report or an array of reports ("-" for stdin)
        #[arg(required = true)]
        reports: Vec<PathBuf>,
    },

    /// Project a JSON array of connection records
    Project {
        /// Input file ("-" for stdin)
        #[arg(default_value = "-")]
        input: PathBuf,
    },

    /// Print the pseudonym of a peer id
    Pseudonym {
        peer_id: String,
    },
}

#[derive(Serialize)]
struct GraphOutput {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = if args.config.exists() {
        PeerscopeConfig::load(&args.config)
            .with_context(|| format!("loading {}", args.config.display()))?
    } else {
        debug!("Config file {} not found, using defaults", args.config.display());
        PeerscopeConfig::default()
    };

    let config = match args.primary_relay {
        Some(relay) => config.with_primary_relay(Some(relay)),
        None => config,
    };
    config.validate()?;

    match args.command {
        Command::Graph { self_peer, reports } => {
            let mut collected = Vec::new();
            for path in &reports {
                collected.extend(read_reports(path)?);
            }

            let self_peer = match self_peer.or_else(|| collected.first().map(|r| r.self_info.peer_id.clone())) {
                Some(peer) => peer,
                None => anyhow::bail!("no self reports given"),
            };

            let graph = TopologyGraph::from_reports(&self_peer, &collected, config.effective_primary_relay());
            info!(
                "🕸️  Folded {} reports into {} nodes and {} edges",
                collected.len(),
                graph.node_count(),
                graph.edge_count()
            );

            print_json(&GraphOutput {
                nodes: graph.nodes(),
                edges: graph.edges(),
            })
        }
        Command::Project { input } => {
            let records: Vec<ConnectionRecord> = serde_json::from_str(&read_input(&input)?)
                .with_context(|| format!("parsing connection records from {}", input.display()))?;
            let projected = project(Some(&records), config.effective_primary_relay())?;
            print_json(&projected)
        }
        Command::Pseudonym { peer_id } => {
            println!("{}", pseudonym_for_peer_id(&peer_id));
            Ok(())
        }
    }
}

/// Read one report or an array of reports
fn read_reports(path: &Path) -> anyhow::Result<Vec<DebugInfo>> {
    let content = read_input(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;

    let reports = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<DebugInfo>, _>>(),
        single => serde_json::from_value(single).map(|report| vec![report]),
    }
    .with_context(|| format!("malformed self report in {}", path.display()))?;

    if reports.is_empty() {
        warn!("No reports in {}", path.display());
    }
    Ok(reports)
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        Ok(content)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
