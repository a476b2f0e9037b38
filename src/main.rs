//! Binary entry point for intelgraph.
//!
//! A thin inspection CLI over the configured graph backend. Results are
//! printed to stdout as JSON; logs go to stderr.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stdout/print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use intelgraph::{
    Direction, GraphBackend, GraphBackendFactory, GraphConfig, NodeId, Properties,
    TraversalParams, observability,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Intelgraph - inspect a graph store through the backend abstraction.
#[derive(Parser)]
#[command(name = "intelgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "INTELGRAPH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Show node and edge counts.
    Stats,

    /// Node operations.
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },

    /// Breadth-first traversal from a node.
    Traverse {
        /// Start node id.
        start: String,

        /// Maximum hops.
        #[arg(short, long, default_value_t = 3)]
        depth: u32,

        /// Edge direction: outgoing, incoming or both.
        #[arg(long, default_value = "outgoing", value_parser = parse_direction)]
        direction: Direction,

        /// Edge types to follow (repeatable).
        #[arg(short = 't', long = "edge-type")]
        edge_types: Vec<String>,

        /// Labels of returned nodes (repeatable).
        #[arg(short, long = "label")]
        labels: Vec<String>,

        /// Maximum results.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Find the shortest path, or all paths with `--all`.
    Path {
        /// Start node id.
        from: String,

        /// End node id.
        to: String,

        /// Maximum hops.
        #[arg(short = 'd', long, default_value_t = 5)]
        max_depth: u32,

        /// Edge types to follow (shortest path only).
        #[arg(short = 't', long = "edge-type")]
        edge_types: Vec<String>,

        /// Return every simple path up to `--limit`.
        #[arg(long)]
        all: bool,

        /// Maximum paths with `--all`.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// List direct neighbors of a node.
    Neighbors {
        /// Node id.
        id: String,

        /// Edge direction: outgoing, incoming or both.
        #[arg(long, default_value = "both", value_parser = parse_direction)]
        direction: Direction,

        /// Edge types to follow (repeatable).
        #[arg(short = 't', long = "edge-type")]
        edge_types: Vec<String>,

        /// Maximum results.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Run a native query (SQL or Cypher).
    Query {
        /// Query text with `$name` placeholders.
        text: String,

        /// Parameters as `name=<json>` (repeatable; bare strings allowed).
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, serde_json::Value)>,
    },
}

/// Node subcommands.
#[derive(Subcommand)]
enum NodeAction {
    /// Fetch a node by id.
    Get {
        /// Node id.
        id: String,
    },
}

fn parse_direction(s: &str) -> std::result::Result<Direction, String> {
    Direction::parse(s).ok_or_else(|| format!("unknown direction '{s}'"))
}

fn parse_param(s: &str) -> std::result::Result<(String, serde_json::Value), String> {
    let (name, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok((name.trim().to_string(), value))
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_logging(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<GraphConfig> {
    let config = match path {
        Some(path) => GraphConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GraphConfig::load_default(),
    };
    Ok(config.with_env_overrides())
}

async fn run(command: Commands, config: &GraphConfig) -> Result<()> {
    let backend = GraphBackendFactory::from_config(&config.graph).context("creating backend")?;
    backend
        .connect()
        .await
        .with_context(|| format!("connecting to {}", backend.backend_name()))?;

    let result = dispatch(command, &backend).await;
    backend.disconnect().await?;
    result
}

async fn dispatch(command: Commands, backend: &Arc<dyn GraphBackend>) -> Result<()> {
    match command {
        Commands::Stats => {
            let stats = backend.get_stats().await?;
            print_json(&serde_json::json!({
                "backend": backend.backend_name(),
                "node_count": stats.node_count,
                "edge_count": stats.edge_count,
                "avg_edges_per_node": stats.avg_edges_per_node(),
                "nodes_by_label": stats.nodes_by_label,
                "edges_by_type": stats.edges_by_type,
            }))
        },
        Commands::Node {
            action: NodeAction::Get { id },
        } => match backend.get_node(&NodeId::new(id.as_str())).await? {
            Some(node) => print_json(&node),
            None => bail!("node '{id}' not found"),
        },
        Commands::Traverse {
            start,
            depth,
            direction,
            edge_types,
            labels,
            limit,
        } => {
            let mut params = TraversalParams::new(depth)?
                .with_direction(direction)
                .with_edge_types(edge_types)
                .with_node_labels(labels);
            if let Some(limit) = limit {
                params = params.with_limit(limit)?;
            }
            let nodes = backend.traverse(&NodeId::new(start), &params).await?;
            print_json(&nodes)
        },
        Commands::Path {
            from,
            to,
            max_depth,
            edge_types,
            all,
            limit,
        } => {
            let (from, to) = (NodeId::new(from), NodeId::new(to));
            if all {
                let paths = backend.find_all_paths(&from, &to, max_depth, limit).await?;
                print_json(&paths)
            } else {
                let types = (!edge_types.is_empty()).then_some(edge_types.as_slice());
                match backend.find_shortest_path(&from, &to, max_depth, types).await? {
                    Some(path) => print_json(&path),
                    None => bail!("no path from '{from}' to '{to}' within {max_depth} hops"),
                }
            }
        },
        Commands::Neighbors {
            id,
            direction,
            edge_types,
            limit,
        } => {
            let types = (!edge_types.is_empty()).then_some(edge_types.as_slice());
            let nodes = backend
                .get_neighbors(&NodeId::new(id), direction, types, limit)
                .await?;
            print_json(&nodes)
        },
        Commands::Query { text, params } => {
            let parameters: Properties = params.into_iter().collect();
            let rows = backend.execute_query(&text, &parameters).await?;
            print_json(&rows)
        },
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
