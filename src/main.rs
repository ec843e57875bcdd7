use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stagegraph_core::config::{AppConfig, ConfigSource, DEFAULT_CONFIG_FILE};
use stagegraph_graph::{render, Graph, NodeId, ReadinessTracker, RenderOptions};
use stagegraph_pipeline::build_from_config;

#[derive(Parser)]
#[command(name = "stagegraph", version, about = "Compose and inspect multi-stage task graphs")]
struct Cli {
    /// Path to config file (default: ./stagegraph.toml, optional)
    #[arg(short, long, env = "STAGEGRAPH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the full graph and render it
    Render {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Plantuml)]
        format: Format,
    },
    /// Build the full graph and check its structure
    Validate,
    /// Complete nodes wave by wave and print when each becomes ready
    Simulate,
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Plantuml,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "stagegraph", &mut std::io::stdout());
        return Ok(());
    }

    let (config, source) =
        AppConfig::resolve(cli.config.as_deref(), Path::new(DEFAULT_CONFIG_FILE))
            .context("loading config")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &source {
        ConfigSource::File(path) => info!(path = %path.display(), "Loaded config"),
        ConfigSource::Defaults { missing } => {
            warn!(path = %missing.display(), "Config file not found, using defaults")
        }
    }

    match cli.command {
        Commands::Render { output, format } => {
            let graph = build_from_config(&config).context("building graph")?;
            let text = match format {
                Format::Plantuml => render::to_plantuml(&graph, &render_options(&config)),
                Format::Json => render::to_json(&graph)?,
            };
            write_output(output.as_deref(), &text)?;
        }
        Commands::Validate => {
            let graph = build_from_config(&config).context("building graph")?;
            graph.validate().context("validating graph")?;
            println!(
                "{}: {} nodes, {} edges, {} subgraphs, entry {} end {}",
                graph.name(),
                graph.node_count(),
                graph.edge_count(),
                graph.clusters().len(),
                graph.entry(),
                graph.end()
            );
        }
        Commands::Simulate => {
            let graph = build_from_config(&config).context("building graph")?;
            simulate(&graph, &mut std::io::stdout().lock())?;
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Completions { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}

fn render_options(config: &AppConfig) -> RenderOptions {
    RenderOptions {
        title: config.render.title.clone(),
        skin: config.render.skin.clone(),
    }
}

fn write_output(path: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Graph saved");
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// `alias.label` for clustered nodes, the bare label otherwise.
fn display_names(graph: &Graph) -> HashMap<NodeId, String> {
    let mut names: HashMap<NodeId, String> = graph
        .nodes()
        .map(|n| (n.id(), n.label().to_string()))
        .collect();
    for cluster in graph.clusters() {
        for id in &cluster.members {
            if let Some(name) = names.get_mut(id) {
                *name = format!("{}.{}", cluster.alias, name);
            }
        }
    }
    names
}

/// Complete every ready node wave by wave, writing one line per wave.
/// Returns the number of waves.
fn simulate(graph: &Graph, out: &mut impl Write) -> anyhow::Result<usize> {
    let names = display_names(graph);
    let mut tracker = ReadinessTracker::new(graph);
    let mut wave = tracker.ready_nodes();
    let mut round = 0;

    while !wave.is_empty() {
        round += 1;
        let labels: Vec<&str> = wave
            .iter()
            .map(|id| names.get(id).map(String::as_str).unwrap_or("?"))
            .collect();
        writeln!(out, "wave {round}: {}", labels.join(", "))?;

        let mut next = Vec::new();
        for id in wave {
            next.extend(tracker.complete(id)?);
        }
        wave = next;
    }

    if !tracker.is_finished() {
        anyhow::bail!("simulation stalled before {} completed", graph.end());
    }
    writeln!(out, "finished after {round} waves")?;
    Ok(round)
}
