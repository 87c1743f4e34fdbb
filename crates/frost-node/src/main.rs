// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! frost node CLI
//!
//! # Usage
//!
//! ```bash
//! # Load definitions into a 3-node cluster and print the reload reports
//! frost-node -d types/point.json -d types/reading.json load
//!
//! # Show the generated codec of a type
//! frost-node -d types/point.json describe geo.Point
//!
//! # Transcode a text-form instance to the binary form
//! frost-node -d types/point.json encode geo.Point '{"x":1,"y":2}'
//!
//! # Using a configuration file
//! frost-node --config node.toml load
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use frost_node::{to_hex, NodeConfig, NodeRuntime};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// frost node runtime
#[derive(Parser, Debug)]
#[command(name = "frost-node")]
#[command(about = "Loads type definitions into an in-process frost cluster")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of nodes (overrides the configuration file)
    #[arg(long)]
    nodes: Option<u32>,

    /// Leader node index (overrides the configuration file)
    #[arg(long)]
    leader: Option<u32>,

    /// Definition files to load after the configured ones (can repeat)
    #[arg(short, long = "definition")]
    definitions: Vec<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the definitions and print each node's outcome
    Load,

    /// Print the generated codec of a type
    Describe {
        /// Type name
        name: String,
    },

    /// Decode a text-form instance and print both wire forms
    Encode {
        /// Type name
        name: String,
        /// Instance in text form
        json: String,
    },

    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "frost.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = build_config(&args)?;

    let level = args.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.command {
        Commands::GenConfig { output } => cmd_gen_config(&output),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Load => cmd_load(config),
        Commands::Describe { name } => {
            let runtime = NodeRuntime::start(config)?;
            println!("{}", runtime.describe(&name)?);
            Ok(())
        }
        Commands::Encode { name, json } => {
            let runtime = NodeRuntime::start(config)?;
            let out = runtime.transcode(&name, &json)?;
            println!("type id: {}", out.type_id);
            println!("binary:  {}", to_hex(&out.binary));
            println!("text:    {}", out.text);
            Ok(())
        }
    }
}

fn build_config(args: &Args) -> Result<NodeConfig> {
    let mut config = match &args.config {
        Some(path) => NodeConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(nodes) = args.nodes {
        config.nodes = nodes;
    }
    if let Some(leader) = args.leader {
        config.leader = leader;
    }
    config.definitions.extend(args.definitions.iter().cloned());
    config.validate()?;
    Ok(config)
}

fn cmd_load(mut config: NodeConfig) -> Result<()> {
    // Loaded one at a time so each report can be printed.
    let definitions = std::mem::take(&mut config.definitions);
    let runtime = NodeRuntime::start(config)?;
    for path in &definitions {
        let report = runtime
            .load_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
        println!("{} -> type id {} (leader {})", report.name, report.type_id, report.leader);
        for (node, outcome) in &report.nodes {
            match outcome {
                Ok(outcome) => println!("  {node}: {outcome:?}"),
                Err(e) => println!("  {node}: FAILED {e}"),
            }
        }
    }
    Ok(())
}

fn cmd_gen_config(output: &Path) -> Result<()> {
    let config = NodeConfig {
        definitions: vec![PathBuf::from("types/point.json")],
        ..Default::default()
    };
    std::fs::write(output, config.to_toml()?)?;
    println!("Generated configuration: {}", output.display());
    Ok(())
}

fn cmd_validate(path: &Path) -> Result<()> {
    let config = NodeConfig::from_file(path)?;
    println!("Configuration valid: {}", path.display());
    println!("  Nodes: {} (leader {})", config.nodes, config.leader);
    for def in &config.definitions {
        println!("  Definition: {}", def.display());
    }
    Ok(())
}
