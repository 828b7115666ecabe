//! # ntix CLI
//!
//! Command-line interface for inspecting NTFS indexes extracted from a volume.
//!
//! ## Commands
//!
//! - `ntix info` - Show index root metadata
//! - `ntix ls` - Enumerate every entry of the index
//! - `ntix find <name>` - Look up a file name
//! - `ntix block <vcn>` - Dump one index block
//!
//! ## Example Usage
//!
//! ```bash
//! # Extract a directory's index attributes first, e.g. with ntfscat
//! ntfscat -a INDEX_ROOT -n '$I30' /dev/sdb1 /Windows > root.bin
//! ntfscat -a INDEX_ALLOCATION -n '$I30' /dev/sdb1 /Windows > alloc.bin
//!
//! # List the directory
//! ntix --root root.bin --alloc alloc.bin ls --filter "*.exe"
//!
//! # Look up a single name
//! ntix --root root.bin --alloc alloc.bin find notepad.exe
//! ```

mod app;
mod commands;
mod filter;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// ntix - NTFS index reader
#[derive(Parser)]
#[command(name = "ntix")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Raw value of the $INDEX_ROOT attribute
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Raw $INDEX_ALLOCATION stream (repeat for each extent, in VCN order)
    #[arg(short, long, global = true)]
    alloc: Vec<PathBuf>,

    /// Filesystem cluster size in bytes (overrides the config file)
    #[arg(long, global = true)]
    cluster_size: Option<u32>,

    /// Index attribute name (overrides the config file)
    #[arg(short, long, global = true)]
    name: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show index root metadata
    Info,

    /// Enumerate every entry of the index (breadth-first, not sorted)
    Ls {
        /// Only show names matching a wildcard pattern (*, ?)
        #[arg(short, long)]
        filter: Option<String>,

        /// Also show sentinel entries and DOS 8.3 aliases
        #[arg(long)]
        all: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Look up a file name (case-insensitive)
    Find {
        /// Name to look up
        name: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Read one index block and print its header and entries
    Block {
        /// VCN of the block, in index clusters
        vcn: i64,
    },
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => ntix_core::Config::load_from(path)?,
        None => ntix_core::Config::load()?,
    };

    // Setup logging
    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.general.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    if let Some(cluster_size) = cli.cluster_size {
        config.volume.cluster_size = cluster_size;
    }
    if let Some(name) = cli.name {
        config.index.name = name;
    }
    config.validate()?;

    let root = cli
        .root
        .ok_or_else(|| anyhow::anyhow!("--root <file> is required"))?;
    let app = app::App::open(config, &root, &cli.alloc)?;

    // Execute command
    match cli.command {
        Commands::Info => commands::info::run(&app),
        Commands::Ls {
            filter,
            all,
            output,
        } => commands::ls::run(&app, filter.as_deref(), all, output),
        Commands::Find { name, output } => commands::find::run(&app, &name, output),
        Commands::Block { vcn } => commands::block::run(&app, vcn),
    }
}
