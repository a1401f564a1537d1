use anyhow::{Context, Result};
use clap::Parser;
use shoal_core::catalog::{load_snapshot, FileId};
use shoal_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use shoal_core::Config;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "shoal")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Optional TOML configuration file; environment overrides apply otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Print the effective session configuration
    Config,

    /// List the entries of a persisted catalog snapshot
    Catalog {
        /// Path to the snapshot file
        snapshot: PathBuf,
    },

    /// Derive the stable share identifier of a local file
    Id {
        /// File to hash
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = LogLevel::parse(&args.log_level).unwrap_or_else(|| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        LogLevel::Info
    });
    init_logging_with_config(LogConfig::new(log_level).json_format(args.json_logs))?;

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::from_env().context("loading config from environment")?,
    };

    match args.command {
        Some(Command::Config) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Some(Command::Catalog { snapshot }) => {
            let entries = load_snapshot(&snapshot)
                .with_context(|| format!("reading snapshot {}", snapshot.display()))?;
            info!(count = entries.len(), "snapshot loaded");

            let mut entries: Vec<_> = entries.into_values().collect();
            entries.sort_by(|a, b| a.1.cmp(&b.1));
            for entry in entries {
                println!("{}  {:>10} B  {}", entry.id(), entry.total_size(), entry.1);
            }
        }
        Some(Command::Id { path }) => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            println!("{}", FileId::from_bytes(&bytes));
        }
        None => {
            info!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}
