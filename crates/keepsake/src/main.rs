//! Keepsake - operator tooling for the session store.
//!
//! Main entry point for the Keepsake CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{check, config, snapshot};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Keepsake - server-side session store tooling
#[derive(Parser)]
#[command(name = "keepsake")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file to use instead of the discovered ones
    #[arg(long, global = true, env = "KEEPSAKE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configuration inspection
    Config(config::ConfigArgs),

    /// Snapshot file maintenance
    Snapshot(snapshot::SnapshotArgs),

    /// Run a session round trip against the configured store
    Check(check::CheckArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so that stdout stays clean for --json output
    let filter = if cli.verbose {
        "keepsake=debug,keepsake_session=debug,keepsake_config=debug,info"
    } else {
        "keepsake=info,keepsake_session=info,warn"
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
                ),
        )
        .init();

    let ctx = commands::Context {
        config_path: cli.config,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Config(args) => config::run(args, &ctx).await,
        Commands::Snapshot(args) => snapshot::run(args, &ctx).await,
        Commands::Check(args) => check::run(args, &ctx).await,
    }
}
