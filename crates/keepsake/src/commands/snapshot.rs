//! Snapshot command - inspect and prune session snapshot files.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use keepsake_session::MemoryStore;
use keepsake_session::snapshot::read_snapshot;
use serde::Serialize;

use super::Context;

/// Arguments for the snapshot command.
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    #[command(subcommand)]
    pub command: SnapshotCommand,
}

#[derive(Subcommand, Debug)]
pub enum SnapshotCommand {
    /// List the sessions in a snapshot file
    Inspect {
        /// Snapshot file (defaults to the configured one)
        file: Option<PathBuf>,
    },

    /// Rewrite a snapshot file without its expired sessions
    Prune {
        /// Snapshot file (defaults to the configured one)
        file: Option<PathBuf>,
    },
}

/// Run the snapshot command.
pub async fn run(args: SnapshotArgs, ctx: &Context) -> Result<()> {
    match args.command {
        SnapshotCommand::Inspect { file } => cmd_inspect(&resolve(file, ctx)?, ctx).await,
        SnapshotCommand::Prune { file } => cmd_prune(&resolve(file, ctx)?, ctx).await,
    }
}

/// Use the given file, or fall back to `store.snapshot_path` from config.
fn resolve(file: Option<PathBuf>, ctx: &Context) -> Result<PathBuf> {
    if let Some(file) = file {
        return Ok(file);
    }
    let loaded = ctx.load_config()?;
    loaded
        .config
        .store()
        .snapshot_path
        .context("no snapshot file given and none configured in [store]")
}

#[derive(Debug, Serialize)]
struct EntryRow {
    id: String,
    expires_at: String,
    bytes: usize,
    expired: bool,
}

async fn cmd_inspect(path: &Path, ctx: &Context) -> Result<()> {
    let snapshot = read_snapshot(path)
        .await
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;

    let now = Utc::now();
    let rows: Vec<EntryRow> = snapshot
        .iter()
        .map(|(id, entry)| EntryRow {
            id: id.clone(),
            expires_at: entry.expires_at().to_rfc3339(),
            bytes: entry.data.len(),
            expired: entry.is_expired(now),
        })
        .collect();

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let expired = rows.iter().filter(|r| r.expired).count();
    println!(
        "{} sessions in {} ({} expired)\n",
        rows.len(),
        path.display(),
        expired
    );
    for row in &rows {
        let status = if row.expired { "expired" } else { "live" };
        println!(
            "  {:<28} {:<8} {:>8} bytes  {}",
            row.id, status, row.bytes, row.expires_at
        );
    }
    Ok(())
}

async fn cmd_prune(path: &Path, ctx: &Context) -> Result<()> {
    let snapshot = read_snapshot(path)
        .await
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let before = snapshot.len();

    let store = MemoryStore::new(before.max(1))?;
    store.restore(path).await;
    let purged = store.purge_expired().await?;
    let kept = store
        .persist(path)
        .await
        .with_context(|| format!("failed to write snapshot {}", path.display()))?;

    tracing::debug!(path = %path.display(), purged, kept, "Snapshot pruned");

    if ctx.json_output {
        let out = serde_json::json!({ "before": before, "purged": purged, "kept": kept });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!(
            "Pruned {}: {} expired removed, {} kept",
            path.display(),
            purged,
            kept
        );
    }
    Ok(())
}
