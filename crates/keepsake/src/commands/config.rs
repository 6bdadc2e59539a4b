//! Config command - configuration inspection.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration and where it came from
    Show,

    /// Show the user configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx).await,
        ConfigCommand::Path => cmd_path(ctx).await,
    }
}

async fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let config = &loaded.config;
    let store = config.store();
    let session = config.session();

    if ctx.json_output {
        let sources: Vec<String> = loaded
            .loaded_from()
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        let out = serde_json::json!({
            "sources": sources,
            "store": store,
            "session": session,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("# Keepsake Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    println!("Store:");
    println!("  capacity: {}", store.capacity);
    match &store.snapshot_path {
        Some(path) => {
            println!("  snapshot: {}", path.display());
            println!("  snapshot interval: {}s", store.snapshot_interval_secs);
        }
        None => println!("  snapshot: disabled"),
    }
    println!();

    println!("Session:");
    println!("  expiry: {}s", session.expiry_secs);
    println!("  lazy fetch: {}", session.lazy_fetch);

    if ctx.verbose {
        println!("\n---\nRaw config:\n");
        println!("{}", config.to_toml()?);
    }

    Ok(())
}

async fn cmd_path(ctx: &Context) -> Result<()> {
    let path = match &ctx.config_path {
        Some(path) => Some(path.clone()),
        None => keepsake_config::user_config_path(),
    };

    match path {
        Some(path) => println!("{}", path.display()),
        None => anyhow::bail!("could not determine a config directory for this platform"),
    }
    Ok(())
}
