//! Check command - exercise a full session round trip.

use std::sync::Arc;

use anyhow::{Result, ensure};
use clap::Args;
use keepsake_session::{MemoryStore, MemoryTransport, SessionManager, Store};

use super::{Context, session_options, store_config};

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Number of round trips to run
    #[arg(short = 'n', long, default_value_t = 1)]
    pub rounds: usize,
}

/// Run the check command.
///
/// The store is built with the configured capacity but without its snapshot
/// file, so the check never touches persisted sessions.
pub async fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let capacity = store_config(&loaded.config).capacity;
    let store = Arc::new(MemoryStore::new(capacity)?);
    let manager = SessionManager::new(store.clone(), session_options(&loaded.config))?;

    for round in 0..args.rounds {
        round_trip(&manager, store.as_ref(), round).await?;
    }

    if ctx.json_output {
        let out = serde_json::json!({ "ok": true, "rounds": args.rounds });
        println!("{}", serde_json::to_string(&out)?);
    } else {
        println!("Session round trip OK ({} rounds)", args.rounds);
    }
    Ok(())
}

/// Write a value as an anonymous client, read it back under the published id,
/// then destroy the session.
async fn round_trip(manager: &SessionManager, store: &MemoryStore, round: usize) -> Result<()> {
    let mut transport = MemoryTransport::default();
    let mut session = manager.begin(&transport).await?;
    session.set("round", round as i64).await?;
    ensure!(
        manager.finish(&mut session, &mut transport).await?,
        "modified session was not committed"
    );

    let Some(id) = transport.published().map(str::to_string) else {
        anyhow::bail!("no session id was published");
    };
    tracing::debug!(session_id = %id, round, "Session committed");

    let mut transport = MemoryTransport::new(Some(id.clone()));
    let mut session = manager.begin(&transport).await?;
    session.fetch().await?;
    ensure!(
        session.get_int("round") == round as i64,
        "session {id} did not read back its value"
    );

    session.destroy().await?;
    ensure!(
        store.get(&id).await?.is_none(),
        "session {id} still present after destroy"
    );
    ensure!(
        !manager.finish(&mut session, &mut transport).await?,
        "unmodified session was committed"
    );
    Ok(())
}
