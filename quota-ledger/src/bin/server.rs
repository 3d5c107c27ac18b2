//! Quota ledger host binary

use quota_ledger::{init_tracing, spawn_ledger_actor, Config, ManualClock, Metrics, QuotaLedger};
use std::error::Error;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    init_tracing(&config.logging)?;

    tracing::info!(service = %config.service_name, admin = %config.admin, "Starting quota ledger");

    let ledger = QuotaLedger::from_config(&config);
    let metrics = Metrics::new()?;

    // No block source is attached yet; heights stay at genesis
    let clock = Arc::new(ManualClock::new(0));

    let (handle, join) = spawn_ledger_actor(
        ledger,
        clock,
        Some(metrics),
        config.actor.mailbox_capacity,
    );
    tracing::info!(
        mailbox_capacity = config.actor.mailbox_capacity,
        "Ledger actor running"
    );

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down quota ledger");
    handle.shutdown().await?;
    let ledger = join.await?;

    ledger.journal().verify()?;
    ledger.state().check_invariants()?;
    tracing::info!(
        quotas = ledger.state().quota_count(),
        events = ledger.events().len(),
        "Ledger stopped cleanly"
    );

    Ok(())
}
