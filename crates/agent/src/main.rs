//! Outpost - local collection-and-sync agent
//!
//! Runs until interrupted, then flushes samplers and stops every worker.

use anyhow::Context;
use outpost_agent::utils::logging::{init_tracing, LogFormat};
use outpost_agent::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the subscriber so OUTPOST_LOG_FORMAT and RUST_LOG apply
    let dotenv = dotenvy::dotenv();
    init_tracing(LogFormat::from_env()).context("failed to install tracing subscriber")?;
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let ctx = AppContext::new().context("failed to initialise outpost")?;
    ctx.start().await.context("failed to start workers")?;

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    tracing::info!("shutdown requested");

    let report = ctx.health_check().await;
    tracing::info!(score = report.score, healthy = report.is_healthy, "final health report");

    ctx.shutdown().await.context("failed to stop workers cleanly")?;
    Ok(())
}
