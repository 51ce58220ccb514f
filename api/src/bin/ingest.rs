//! One-shot market data ingestion pass. Scheduled externally (cron or a
//! systemd timer); a failed run exits non-zero and is retried on the next
//! scheduled invocation.

use std::sync::Arc;

use api::{bootstrap::build_state, config::AppConfig, services::IngestService, telemetry};
use market_feed::BinanceFeed;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing()?;

    let config = AppConfig::from_env()?;
    let state = build_state(&config).await?;

    let feed = Arc::new(BinanceFeed::new(config.binance_api_base.clone()));
    let ingest = IngestService::new(feed, state.price_repo.clone());

    let written = ingest.run_once().await?;
    tracing::info!(written, "ingest finished");
    Ok(())
}
