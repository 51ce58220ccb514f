use std::sync::Arc;

use anyhow::Context;
use market_feed::{parse_prices, MarketFeed};
use tracing::info;

use crate::repositories::PriceRepository;

/// One-pass market data ingestion: fetch the full ticker snapshot, decompose
/// symbols into currency pairs, and append the observations.
///
/// Any feed or parse error aborts the run before anything is written, and the
/// snapshot itself lands in a single transaction, so a failed run never
/// leaves a partial price picture behind. Retried by the scheduler, not
/// in-process.
pub struct IngestService<F>
where
    F: MarketFeed + 'static,
{
    feed: Arc<F>,
    prices: Arc<dyn PriceRepository>,
}

impl<F> IngestService<F>
where
    F: MarketFeed + 'static,
{
    pub fn new(feed: Arc<F>, prices: Arc<dyn PriceRepository>) -> Self {
        Self { feed, prices }
    }

    /// Returns the number of price rows written.
    pub async fn run_once(&self) -> anyhow::Result<u64> {
        let tickers = self
            .feed
            .fetch_tickers()
            .await
            .context("market data fetch failed")?;
        let parsed = parse_prices(&tickers).context("market data parse failed")?;
        let written = self.prices.record_snapshot(&parsed).await?;

        metrics::counter!("prices_ingested_total").increment(written);
        info!(tickers = tickers.len(), written, "ingest pass complete");
        Ok(written)
    }
}
