use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use domain::{Price, BRIDGE_TICKER};
use market_feed::ParsedPrice;
use sqlx::{postgres::PgRow, PgPool, Row};

#[async_trait]
pub trait PriceRepository: Send + Sync {
    /// Most recent observation for the exact (from, to) pair. No inverse
    /// lookup: a price for A→B says nothing about B→A.
    async fn latest_rate(&self, from: &str, to: &str) -> Result<Option<Price>>;

    /// Most recent observation per (from, to) pair for every `from` in
    /// `froms`, restricted to rates quoted in the reference currency or the
    /// bridge currency, in one batch.
    async fn latest_rates_for(&self, froms: &[String], reference: &str) -> Result<Vec<Price>>;

    /// Writes one ingested snapshot: unseen tickers into the currency
    /// directory, then one price row per pair, all in a single transaction so
    /// a failed run leaves nothing behind.
    async fn record_snapshot(&self, prices: &[ParsedPrice]) -> Result<u64>;
}

#[derive(Clone)]
pub struct PostgresPriceRepository {
    pool: PgPool,
    /// Bound on how far back "latest" scans look; stale pairs count as
    /// unknown rather than erroring.
    window_days: i64,
}

impl PostgresPriceRepository {
    pub fn new(pool: PgPool, window_days: i64) -> Self {
        Self { pool, window_days }
    }

    fn window_start(&self) -> chrono::DateTime<Utc> {
        Utc::now() - ChronoDuration::days(self.window_days)
    }
}

fn scan_price(row: &PgRow) -> Result<Price> {
    Ok(Price {
        from_ticker: row.try_get("from_ticker").context("invalid from_ticker")?,
        to_ticker: row.try_get("to_ticker").context("invalid to_ticker")?,
        time: row.try_get("time").context("invalid time")?,
        value: row.try_get("value").context("invalid value")?,
    })
}

#[async_trait]
impl PriceRepository for PostgresPriceRepository {
    async fn latest_rate(&self, from: &str, to: &str) -> Result<Option<Price>> {
        let row = sqlx::query(
            "SELECT from_ticker, to_ticker, time, value
             FROM crypto_price
             WHERE from_ticker = $1 AND to_ticker = $2 AND time >= $3
             ORDER BY time DESC
             LIMIT 1",
        )
        .bind(from)
        .bind(to)
        .bind(self.window_start())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(scan_price).transpose()
    }

    async fn latest_rates_for(&self, froms: &[String], reference: &str) -> Result<Vec<Price>> {
        let rows = sqlx::query(
            "SELECT DISTINCT ON (from_ticker, to_ticker)
                    from_ticker, to_ticker, time, value
             FROM crypto_price
             WHERE from_ticker = ANY($1)
               AND to_ticker IN ($2, $3)
               AND time >= $4
             ORDER BY from_ticker, to_ticker, time DESC",
        )
        .bind(froms)
        .bind(reference)
        .bind(BRIDGE_TICKER)
        .bind(self.window_start())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(scan_price).collect()
    }

    async fn record_snapshot(&self, prices: &[ParsedPrice]) -> Result<u64> {
        if prices.is_empty() {
            return Ok(0);
        }
        let timestamp = Utc::now();
        let mut tx = self.pool.begin().await?;

        for price in prices {
            for ticker in [&price.from, &price.to] {
                sqlx::query(
                    "INSERT INTO crypto_currency (ticker, name)
                     VALUES ($1, $1)
                     ON CONFLICT (ticker) DO NOTHING",
                )
                .bind(ticker)
                .execute(&mut *tx)
                .await?;
            }
            sqlx::query(
                "INSERT INTO crypto_price (time, from_ticker, to_ticker, value)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(timestamp)
            .bind(&price.from)
            .bind(&price.to)
            .bind(price.value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(prices.len() as u64)
    }
}
