use anyhow::{Context, Result};
use async_trait::async_trait;
use domain::{Currency, REFERENCE_TICKERS};
use sqlx::{PgPool, Row};

#[async_trait]
pub trait CurrencyRepository: Send + Sync {
    async fn find_by_ticker(&self, ticker: &str) -> Result<Option<Currency>>;
    /// All known currencies ordered by display name.
    async fn list_all(&self) -> Result<Vec<Currency>>;
    /// The reference currencies that actually exist in the directory, in
    /// fixed preference order (USD, GBP, BTC), not alphabetically.
    async fn reference_currencies(&self) -> Result<Vec<Currency>>;
}

#[derive(Clone)]
pub struct PostgresCurrencyRepository {
    pool: PgPool,
}

impl PostgresCurrencyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CurrencyRepository for PostgresCurrencyRepository {
    async fn find_by_ticker(&self, ticker: &str) -> Result<Option<Currency>> {
        let row = sqlx::query("SELECT ticker, name FROM crypto_currency WHERE ticker = $1")
            .bind(ticker)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Currency {
                ticker: row.try_get("ticker")?,
                name: row.try_get("name")?,
            })
        })
        .transpose()
    }

    async fn list_all(&self) -> Result<Vec<Currency>> {
        let rows = sqlx::query("SELECT ticker, name FROM crypto_currency ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Currency {
                    ticker: row.try_get("ticker").context("invalid ticker column")?,
                    name: row.try_get("name").context("invalid name column")?,
                })
            })
            .collect()
    }

    async fn reference_currencies(&self) -> Result<Vec<Currency>> {
        let tickers: Vec<String> = REFERENCE_TICKERS.iter().map(|t| t.to_string()).collect();
        let rows = sqlx::query("SELECT ticker, name FROM crypto_currency WHERE ticker = ANY($1)")
            .bind(&tickers)
            .fetch_all(&self.pool)
            .await?;

        let mut found = Vec::with_capacity(rows.len());
        for row in rows {
            found.push(Currency {
                ticker: row.try_get("ticker")?,
                name: row.try_get("name")?,
            });
        }
        // Preference order, not whatever the store returned.
        found.sort_by_key(|currency| {
            REFERENCE_TICKERS
                .iter()
                .position(|t| *t == currency.ticker)
                .unwrap_or(REFERENCE_TICKERS.len())
        });
        Ok(found)
    }
}
