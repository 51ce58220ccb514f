use anyhow::{Context, Result};
use async_trait::async_trait;
use domain::{Asset, Currency, Portfolio};
use rust_decimal::Decimal;
use sqlx::{postgres::PgRow, PgExecutor, PgPool, Row};
use uuid::Uuid;

#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    /// Current non-deleted portfolio version for the user, if one was ever
    /// configured.
    async fn current_portfolio(&self, user_id: Uuid) -> Result<Option<Portfolio>>;
    /// Current non-deleted asset versions for the user.
    async fn current_assets(&self, user_id: Uuid) -> Result<Vec<Asset>>;
    async fn current_asset(&self, user_id: Uuid, ticker: &str) -> Result<Option<Asset>>;
    /// Appends a new portfolio version (reference currency + cash).
    async fn set_portfolio(&self, portfolio: &Portfolio) -> Result<()>;
    /// Appends the asset and portfolio versions a trade resolves to in one
    /// transaction: either both land or neither does.
    async fn record_trade(&self, portfolio: &Portfolio, asset: &Asset) -> Result<()>;
}

#[derive(Clone)]
pub struct PostgresPortfolioRepository {
    pool: PgPool,
}

impl PostgresPortfolioRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn scan_portfolio(row: &PgRow) -> Result<Portfolio> {
    Ok(Portfolio {
        user_id: row.try_get("user_id").context("invalid user_id column")?,
        reference: Currency {
            ticker: row.try_get("reference_ticker")?,
            name: row.try_get("reference_name")?,
        },
        cash: row.try_get("cash")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn scan_asset(row: &PgRow) -> Result<Asset> {
    Ok(Asset {
        user_id: row.try_get("user_id").context("invalid user_id column")?,
        ticker: row.try_get("ticker")?,
        purchased: row.try_get("purchased")?,
        amount: row.try_get("amount")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn append_portfolio_row<'e, E>(executor: E, portfolio: &Portfolio) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO crypto_portfolio (user_id, reference_ticker, cash, is_deleted, updated_at)
         VALUES ($1, $2, $3, FALSE, NOW())",
    )
    .bind(portfolio.user_id)
    .bind(&portfolio.reference.ticker)
    .bind(portfolio.cash)
    .execute(executor)
    .await?;
    Ok(())
}

async fn append_asset_row<'e, E>(
    executor: E,
    user_id: Uuid,
    ticker: &str,
    purchased: Decimal,
    amount: Decimal,
) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO crypto_asset (user_id, ticker, purchased, amount, is_deleted, updated_at)
         VALUES ($1, $2, $3, $4, FALSE, NOW())",
    )
    .bind(user_id)
    .bind(ticker)
    .bind(purchased)
    .bind(amount)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl PortfolioRepository for PostgresPortfolioRepository {
    async fn current_portfolio(&self, user_id: Uuid) -> Result<Option<Portfolio>> {
        let row = sqlx::query(
            "SELECT p.user_id, p.reference_ticker, c.name AS reference_name,
                    p.cash, p.is_deleted, p.updated_at
             FROM (
                 SELECT DISTINCT ON (user_id) *
                 FROM crypto_portfolio
                 WHERE user_id = $1
                 ORDER BY user_id, seq DESC
             ) p
             JOIN crypto_currency c ON c.ticker = p.reference_ticker",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        if row.try_get::<bool, _>("is_deleted")? {
            return Ok(None);
        }
        scan_portfolio(&row).map(Some)
    }

    async fn current_assets(&self, user_id: Uuid) -> Result<Vec<Asset>> {
        let rows = sqlx::query(
            "SELECT user_id, ticker, purchased, amount, updated_at
             FROM (
                 SELECT DISTINCT ON (user_id, ticker) *
                 FROM crypto_asset
                 WHERE user_id = $1
                 ORDER BY user_id, ticker, seq DESC
             ) current
             WHERE NOT is_deleted
             ORDER BY ticker",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(scan_asset).collect()
    }

    async fn current_asset(&self, user_id: Uuid, ticker: &str) -> Result<Option<Asset>> {
        let row = sqlx::query(
            "SELECT user_id, ticker, purchased, amount, is_deleted, updated_at
             FROM crypto_asset
             WHERE user_id = $1 AND ticker = $2
             ORDER BY seq DESC
             LIMIT 1",
        )
        .bind(user_id)
        .bind(ticker)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        if row.try_get::<bool, _>("is_deleted")? {
            return Ok(None);
        }
        scan_asset(&row).map(Some)
    }

    async fn set_portfolio(&self, portfolio: &Portfolio) -> Result<()> {
        append_portfolio_row(&self.pool, portfolio).await
    }

    async fn record_trade(&self, portfolio: &Portfolio, asset: &Asset) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        append_asset_row(&mut *tx, asset.user_id, &asset.ticker, asset.purchased, asset.amount)
            .await?;
        append_portfolio_row(&mut *tx, portfolio).await?;
        tx.commit().await?;
        Ok(())
    }
}
