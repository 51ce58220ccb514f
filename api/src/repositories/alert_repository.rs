use anyhow::{Context, Result};
use async_trait::async_trait;
use domain::{Alert, Currency, Price};
use sqlx::{postgres::PgRow, PgExecutor, PgPool, Row};
use uuid::Uuid;

/// A live unsent alert paired with the latest observation for its pair and
/// the owner's notification address. The matching engine decides whether the
/// observation actually satisfies the alert.
#[derive(Debug, Clone)]
pub struct AlertCandidate {
    pub alert: Alert,
    pub address: String,
    pub price: Price,
}

#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Alert>>;
    async fn find(&self, alert_id: Uuid, user_id: Uuid) -> Result<Option<Alert>>;
    /// Appends a new version of the alert. Creation, edits and re-arming are
    /// all the same operation: an insert, never an update in place.
    async fn append_version(&self, alert: &Alert) -> Result<()>;
    /// Appends a tombstone version. History stays queryable.
    async fn append_deleted(&self, alert: &Alert) -> Result<()>;
    /// Current non-deleted unsent alerts joined with the latest price per
    /// exact pair. Alerts whose pair has no price in the window are absent.
    async fn unsent_candidates(&self) -> Result<Vec<AlertCandidate>>;
    /// Appends `sent = true` versions for every alert, atomically.
    async fn mark_sent(&self, alerts: &[Alert]) -> Result<()>;
}

#[derive(Clone)]
pub struct PostgresAlertRepository {
    pool: PgPool,
}

impl PostgresAlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// The current (greatest-seq) version of every alert, joined with currency
/// display names. Callers filter on is_deleted/sent.
const CURRENT_ALERTS: &str = r#"
    SELECT a.id, a.user_id, a.from_ticker, cf.name AS from_name,
           a.to_ticker, ct.name AS to_name, a.above, a.threshold,
           a.created_time, a.sent, a.is_deleted, a.updated_at
    FROM (
        SELECT DISTINCT ON (id) *
        FROM crypto_alert
        ORDER BY id, seq DESC
    ) a
    JOIN crypto_currency cf ON cf.ticker = a.from_ticker
    JOIN crypto_currency ct ON ct.ticker = a.to_ticker
"#;

fn scan_alert(row: &PgRow) -> Result<Alert> {
    Ok(Alert {
        id: row.try_get("id").context("invalid id column")?,
        user_id: row.try_get("user_id").context("invalid user_id column")?,
        from: Currency {
            ticker: row.try_get("from_ticker")?,
            name: row.try_get("from_name")?,
        },
        to: Currency {
            ticker: row.try_get("to_ticker")?,
            name: row.try_get("to_name")?,
        },
        above: row.try_get("above")?,
        threshold: row.try_get("threshold")?,
        created_time: row.try_get("created_time")?,
        sent: row.try_get("sent")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn append_row<'e, E>(executor: E, alert: &Alert, is_deleted: bool) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO crypto_alert
            (id, user_id, from_ticker, to_ticker, above, threshold,
             created_time, sent, is_deleted, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())",
    )
    .bind(alert.id)
    .bind(alert.user_id)
    .bind(&alert.from.ticker)
    .bind(&alert.to.ticker)
    .bind(alert.above)
    .bind(alert.threshold)
    .bind(alert.created_time)
    .bind(alert.sent)
    .bind(is_deleted)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl AlertRepository for PostgresAlertRepository {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Alert>> {
        let sql = format!(
            "{CURRENT_ALERTS}
             WHERE a.user_id = $1 AND NOT a.is_deleted
             ORDER BY a.created_time DESC"
        );
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?;
        rows.iter().map(scan_alert).collect()
    }

    async fn find(&self, alert_id: Uuid, user_id: Uuid) -> Result<Option<Alert>> {
        let sql = format!(
            "{CURRENT_ALERTS}
             WHERE a.id = $1 AND a.user_id = $2 AND NOT a.is_deleted"
        );
        let row = sqlx::query(&sql)
            .bind(alert_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(scan_alert).transpose()
    }

    async fn append_version(&self, alert: &Alert) -> Result<()> {
        append_row(&self.pool, alert, false).await
    }

    async fn append_deleted(&self, alert: &Alert) -> Result<()> {
        append_row(&self.pool, alert, true).await
    }

    async fn unsent_candidates(&self) -> Result<Vec<AlertCandidate>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.user_id, a.from_ticker, cf.name AS from_name,
                   a.to_ticker, ct.name AS to_name, a.above, a.threshold,
                   a.created_time, a.sent, a.is_deleted, a.updated_at,
                   u.username, p.time AS price_time, p.value AS price_value
            FROM (
                SELECT DISTINCT ON (id) *
                FROM crypto_alert
                ORDER BY id, seq DESC
            ) a
            JOIN crypto_currency cf ON cf.ticker = a.from_ticker
            JOIN crypto_currency ct ON ct.ticker = a.to_ticker
            JOIN crypto_user u ON u.id = a.user_id
            JOIN (
                SELECT DISTINCT ON (from_ticker, to_ticker)
                       from_ticker, to_ticker, time, value
                FROM crypto_price
                ORDER BY from_ticker, to_ticker, time DESC
            ) p ON p.from_ticker = a.from_ticker AND p.to_ticker = a.to_ticker
            WHERE NOT a.is_deleted AND NOT a.sent
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                let alert = scan_alert(row)?;
                let price = Price {
                    from_ticker: alert.from.ticker.clone(),
                    to_ticker: alert.to.ticker.clone(),
                    time: row.try_get("price_time").context("invalid price_time")?,
                    value: row.try_get("price_value").context("invalid price_value")?,
                };
                Ok(AlertCandidate {
                    alert,
                    address: row.try_get("username").context("invalid username")?,
                    price,
                })
            })
            .collect()
    }

    async fn mark_sent(&self, alerts: &[Alert]) -> Result<()> {
        if alerts.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for alert in alerts {
            let mut sent = alert.clone();
            sent.sent = true;
            append_row(&mut *tx, &sent, false).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
