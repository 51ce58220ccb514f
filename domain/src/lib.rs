use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tickers accepted as the basis of portfolio valuation, in preference order.
pub const REFERENCE_TICKERS: [&str; 3] = ["USD", "GBP", "BTC"];

/// Intermediary hop used when no direct rate to the reference currency exists.
pub const BRIDGE_TICKER: &str = "BTC";

pub fn is_reference_ticker(ticker: &str) -> bool {
    REFERENCE_TICKERS.contains(&ticker)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Currency {
    pub ticker: String,
    pub name: String,
}

impl Currency {
    pub fn new(ticker: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            name: name.into(),
        }
    }
}

/// One observed conversion: 1 unit of `from` equals `value` units of `to`.
/// Price rows are immutable once written.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Price {
    pub from_ticker: String,
    pub to_ticker: String,
    pub time: DateTime<Utc>,
    pub value: Decimal,
}

/// Current version of a user's price alert.
///
/// Alerts are stored as append-only versioned rows keyed by `id`; this struct
/// is always the most recent non-deleted version.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Alert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub from: Currency,
    pub to: Currency,
    pub above: bool,
    pub threshold: Decimal,
    pub created_time: DateTime<Utc>,
    pub sent: bool,
    pub updated_at: DateTime<Utc>,
}

/// Current version of a user's portfolio row: the reference currency used for
/// valuation plus uninvested cash denominated in it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Portfolio {
    pub user_id: Uuid,
    pub reference: Currency,
    pub cash: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Current version of one held asset. `purchased` is the cumulative cost
/// basis in the portfolio's reference currency; `amount` the quantity held.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Asset {
    pub user_id: Uuid,
    pub ticker: String,
    pub purchased: Decimal,
    pub amount: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// An alert whose condition is now satisfied, paired with the price row that
/// satisfied it and the owner's notification address.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TriggeredAlert {
    pub alert: Alert,
    pub address: String,
    pub price: Decimal,
    pub price_time: DateTime<Utc>,
}

/// Valuation of a single asset within a portfolio.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AssetValuation {
    pub ticker: String,
    pub amount: Decimal,
    pub purchased: Decimal,
    /// Current worth in the reference currency; zero when no price path is
    /// known.
    pub value: Decimal,
    /// Percentage of total portfolio value.
    pub share_of_portfolio: Decimal,
    /// Percentage gain or loss against cost basis.
    pub performance: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PortfolioValuation {
    pub reference: Currency,
    pub cash: Decimal,
    pub total_value: Decimal,
    pub total_purchased: Decimal,
    pub total_profit: Decimal,
    pub average_performance: Decimal,
    /// Ordered by descending value.
    pub assets: Vec<AssetValuation>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionInfo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
