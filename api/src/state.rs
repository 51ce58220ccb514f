use std::sync::Arc;

use auth::SessionManager;
use sqlx::PgPool;

use crate::{
    config::AppConfig,
    repositories::{AlertRepository, CurrencyRepository, PortfolioRepository, PriceRepository},
    services::PortfolioService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: PgPool,
    pub sessions: Arc<SessionManager>,
    pub currency_repo: Arc<dyn CurrencyRepository>,
    pub price_repo: Arc<dyn PriceRepository>,
    pub alert_repo: Arc<dyn AlertRepository>,
    pub portfolio_repo: Arc<dyn PortfolioRepository>,
    pub portfolio: Arc<PortfolioService>,
}

// Ensure shared dependencies uphold Send/Sync for Axum state usage.
#[allow(dead_code)]
fn _assert_state_types_are_send_sync()
where
    AppConfig: Send + Sync + 'static,
    PgPool: Send + Sync + 'static,
    SessionManager: Send + Sync,
    dyn CurrencyRepository: Send + Sync,
    dyn PriceRepository: Send + Sync,
    dyn AlertRepository: Send + Sync,
    dyn PortfolioRepository: Send + Sync,
    PortfolioService: Send + Sync,
{
}

#[allow(dead_code)]
fn _assert_state_bounds() {
    fn assert_bounds<T: Clone + Send + Sync + 'static>() {}
    assert_bounds::<AppState>();
}
