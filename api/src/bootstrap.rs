use std::sync::Arc;

use alert_engine::LoggingNotifier;
use anyhow::Result;
use auth::SessionManager;
use chrono::Duration as ChronoDuration;
use sqlx::postgres::PgPoolOptions;

use crate::{
    config::AppConfig,
    repositories::{
        AlertRepository, CurrencyRepository, PortfolioRepository, PostgresAlertRepository,
        PostgresCurrencyRepository, PostgresPortfolioRepository, PostgresPriceRepository,
        PriceRepository,
    },
    services::{AlertScanner, PortfolioService},
    state::AppState,
};

pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_acquire_timeout)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../migrations").run(&pool).await?;

    let sessions = Arc::new(SessionManager::new(
        pool.clone(),
        chrono_duration(config.session_ttl),
    ));

    let currency_repo: Arc<dyn CurrencyRepository> =
        Arc::new(PostgresCurrencyRepository::new(pool.clone()));
    let price_repo: Arc<dyn PriceRepository> = Arc::new(PostgresPriceRepository::new(
        pool.clone(),
        config.price_window_days,
    ));
    let alert_repo: Arc<dyn AlertRepository> = Arc::new(PostgresAlertRepository::new(pool.clone()));
    let portfolio_repo: Arc<dyn PortfolioRepository> =
        Arc::new(PostgresPortfolioRepository::new(pool.clone()));

    let portfolio = Arc::new(PortfolioService::new(
        portfolio_repo.clone(),
        price_repo.clone(),
        currency_repo.clone(),
    ));

    if config.enable_alert_worker {
        let scanner = Arc::new(AlertScanner::new(
            alert_repo.clone(),
            Arc::new(LoggingNotifier),
        ));
        scanner.spawn(config.scan_interval);
    }

    Ok(AppState {
        config: config.clone(),
        db: pool,
        sessions,
        currency_repo,
        price_repo,
        alert_repo,
        portfolio_repo,
        portfolio,
    })
}

fn chrono_duration(value: std::time::Duration) -> ChronoDuration {
    ChronoDuration::from_std(value).unwrap_or_else(|_| ChronoDuration::seconds(1))
}
