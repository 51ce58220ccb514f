//! One-shot alert scan pass: find satisfied alerts, notify their owners, and
//! mark them sent. Scheduled externally; exits non-zero on failure so the
//! whole pass is retried next time.

use std::sync::Arc;

use alert_engine::LoggingNotifier;
use api::{bootstrap::build_state, config::AppConfig, services::AlertScanner, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing()?;

    let config = AppConfig::from_env()?;
    let state = build_state(&config).await?;

    let scanner = AlertScanner::new(state.alert_repo.clone(), Arc::new(LoggingNotifier));
    let notified = scanner.run_once().await?;
    tracing::info!(notified, "alert scan finished");
    Ok(())
}
