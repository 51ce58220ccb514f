use std::collections::BTreeMap;

use async_trait::async_trait;
use domain::{Alert, Price, TriggeredAlert};

/// Whether `price` satisfies the alert's threshold rule.
///
/// Prices observed before the alert was created never trigger it, so users
/// can set conditions that are already true without firing instantly.
pub fn is_triggered(alert: &Alert, price: &Price) -> bool {
    if price.time < alert.created_time {
        return false;
    }
    if alert.above {
        price.value >= alert.threshold
    } else {
        price.value <= alert.threshold
    }
}

/// Groups triggered alerts by notification address for batch delivery.
/// BTreeMap keeps delivery order deterministic across runs.
pub fn group_by_address(alerts: Vec<TriggeredAlert>) -> BTreeMap<String, Vec<TriggeredAlert>> {
    let mut grouped: BTreeMap<String, Vec<TriggeredAlert>> = BTreeMap::new();
    for alert in alerts {
        grouped.entry(alert.address.clone()).or_default().push(alert);
    }
    grouped
}

/// Renders the plain-text notification body for one address.
///
/// Each crossing is one line of the form `1 Ethereum >= 2000 USD`.
pub fn render_message(alerts: &[TriggeredAlert]) -> String {
    let mut lines = Vec::with_capacity(alerts.len() + 2);
    lines.push("Prices have changed recently:".to_string());
    lines.push(String::new());
    for triggered in alerts {
        let operator = if triggered.alert.above { ">=" } else { "<=" };
        lines.push(format!(
            "1 {} {} {} {}",
            triggered.alert.from.name, operator, triggered.alert.threshold, triggered.alert.to.name,
        ));
    }
    lines.join("\n")
}

/// Delivery seam for triggered alerts. The matching engine depends only on
/// this contract, not on any transport.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn send(&self, address: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug)]
pub struct NotifyError(pub String);

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification delivery failed: {}", self.0)
    }
}

impl std::error::Error for NotifyError {}

/// Writes notifications to the log instead of delivering them. Used in
/// development and tests, and as the default when no transport is configured.
#[derive(Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl AlertNotifier for LoggingNotifier {
    async fn send(&self, address: &str, body: &str) -> Result<(), NotifyError> {
        tracing::info!(%address, body, "price alert notification");
        Ok(())
    }
}
