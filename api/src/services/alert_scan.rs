use std::sync::Arc;
use std::time::Duration;

use alert_engine::{group_by_address, is_triggered, render_message, AlertNotifier};
use anyhow::Context;
use domain::TriggeredAlert;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::repositories::AlertRepository;

/// Periodic alert scan: finds satisfied alerts, notifies their owners in
/// per-address batches, and appends `sent` versions.
///
/// The scan fails closed: a storage or delivery error aborts the pass, and
/// alerts whose owner was not successfully notified stay unsent for the next
/// run. Marking happens right after each delivery so a mid-pass failure
/// cannot re-notify addresses that already got their batch.
pub struct AlertScanner<N>
where
    N: AlertNotifier + 'static,
{
    alerts: Arc<dyn AlertRepository>,
    notifier: Arc<N>,
}

impl<N> AlertScanner<N>
where
    N: AlertNotifier + 'static,
{
    pub fn new(alerts: Arc<dyn AlertRepository>, notifier: Arc<N>) -> Self {
        Self { alerts, notifier }
    }

    /// Runs passes forever, strictly sequentially: the next pass starts only
    /// after the previous one finished.
    pub fn spawn(self: Arc<Self>, interval: Duration) {
        tokio::spawn(async move {
            loop {
                match self.run_once().await {
                    Ok(notified) if notified > 0 => {
                        info!(notified, "alert scan pass complete");
                    }
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, "alert scan pass failed"),
                }
                sleep(interval).await;
            }
        });
    }

    /// One scan pass. Returns how many alerts were notified and marked sent.
    pub async fn run_once(&self) -> anyhow::Result<usize> {
        let candidates = self.alerts.unsent_candidates().await?;

        let triggered: Vec<TriggeredAlert> = candidates
            .into_iter()
            .filter(|candidate| is_triggered(&candidate.alert, &candidate.price))
            .map(|candidate| TriggeredAlert {
                price: candidate.price.value,
                price_time: candidate.price.time,
                alert: candidate.alert,
                address: candidate.address,
            })
            .collect();

        if triggered.is_empty() {
            return Ok(0);
        }

        let mut notified = 0;
        for (address, batch) in group_by_address(triggered) {
            let body = render_message(&batch);
            self.notifier
                .send(&address, &body)
                .await
                .with_context(|| format!("failed to notify {address}"))?;

            let alerts: Vec<_> = batch.into_iter().map(|t| t.alert).collect();
            self.alerts.mark_sent(&alerts).await?;
            notified += alerts.len();
        }

        metrics::counter!("alerts_notified_total").increment(notified as u64);
        Ok(notified)
    }
}
