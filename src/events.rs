//! Live fan-out of accepted telemetry reports.
//!
//! Fire-and-forget: every current subscriber gets each published report once,
//! a subscriber created after a publish never sees it, and nobody is retried
//! or acknowledged. Callers needing durability poll `/latest_data` instead.

use crate::models::TelemetryReport;
use tokio::sync::broadcast;
use tracing::debug;

const CAP: usize = 256;

#[derive(Clone)]
pub struct TelemetryBus {
    tx: broadcast::Sender<TelemetryReport>,
}

impl TelemetryBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CAP);
        Self { tx }
    }

    /// Dropping the returned receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryReport> {
        self.tx.subscribe()
    }

    pub fn publish(&self, report: TelemetryReport) {
        match self.tx.send(report) {
            Ok(n) => debug!(receivers = n, "published"),
            Err(_) => debug!("no subscribers"),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for TelemetryBus {
    fn default() -> Self {
        Self::new()
    }
}
