use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::coordinator::AgentCoordinator;

/// Background task that periodically removes expired workflows.
pub struct Janitor {
    coordinator: Arc<AgentCoordinator>,
    interval: Duration,
    retention: Duration,
    cancel: CancellationToken,
}

impl Janitor {
    /// Interval and retention come from the coordinator's config.
    pub fn new(coordinator: Arc<AgentCoordinator>, cancel: CancellationToken) -> Self {
        let interval = coordinator.config().cleanup_interval();
        let retention = coordinator.config().retention();
        Self {
            coordinator,
            interval,
            retention,
            cancel,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Sweep every interval until cancelled. Spawned as a tokio task.
    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            retention_secs = self.retention.as_secs(),
            "Workflow janitor started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    let removed = self.coordinator.cleanup(self.retention).await;
                    debug!(removed, "Janitor sweep finished");
                }
                _ = self.cancel.cancelled() => {
                    info!("Workflow janitor shutting down");
                    break;
                }
            }
        }
    }
}
