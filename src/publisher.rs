//! Background publication of scheduled events and sessions.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::clock::Clock;
use crate::db::Database;

/// Interval between publisher runs.
pub const PUBLISH_INTERVAL: Duration = Duration::from_secs(60);

/// Items moved to PUBLISHED by one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub events: u64,
    pub sessions: u64,
}

impl PublishReport {
    pub fn total(&self) -> u64 {
        self.events + self.sessions
    }
}

/// Publish everything whose `publish_at` is at or before `now`.
pub async fn publish_due(db: &Database, now: i64) -> Result<PublishReport, sqlx::Error> {
    let (events, sessions) = db.content().publish_due(now).await?;
    let report = PublishReport { events, sessions };

    if report.total() > 0 {
        info!(events, sessions, "Published scheduled content");
    }

    Ok(report)
}

/// Spawn a background task that runs the publisher every `period` until
/// `shutdown` is cancelled. The first run happens immediately.
pub fn spawn_publisher(
    db: Database,
    clock: Clock,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Publisher stopped");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = publish_due(&db, clock.now()).await {
                        error!(error = %e, "Failed to publish scheduled content");
                    }
                }
            }
        }
    })
}
