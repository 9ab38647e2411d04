use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::NaiveDate;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::utils::clock::Clock;

use super::{
    event::DaemonEvent,
    storage::{record_storage::RecordStorage, tracker::Tracker},
};

/// Midnight is detected by polling. A minute of latency is irrelevant for daily habits.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Watches the calendar date and resets the trackers once it changes.
pub struct RolloverMonitor<R: RecordStorage> {
    tracker: Arc<Tracker<R>>,
    next: mpsc::Sender<DaemonEvent>,
    shutdown: CancellationToken,
    poll_interval: Duration,
    clock: Arc<dyn Clock>,
    today: NaiveDate,
}

impl<R: RecordStorage> RolloverMonitor<R> {
    pub fn new(
        tracker: Arc<Tracker<R>>,
        next: mpsc::Sender<DaemonEvent>,
        shutdown: CancellationToken,
        poll_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let today = clock.today();
        Self {
            tracker,
            next,
            shutdown,
            poll_interval,
            clock,
            today,
        }
    }

    async fn check(&mut self) -> Result<()> {
        let today = self.clock.today();
        if today == self.today {
            debug!("Still {today}");
            return Ok(());
        }

        info!("Date changed from {} to {today}", self.today);
        self.today = today;
        let record = self.tracker.reset_for(today).await;
        self.next.send(DaemonEvent::DayChanged(record)).await?;
        Ok(())
    }

    /// Executes the monitor event loop.
    pub async fn run(mut self) -> Result<()> {
        let mut poll_point = self.clock.instant();
        loop {
            poll_point += self.poll_interval;

            self.check()
                .await
                .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.clock.sleep_until(poll_point) => ()
            }
        }
    }
}
