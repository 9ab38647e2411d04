use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    daemon::{
        event::DaemonEvent,
        storage::{record_storage::RecordStorage, tracker::Tracker},
    },
    utils::{clock::Clock, time::positive_duration},
};

use super::schedule::ReminderSpec;

/// Wait used instead of a non-positive sleep, which only happens when the wall clock jumps.
pub const CLOCK_SKEW_BACKOFF: Duration = Duration::from_secs(60);

/// A single reminder, sleeping from one grid point to the next until cancelled.
pub struct ReminderLoop<R: RecordStorage> {
    spec: ReminderSpec,
    tracker: Arc<Tracker<R>>,
    next: mpsc::Sender<DaemonEvent>,
    cancel: CancellationToken,
    clock: Arc<dyn Clock>,
}

impl<R: RecordStorage> ReminderLoop<R> {
    pub fn new(
        spec: ReminderSpec,
        tracker: Arc<Tracker<R>>,
        next: mpsc::Sender<DaemonEvent>,
        cancel: CancellationToken,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            spec,
            tracker,
            next,
            cancel,
            clock,
        }
    }

    /// Executes the reminder event loop.
    pub async fn run(self) {
        loop {
            let fire_at = self.spec.next_fire(self.clock.now());
            // The wall clock may move between the two readings.
            let now = self.clock.now();
            let wait = positive_duration(fire_at - now);
            let deadline = match wait {
                Some(wait) => {
                    debug!("Next {} reminder at {fire_at}", self.spec.name());
                    self.clock.instant() + wait
                }
                None => {
                    warn!(
                        "Computed {} reminder time {fire_at} isn't after {now}, backing off",
                        self.spec.name()
                    );
                    self.clock.instant() + CLOCK_SKEW_BACKOFF
                }
            };

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("{} reminder cancelled", self.spec.name());
                    return;
                }
                _ = self.clock.sleep_until(deadline) => ()
            }

            if wait.is_none() {
                continue;
            }

            if let Err(e) = self.fire().await {
                // Only happens when the foreground loop is gone, nobody is left to notify.
                error!("Stopping {} reminder: {e:?}", self.spec.name());
                return;
            }
        }
    }

    async fn fire(&self) -> Result<()> {
        let current = self.tracker.snapshot().await.count(self.spec.counter);
        if current >= self.spec.goal {
            debug!(
                "{} goal already reached ({current}/{}), skipping reminder",
                self.spec.name(),
                self.spec.goal
            );
            return Ok(());
        }

        info!("Requesting {} reminder at {current}/{}", self.spec.name(), self.spec.goal);
        self.next
            .send(DaemonEvent::Reminder(self.spec.notification(current)))
            .await?;
        Ok(())
    }
}
