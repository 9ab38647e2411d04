//! Reminders run as independent loops, one per [schedule::ReminderSpec]. The loops of one
//! generation share a cancellation token, and [ReminderSupervisor] replaces the whole generation
//! when a new day starts.

pub mod reminder_loop;
pub mod schedule;

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use reminder_loop::ReminderLoop;
use schedule::ReminderSpec;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::utils::clock::Clock;

use super::{
    event::DaemonEvent,
    storage::{record_storage::RecordStorage, tracker::Tracker},
};

/// How long a cancelled loop gets to finish before it is aborted.
const STOP_GRACE: Duration = Duration::from_secs(5);

pub struct ReminderSupervisor<R: RecordStorage> {
    specs: Vec<ReminderSpec>,
    tracker: Arc<Tracker<R>>,
    next: mpsc::Sender<DaemonEvent>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    generation: CancellationToken,
    generation_id: u64,
    handles: Vec<JoinHandle<()>>,
}

impl<R: RecordStorage> ReminderSupervisor<R> {
    pub fn new(
        specs: Vec<ReminderSpec>,
        tracker: Arc<Tracker<R>>,
        next: mpsc::Sender<DaemonEvent>,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            specs,
            tracker,
            next,
            clock,
            generation: shutdown.child_token(),
            shutdown,
            generation_id: 0,
            handles: Vec::new(),
        }
    }

    /// Spawns one loop per spec. Does nothing if the current generation is already running.
    pub fn start(&mut self) {
        if !self.handles.is_empty() {
            warn!("Reminder generation {} is already running", self.generation_id);
            return;
        }

        info!("Starting reminder generation {}", self.generation_id);
        for spec in &self.specs {
            let span = info_span!("reminder", kind = spec.name(), generation = self.generation_id);
            let reminder = ReminderLoop::new(
                spec.clone(),
                self.tracker.clone(),
                self.next.clone(),
                self.generation.clone(),
                self.clock.clone(),
            );
            self.handles.push(tokio::spawn(reminder.run().instrument(span)));
        }
    }

    /// Cancels the current generation and waits for its loops to exit. Loops that don't exit in
    /// time are aborted.
    pub async fn stop(&mut self) {
        self.generation.cancel();

        let generation_id = self.generation_id;
        let stopping = self.handles.drain(..).map(|mut handle| async move {
            match tokio::time::timeout(STOP_GRACE, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Reminder loop of generation {generation_id} failed {e:?}"),
                Err(_) => {
                    warn!("Reminder loop of generation {generation_id} didn't stop in time, aborting");
                    handle.abort();
                }
            }
        });
        join_all(stopping).await;
    }

    /// Replaces the running generation with a fresh one, so the schedules are computed against
    /// the new day. The old generation is fully stopped first, two generations never overlap.
    pub async fn restart(&mut self) {
        self.stop().await;
        self.generation = self.shutdown.child_token();
        self.generation_id += 1;
        self.start();
    }

    pub fn active_loops(&self) -> usize {
        self.handles.iter().filter(|v| !v.is_finished()).count()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use tempfile::tempdir;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{
            event::DaemonEvent,
            storage::{
                entities::DailyRecord, record_storage::testing::MemoryStorage, tracker::Tracker,
            },
        },
        utils::{clock::TestClock, event_log::EventLog, logging::TEST_LOGGING},
    };

    use super::{schedule::ReminderSpec, ReminderSupervisor};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    async fn drain_for(
        receiver: &mut mpsc::Receiver<DaemonEvent>,
        duration: Duration,
    ) -> Vec<DaemonEvent> {
        let mut events = vec![];
        let deadline = tokio::time::Instant::now() + duration;
        while let Ok(Some(event)) = tokio::time::timeout_at(deadline, receiver.recv()).await {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_never_doubles_reminders() {
        *TEST_LOGGING;
        let dir = tempdir().unwrap();
        let clock = Arc::new(TestClock::starting_at(at(10, 0)));
        let log = EventLog::new(dir.path().join("tracker_log.txt"), clock.clone());
        let tracker = Arc::new(
            Tracker::open(
                MemoryStorage::with_record(DailyRecord::new_for(at(10, 0).date())),
                log,
                clock.clone(),
            )
            .await,
        );
        let (sender, mut receiver) = mpsc::channel(16);
        let shutdown = CancellationToken::new();

        let mut supervisor = ReminderSupervisor::new(
            ReminderSpec::defaults(),
            tracker,
            sender,
            clock,
            shutdown.clone(),
        );
        supervisor.start();
        supervisor.start();
        assert_eq!(supervisor.active_loops(), 2);

        supervisor.restart().await;
        supervisor.restart().await;
        assert_eq!(supervisor.active_loops(), 2);

        // Water fires at 10:30, sunscreen not before 11:45.
        let events = drain_for(&mut receiver, Duration::from_secs(40 * 60)).await;
        assert_eq!(
            events,
            vec![DaemonEvent::Reminder(ReminderSpec::water().notification(0))]
        );

        supervisor.stop().await;
        assert_eq!(supervisor.active_loops(), 0);
        assert!(drain_for(&mut receiver, Duration::from_secs(3 * 60 * 60))
            .await
            .is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_every_generation() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(TestClock::starting_at(at(10, 0)));
        let log = EventLog::new(dir.path().join("tracker_log.txt"), clock.clone());
        let tracker =
            Arc::new(Tracker::open(MemoryStorage::default(), log, clock.clone()).await);
        let (sender, _receiver) = mpsc::channel(16);
        let shutdown = CancellationToken::new();

        let mut supervisor =
            ReminderSupervisor::new(ReminderSpec::defaults(), tracker, sender, clock, shutdown.clone());
        supervisor.start();
        supervisor.restart().await;

        shutdown.cancel();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(supervisor.active_loops(), 0);
    }
}
