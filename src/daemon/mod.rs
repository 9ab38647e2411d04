use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use processing::{presenter::Presenter, ProcessingModule};
use reminders::{schedule::ReminderSpec, ReminderSupervisor};
use rollover::{RolloverMonitor, DEFAULT_POLL_INTERVAL};
use storage::{
    record_storage::{RecordStorage, RecordStorageImpl},
    tracker::Tracker,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::{
    notification::{default_notifier, Notifier},
    utils::{
        clock::{Clock, DefaultClock},
        dir::AppPaths,
        event_log::EventLog,
    },
};

use event::DaemonEvent;

pub mod args;
pub mod event;
pub mod processing;
pub mod reminders;
pub mod rollover;
pub mod shutdown;
pub mod storage;

/// Represents the starting point for the daemon
pub async fn start_daemon(dir: PathBuf) -> Result<()> {
    let paths = AppPaths::new(dir);
    std::env::set_current_dir("/")?;

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let event_log = EventLog::new(paths.event_log(), clock.clone());
    let storage = RecordStorageImpl::new(paths.record_file())?;
    let tracker = Arc::new(Tracker::open(storage, event_log.clone(), clock.clone()).await);

    let (sender, receiver) = mpsc::channel::<DaemonEvent>(16);
    let shutdown_token = CancellationToken::new();

    let monitor = create_monitor(tracker.clone(), sender.clone(), &shutdown_token, clock.clone());
    let processor = create_processor(
        tracker.clone(),
        sender.clone(),
        receiver,
        default_notifier(),
        event_log.clone(),
        &shutdown_token,
        clock,
    );

    event_log.log("Daemon started").await;
    sender
        .send(DaemonEvent::StateChanged(tracker.snapshot().await))
        .await?;
    drop(sender);

    let (_, monitor_result, processing_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        monitor.run(),
        processor.run(),
    );

    if let Err(monitor_result) = monitor_result {
        error!("Rollover monitor got an error {:?}", monitor_result);
    }

    if let Err(processing_result) = processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    event_log.log("Daemon stopped").await;
    Ok(())
}

fn create_monitor<R: RecordStorage>(
    tracker: Arc<Tracker<R>>,
    sender: mpsc::Sender<DaemonEvent>,
    shutdown_token: &CancellationToken,
    clock: Arc<dyn Clock>,
) -> RolloverMonitor<R> {
    RolloverMonitor::new(
        tracker,
        sender,
        shutdown_token.clone(),
        DEFAULT_POLL_INTERVAL,
        clock,
    )
}

fn create_processor<R: RecordStorage, N: Notifier>(
    tracker: Arc<Tracker<R>>,
    sender: mpsc::Sender<DaemonEvent>,
    receiver: mpsc::Receiver<DaemonEvent>,
    notifier: N,
    event_log: EventLog,
    shutdown_token: &CancellationToken,
    clock: Arc<dyn Clock>,
) -> ProcessingModule<Presenter<N>, R> {
    let reminders = ReminderSupervisor::new(
        ReminderSpec::defaults(),
        tracker,
        sender,
        clock,
        shutdown_token.clone(),
    );
    ProcessingModule::new(
        receiver,
        Presenter::new(notifier, event_log),
        reminders,
        shutdown_token.clone(),
    )
}

#[cfg(test)]
mod daemon_tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use mockall::predicate::eq;
    use tempfile::{tempdir, TempDir};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{
            create_monitor, create_processor,
            event::DaemonEvent,
            reminders::schedule::ReminderSpec,
            storage::{
                entities::{Counter, DailyRecord},
                record_storage::RecordStorageImpl,
                tracker::Tracker,
            },
        },
        notification::MockNotifier,
        utils::{clock::TestClock, event_log::EventLog, logging::TEST_LOGGING},
    };

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    struct Fixture {
        dir: TempDir,
        clock: Arc<TestClock>,
        event_log: EventLog,
        tracker: Arc<Tracker<RecordStorageImpl>>,
    }

    async fn fixture(start: NaiveDateTime) -> Result<Fixture> {
        let dir = tempdir()?;
        let clock = Arc::new(TestClock::starting_at(start));
        let event_log = EventLog::new(dir.path().join("tracker_log.txt"), clock.clone());
        let storage = RecordStorageImpl::new(dir.path().join("tracker_data.json"))?;
        let tracker = Arc::new(Tracker::open(storage, event_log.clone(), clock.clone()).await);
        Ok(Fixture {
            dir,
            clock,
            event_log,
            tracker,
        })
    }

    /// Runs the daemon components for `duration` of virtual time.
    async fn run_daemon_for(
        fixture: &Fixture,
        duration: Duration,
        notifier: MockNotifier,
    ) -> Result<()> {
        let shutdown_token = CancellationToken::new();
        let (sender, receiver) = mpsc::channel::<DaemonEvent>(16);
        let monitor = create_monitor(
            fixture.tracker.clone(),
            sender.clone(),
            &shutdown_token,
            fixture.clock.clone(),
        );
        let processor = create_processor(
            fixture.tracker.clone(),
            sender,
            receiver,
            notifier,
            fixture.event_log.clone(),
            &shutdown_token,
            fixture.clock.clone(),
        );

        let (_, monitor_result, processing_result) = tokio::join!(
            async {
                tokio::time::sleep(duration).await;
                shutdown_token.cancel()
            },
            monitor.run(),
            processor.run(),
        );
        monitor_result?;
        processing_result?;
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn smoke_test_reminders_during_the_day() -> Result<()> {
        *TEST_LOGGING;
        let fixture = fixture(at(1, 10, 0)).await?;
        fixture.tracker.increment(Counter::WaterBottles).await;
        fixture.tracker.increment(Counter::WaterBottles).await;

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .with(eq(ReminderSpec::water().notification(2)))
            .times(2)
            .returning(|_| Ok(()));
        notifier
            .expect_notify()
            .with(eq(ReminderSpec::sunscreen().notification(0)))
            .times(1)
            .returning(|_| Ok(()));

        // 10:30 and 11:45 for water, 11:45 for sunscreen.
        run_daemon_for(&fixture, Duration::from_secs(2 * 60 * 60), notifier).await?;

        assert_eq!(fixture.tracker.snapshot().await.water_bottles, 2);
        let history = std::fs::read_to_string(fixture.dir.path().join("tracker_log.txt"))?;
        assert_eq!(history.matches("Reminder shown.").count(), 3);
        Ok(())
    }

    /// Without the restart at midnight the water loop of the previous day would fire at 00:15.
    #[tokio::test(start_paused = true)]
    async fn smoke_test_new_day() -> Result<()> {
        let fixture = fixture(at(1, 23, 58)).await?;
        fixture.tracker.increment(Counter::WaterBottles).await;
        fixture.tracker.set_creatine(true).await;

        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();

        run_daemon_for(&fixture, Duration::from_secs(60 * 60), notifier).await?;

        let fresh = DailyRecord::new_for(at(2, 0, 0).date());
        assert_eq!(fixture.tracker.snapshot().await, fresh);
        let stored = std::fs::read_to_string(fixture.dir.path().join("tracker_data.json"))?;
        assert_eq!(serde_json::from_str::<DailyRecord>(&stored)?, fresh);
        let history = std::fs::read_to_string(fixture.dir.path().join("tracker_log.txt"))?;
        assert!(history.contains("Date changed to 2024-06-02. Trackers reset."));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn smoke_test_quiet_once_goals_are_met() -> Result<()> {
        let fixture = fixture(at(1, 9, 0)).await?;
        for counter in Counter::ALL {
            for _ in 0..counter.goal() {
                fixture.tracker.increment(counter).await;
            }
        }

        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();

        run_daemon_for(&fixture, Duration::from_secs(8 * 60 * 60), notifier).await?;

        let record = fixture.tracker.snapshot().await;
        assert!(record.goal_reached(Counter::WaterBottles));
        assert!(record.goal_reached(Counter::SunscreenApplications));
        Ok(())
    }
}
