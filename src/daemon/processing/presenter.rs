use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::{
    daemon::{event::DaemonEvent, storage::entities::DailyRecord},
    notification::{Notification, Notifier},
    utils::event_log::EventLog,
};

use super::module::EventProcessor;

/// Foreground presentation of the daemon. Keeps the last rendered record and shows reminders.
///
/// Reminders are delivered on their own tasks. A pop-up fallback may stay open for the whole
/// notification timeout and the foreground loop must keep serving events meanwhile.
pub struct Presenter<N: Notifier> {
    notifier: Arc<N>,
    event_log: EventLog,
    deliveries: JoinSet<()>,
    current: Option<DailyRecord>,
}

impl<N: Notifier> Presenter<N> {
    pub fn new(notifier: N, event_log: EventLog) -> Self {
        Self {
            notifier: Arc::new(notifier),
            event_log,
            deliveries: JoinSet::new(),
            current: None,
        }
    }

    /// The record that was rendered last.
    pub fn current(&self) -> Option<&DailyRecord> {
        self.current.as_ref()
    }

    fn render(&mut self, record: DailyRecord) {
        info!("Today: {record}");
        self.current = Some(record);
    }

    fn deliver(&mut self, notification: Notification) {
        // Reap deliveries that are already done.
        while self.deliveries.try_join_next().is_some() {}

        let notifier = self.notifier.clone();
        let event_log = self.event_log.clone();
        self.deliveries.spawn(async move {
            let summary = format!("{}: {}", notification.title, notification.message);
            match notifier.notify(notification).await {
                Ok(()) => event_log.log(format!("Reminder shown. {summary}")).await,
                Err(e) => {
                    error!("Couldn't show reminder {summary:?} {e:?}");
                    event_log
                        .log(format!("Failed to show reminder. {summary} ({e})"))
                        .await
                }
            }
        });
    }
}

impl<N: Notifier> EventProcessor for Presenter<N> {
    async fn process_next(&mut self, event: DaemonEvent) -> Result<()> {
        match event {
            DaemonEvent::StateChanged(record) => self.render(record),
            DaemonEvent::DayChanged(record) => {
                info!("A new day started, {}", record.date);
                self.render(record)
            }
            DaemonEvent::Reminder(notification) => self.deliver(notification),
        }
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        while let Some(result) = self.deliveries.join_next().await {
            if let Err(e) = result {
                error!("Reminder delivery failed {e:?}");
            }
        }
        Ok(())
    }
}
