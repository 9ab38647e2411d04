use anyhow::Result;
use module::EventProcessor;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{
    event::DaemonEvent, reminders::ReminderSupervisor, storage::record_storage::RecordStorage,
};

pub mod module;
pub mod presenter;

/// Represents the foreground loop of the daemon. Events from the background tasks are handled
/// here one at a time. The loop also owns the reminder generations, since a new day has to
/// restart them.
pub struct ProcessingModule<Processor, R: RecordStorage> {
    receiver: Receiver<DaemonEvent>,
    processor: Processor,
    reminders: ReminderSupervisor<R>,
    shutdown: CancellationToken,
}

impl<P: EventProcessor, R: RecordStorage> ProcessingModule<P, R> {
    pub fn new(
        receiver: Receiver<DaemonEvent>,
        processor: P,
        reminders: ReminderSupervisor<R>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            receiver,
            processor,
            reminders,
            shutdown,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        self.reminders.start();

        loop {
            // Reminder loops keep senders alive, so the channel alone never closes.
            let event = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = self.receiver.recv() => event,
            };
            let Some(event) = event else {
                break;
            };

            debug!("Processing event {:?}", event);
            if matches!(event, DaemonEvent::DayChanged(_)) {
                self.reminders.restart().await;
            }
            match self.processor.process_next(event.clone()).await {
                Ok(_) => {
                    info!("Processed event {:?}", event)
                }
                Err(e) => {
                    error!("Error processing event {:?}: {e:?}", event)
                }
            }
        }

        self.reminders.stop().await;
        let result = self.processor.finalize().await;
        self.receiver.close();
        result
    }
}
