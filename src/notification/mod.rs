//! Contains logic for showing reminders to the user. [default_notifier] is the main artifact of
//! this module, a chain that starts with the desktop's own notifications and falls back to an
//! auto-closing pop-up and finally to the console.

pub mod command;
pub mod console;

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::warn;

use command::CommandNotifier;
use console::ConsoleNotifier;

/// How long a notification stays on screen unless the platform decides otherwise.
pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub timeout: Duration,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            timeout: DEFAULT_NOTIFICATION_TIMEOUT,
        }
    }
}

/// Intended to serve as a contract every way of reaching the user must implement.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, notification: Notification) -> Result<()>;
}

/// Tries notifiers in order until one of them succeeds.
pub struct NotifierChain {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierChain {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

#[async_trait]
impl Notifier for NotifierChain {
    async fn notify(&self, notification: Notification) -> Result<()> {
        for (index, notifier) in self.notifiers.iter().enumerate() {
            match notifier.notify(notification.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!("Notifier #{index} failed to show {:?}: {e:?}", notification.title),
            }
        }
        Err(anyhow!("No notifier could show {:?}", notification.title))
    }
}

/// Serves as a cross-platform notifier.
pub fn default_notifier() -> NotifierChain {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
    if let Some(system) = CommandNotifier::system() {
        notifiers.push(Box::new(system));
    }
    if let Some(popup) = CommandNotifier::popup() {
        notifiers.push(Box::new(popup));
    }
    notifiers.push(Box::new(ConsoleNotifier));
    NotifierChain::new(notifiers)
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use mockall::predicate::eq;

    use super::{MockNotifier, Notification, Notifier, NotifierChain};

    #[tokio::test]
    async fn test_chain_falls_through_to_next_notifier() -> Result<()> {
        let notification = Notification::new("Water reminder", "Progress: 1/6");

        let mut failing = MockNotifier::new();
        failing
            .expect_notify()
            .with(eq(notification.clone()))
            .times(1)
            .returning(|_| Err(anyhow!("notify-send missing")));
        let mut working = MockNotifier::new();
        working.expect_notify().times(1).returning(|_| Ok(()));
        let mut unused = MockNotifier::new();
        unused.expect_notify().never();

        let chain = NotifierChain::new(vec![
            Box::new(failing),
            Box::new(working),
            Box::new(unused),
        ]);

        chain.notify(notification).await
    }

    #[tokio::test]
    async fn test_chain_fails_when_every_notifier_fails() {
        let mut failing = MockNotifier::new();
        failing
            .expect_notify()
            .times(1)
            .returning(|_| Err(anyhow!("nope")));

        let chain = NotifierChain::new(vec![Box::new(failing)]);

        assert!(chain
            .notify(Notification::new("Sunscreen reminder", "Progress: 0/3"))
            .await
            .is_err());
    }
}
