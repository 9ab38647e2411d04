use ansi_term::Colour;
use anyhow::Result;
use async_trait::async_trait;

use super::{Notification, Notifier};

/// Last resort. Prints the reminder to stdout, which is only seen when the daemon runs in a
/// console, but the event log still records it.
pub struct ConsoleNotifier;

pub fn render_banner(notification: &Notification) -> String {
    format!(
        "{} {}",
        Colour::Yellow.bold().paint(format!("[{}]", notification.title)),
        notification.message
    )
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        println!("{}", render_banner(&notification));
        Ok(())
    }
}
