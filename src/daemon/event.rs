use crate::notification::Notification;

use super::storage::entities::DailyRecord;

/// Requests background tasks send to the foreground loop. Background tasks never render or
/// notify on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonEvent {
    /// The record changed and should be shown again.
    StateChanged(DailyRecord),
    /// A new day started. Carries the fresh record.
    DayChanged(DailyRecord),
    /// A reminder is due.
    Reminder(Notification),
}
