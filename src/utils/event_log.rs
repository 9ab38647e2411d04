use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::{info, warn};

use super::{clock::Clock, time::format_timestamp};

/// Human readable history of what happened to the trackers. Unlike the diagnostic logs this file
/// is meant for the user, one `[timestamp] message` line per event.
///
/// Writing is best-effort. A failure is reported through tracing and otherwise ignored.
#[derive(Clone)]
pub struct EventLog {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl EventLog {
    pub fn new(path: PathBuf, clock: Arc<dyn Clock>) -> Self {
        Self { path, clock }
    }

    pub async fn log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!("{message}");
        if let Err(e) = self.append(message).await {
            warn!("Failed to write to event log {:?}: {e:?}", self.path);
        }
    }

    async fn append(&self, message: &str) -> Result<()> {
        let line = format!("[{}] {message}\n", format_timestamp(self.clock.now()));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::utils::clock::TestClock;

    use super::EventLog;

    #[tokio::test(start_paused = true)]
    async fn test_event_log_appends_lines() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("tracker_log.txt");
        let start = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        let log = EventLog::new(path.clone(), Arc::new(TestClock::starting_at(start)));

        log.log("Creatine taken").await;
        log.log("Water bottle added. Total: 1/6").await;

        let contents = tokio::fs::read_to_string(&path).await?;
        assert_eq!(
            contents,
            "[2024-06-01 09:15:00] Creatine taken\n\
             [2024-06-01 09:15:00] Water bottle added. Total: 1/6\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_event_log_failure_is_swallowed() -> Result<()> {
        let dir = tempdir()?;
        // A directory can't be opened for appending.
        let log = EventLog::new(
            dir.path().to_path_buf(),
            Arc::new(crate::utils::clock::DefaultClock),
        );

        log.log("ignored").await;
        Ok(())
    }
}
