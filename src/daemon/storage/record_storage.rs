use std::{future::Future, path::PathBuf};

use anyhow::{anyhow, Result};
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::debug;

use super::entities::DailyRecord;

/// Interface for abstracting storage of the daily record.
pub trait RecordStorage: Send + Sync + 'static {
    /// Reads the stored record and replaces it with whatever `change` returns, holding the record
    /// exclusively from the read until the write. Other processes can't slip in between.
    ///
    /// `change` is called exactly once. It gets `Ok(None)` when nothing is stored yet and the
    /// error when the record couldn't be read. Returning `None` leaves the stored record as is.
    fn update<F>(&self, change: F) -> impl Future<Output = Result<()>> + Send
    where
        F: FnOnce(Result<Option<DailyRecord>>) -> Option<DailyRecord> + Send;
}

/// The main realization of [RecordStorage]. Keeps the record as a single JSON object.
///
/// The daemon and the cli work on the same file, every update holds an exclusive lock on it.
pub struct RecordStorageImpl {
    path: PathBuf,
}

impl RecordStorageImpl {
    pub fn new(path: PathBuf) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Ok(Self { path })
    }

    async fn open_locked(&self) -> Result<File> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await?;
        file.lock_exclusive()?;
        Ok(file)
    }

    async fn read_from(file: &mut File) -> Result<Option<DailyRecord>> {
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;
        debug!("Read record {contents}");
        // The file is created empty by the first update.
        if contents.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn overwrite(file: &mut File, record: &DailyRecord) -> Result<()> {
        let contents = serde_json::to_vec(record)?;
        file.set_len(0).await?;
        file.rewind().await?;
        file.write_all(&contents).await?;
        file.flush().await?;
        Ok(())
    }
}

impl RecordStorage for RecordStorageImpl {
    async fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(Result<Option<DailyRecord>>) -> Option<DailyRecord> + Send,
    {
        let mut file = match self.open_locked().await {
            Ok(file) => file,
            Err(e) => {
                change(Err(anyhow!("Couldn't open {:?}: {e}", self.path)));
                return Err(e);
            }
        };

        let stored = Self::read_from(&mut file).await;
        let result = match change(stored) {
            Some(record) => Self::overwrite(&mut file, &record).await,
            None => Ok(()),
        };
        file.unlock_async().await?;
        result
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };

    use anyhow::{anyhow, bail, Result};

    use super::{DailyRecord, RecordStorage};

    /// Storage kept in memory. Reads and writes can be switched to fail.
    #[derive(Default)]
    pub struct MemoryStorage {
        record: Mutex<Option<DailyRecord>>,
        pub fail_reads: AtomicBool,
        pub fail_writes: AtomicBool,
    }

    impl MemoryStorage {
        pub fn with_record(record: DailyRecord) -> Self {
            Self {
                record: Mutex::new(Some(record)),
                ..Default::default()
            }
        }

        pub fn stored(&self) -> Option<DailyRecord> {
            self.record.lock().unwrap().clone()
        }

        pub fn replace(&self, record: DailyRecord) {
            *self.record.lock().unwrap() = Some(record);
        }
    }

    impl RecordStorage for MemoryStorage {
        async fn update<F>(&self, change: F) -> Result<()>
        where
            F: FnOnce(Result<Option<DailyRecord>>) -> Option<DailyRecord> + Send,
        {
            let mut stored = self.record.lock().unwrap();
            let read = if self.fail_reads.load(Ordering::SeqCst) {
                Err(anyhow!("read failure"))
            } else {
                Ok(stored.clone())
            };

            if let Some(record) = change(read) {
                if self.fail_writes.load(Ordering::SeqCst) {
                    bail!("write failure");
                }
                *stored = Some(record);
            }
            Ok(())
        }
    }
}
