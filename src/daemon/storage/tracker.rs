use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::utils::{clock::Clock, event_log::EventLog};

use super::{
    entities::{Counter, DailyRecord},
    record_storage::RecordStorage,
};

/// Outcome of [Tracker::increment].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Increment {
    pub counter: Counter,
    pub applied: bool,
    pub record: DailyRecord,
}

impl Increment {
    pub fn value(&self) -> u32 {
        self.record.count(self.counter)
    }

    /// True only for the increment that actually reached the goal.
    pub fn reached_goal(&self) -> bool {
        self.applied && self.record.goal_reached(self.counter)
    }
}

struct TrackerState {
    record: DailyRecord,
    // Set while the last save failed. The file is behind memory then and must not be adopted.
    unsaved: bool,
}

/// What happened during one [Tracker::transact] besides the change itself.
struct Transaction<T> {
    value: T,
    /// Date of the stale record that got replaced.
    replaced: Option<NaiveDate>,
}

/// Owner of the in-memory [DailyRecord]. Every read and mutation, including the midnight reset,
/// runs under one lock, so a reset can't interleave with an increment.
///
/// Each operation is a single read-modify-write of the stored record under its exclusive lock,
/// which lets a cli process and the daemon work on the same record without losing updates.
pub struct Tracker<R: RecordStorage> {
    storage: R,
    state: Mutex<TrackerState>,
    event_log: EventLog,
    clock: Arc<dyn Clock>,
}

impl<R: RecordStorage> Tracker<R> {
    /// Loads the record for today. Missing, unreadable and stale records are replaced by a fresh
    /// one, which is persisted right away.
    pub async fn open(storage: R, event_log: EventLog, clock: Arc<dyn Clock>) -> Self {
        let tracker = Self {
            storage,
            state: Mutex::new(TrackerState {
                record: DailyRecord::new_for(clock.today()),
                unsaved: false,
            }),
            event_log,
            clock,
        };
        tracker.snapshot().await;
        tracker
    }

    /// Current record for today.
    pub async fn snapshot(&self) -> DailyRecord {
        let mut state = self.state.lock().await;
        self.transact_today(&mut state, |_| ((), false)).await;
        state.record.clone()
    }

    /// Adds one to `counter` unless its goal is already reached.
    pub async fn increment(&self, counter: Counter) -> Increment {
        let mut state = self.state.lock().await;
        let applied = self
            .transact_today(&mut state, |record| {
                let applied = record.increment(counter, counter.goal());
                (applied, applied)
            })
            .await;

        if applied {
            let total = state.record.count(counter);
            let message = match counter {
                Counter::WaterBottles => {
                    format!("Water bottle added. Total: {total}/{}", counter.goal())
                }
                Counter::SunscreenApplications => {
                    format!("Sunscreen applied. Total: {total}/{}", counter.goal())
                }
            };
            self.event_log.log(message).await;
        }

        Increment {
            counter,
            applied,
            record: state.record.clone(),
        }
    }

    pub async fn set_creatine(&self, taken: bool) -> DailyRecord {
        let mut state = self.state.lock().await;
        self.transact_today(&mut state, |record| {
            record.creatine_taken = taken;
            ((), true)
        })
        .await;
        self.event_log
            .log(if taken {
                "Creatine taken"
            } else {
                "Creatine marked as not taken"
            })
            .await;

        state.record.clone()
    }

    /// Used by the rollover monitor once it notices that the date changed. Replaces the record
    /// with a fresh one for `today`, unless somebody already stored one for that day.
    pub async fn reset_for(&self, today: NaiveDate) -> DailyRecord {
        let mut state = self.state.lock().await;
        let transaction = self.transact(&mut state, today, |_| ((), false)).await;
        if transaction.replaced.is_some() {
            self.event_log
                .log(format!("Date changed to {today}. Trackers reset."))
                .await;
        }
        state.record.clone()
    }

    async fn transact_today<T: Send + Default>(
        &self,
        state: &mut TrackerState,
        change: impl FnOnce(&mut DailyRecord) -> (T, bool) + Send,
    ) -> T {
        let today = self.clock.today();
        let transaction = self.transact(state, today, change).await;
        if let Some(previous) = transaction.replaced {
            self.event_log
                .log(format!(
                    "New day detected. Resetting trackers from {previous} to {today}"
                ))
                .await;
        }
        transaction.value
    }

    /// Adopts the stored record unless memory is ahead of it, replaces a stale record and applies
    /// `change`, which reports whether it modified the record. The stored record stays locked for
    /// the whole time and is written back when anything changed.
    async fn transact<T: Send + Default>(
        &self,
        state: &mut TrackerState,
        today: NaiveDate,
        change: impl FnOnce(&mut DailyRecord) -> (T, bool) + Send,
    ) -> Transaction<T> {
        let mut outcome = None;
        let mut read_error = None;
        let mut wants_write = false;

        let result = self
            .storage
            .update(|stored| {
                let mut dirty = state.unsaved;
                match stored {
                    Ok(Some(mut stored)) if !state.unsaved => {
                        if stored.clamp_to_goals() {
                            warn!("Stored counters were above their goals, clamped to {stored}");
                            dirty = true;
                        }
                        state.record = stored;
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => dirty = true,
                    Err(e) => {
                        read_error = Some(e);
                        dirty = true;
                    }
                }

                let mut replaced = None;
                if state.record.is_stale(today) {
                    replaced = Some(state.record.date);
                    state.record = DailyRecord::new_for(today);
                    dirty = true;
                }

                let (value, changed) = change(&mut state.record);
                outcome = Some((value, replaced));
                wants_write = dirty || changed;
                wants_write.then(|| state.record.clone())
            })
            .await;

        if let Some(e) = read_error {
            self.event_log.log(format!("Error loading data: {e}")).await;
        }
        match result {
            Ok(()) if wants_write => {
                debug!("Saved {}", state.record);
                state.unsaved = false;
            }
            Ok(()) => {}
            Err(e) if wants_write => {
                error!("Failed to save {}: {e:?}", state.record);
                self.event_log.log(format!("Error saving data: {e}")).await;
                state.unsaved = true;
            }
            Err(e) => warn!("Couldn't access the stored record {e:?}"),
        }

        // Storage calls the change exactly once, the default is never used.
        let (value, replaced) = outcome.unwrap_or_default();
        Transaction { value, replaced }
    }
}
