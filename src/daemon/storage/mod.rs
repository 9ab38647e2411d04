//!  Storage is organized through [record_storage::RecordStorageImpl].
//!  The basic idea is:
//!   - There is exactly one record file, holding the counters for a single local day.
//!   - A record that belongs to another day is stale and gets replaced by a fresh one.
//!   - [tracker::Tracker] is the only owner of the in-memory record.

pub mod entities;
pub mod record_storage;
pub mod tracker;
