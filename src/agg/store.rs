use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use time::OffsetDateTime;

use crate::model::record::{Record, Snapshot};

#[derive(Debug, Default)]
struct Series {
    records: Vec<Record>,
    maximum: u64,
}

/// Append-only memory history shared between the recorder (the only writer)
/// and anyone who wants to look at it.
///
/// Readers always get owned copies, so a snapshot stays valid across later
/// appends.
#[derive(Debug, Default)]
pub struct SeriesStore {
    inner: RwLock<Series>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, timestamp: OffsetDateTime, value: u64) {
        let mut s = self.write();
        s.records.push(Record::new(timestamp, value));
        if value > s.maximum {
            s.maximum = value;
        }
    }

    /// The most recent `count` records (all of them for `None` or a count
    /// past the end), oldest first, plus the running maximum.
    pub fn snapshot(&self, count: Option<usize>) -> Snapshot {
        let s = self.read();
        let len = s.records.len();
        let take = count.map_or(len, |c| c.min(len));

        Snapshot {
            records: s.records[len - take..].to_vec(),
            maximum: s.maximum,
        }
    }

    pub fn maximum(&self) -> u64 {
        self.read().maximum
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave a half-pushed record behind,
    // so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, Series> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Series> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
