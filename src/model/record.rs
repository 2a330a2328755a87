use time::OffsetDateTime;

/// One recorded point of the memory history: the peak RSS seen over a
/// record interval, stamped when the interval closed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Record {
    pub timestamp: OffsetDateTime,
    pub value: u64,
}

impl Record {
    pub fn new(timestamp: OffsetDateTime, value: u64) -> Self {
        Self { timestamp, value }
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp_ms(&self) -> i64 {
        (self.timestamp.unix_timestamp_nanos() / 1_000_000) as i64
    }
}

/// Owned copy of (a suffix of) the history plus the running maximum.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Snapshot {
    pub records: Vec<Record>,
    pub maximum: u64,
}

impl Snapshot {
    pub fn values(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.value).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
