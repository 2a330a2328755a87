use time::{Duration, OffsetDateTime};

use crate::model::record::Snapshot;

/// Final numbers for a finished run.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Summary {
    pub records: usize,
    pub average: u64,
    pub maximum: u64,
    pub elapsed: Duration,
}

impl Summary {
    pub fn from_snapshot(snapshot: &Snapshot, start: OffsetDateTime, end: OffsetDateTime) -> Self {
        let values = snapshot.values();
        debug_assert_eq!(
            values.iter().copied().max().unwrap_or(0),
            snapshot.maximum,
            "running maximum out of sync with history"
        );

        Self {
            records: values.len(),
            average: average(&values),
            maximum: snapshot.maximum,
            elapsed: (end - start).max(Duration::ZERO),
        }
    }

    /// Elapsed time split into whole hours, whole minutes and seconds with
    /// millisecond resolution.
    pub fn hms(&self) -> (i64, i64, f64) {
        let millis = self.elapsed.whole_milliseconds() as i64;

        let hours = millis / 3_600_000;
        let rem = millis % 3_600_000;
        let minutes = rem / 60_000;
        let seconds = (rem % 60_000) as f64 / 1000.0;

        (hours, minutes, seconds)
    }
}

/// Truncating mean; zero for no values.
pub fn average(values: &[u64]) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let sum: u128 = values.iter().map(|&v| v as u128).sum();
    (sum / values.len() as u128) as u64
}
