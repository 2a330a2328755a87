use std::{sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, select, tick};
use time::OffsetDateTime;
use tracing::{debug, trace, warn};

use crate::{
    agg::store::SeriesStore,
    model::cli::RunConfig,
    trace::{MemoryProbe, tree_rss},
    ui::{
        printf::Template,
        report::{Sink, live_line},
        sparkline::sparkline,
    },
};

/// How live lines are drawn. Absent in quiet mode.
#[derive(Debug, Clone)]
pub struct LiveView {
    pub length: usize,
    pub newlines: bool,
    pub mem_format: Template,
}

impl LiveView {
    pub fn from_config(cfg: &RunConfig) -> Option<Self> {
        (!cfg.quiet).then(|| Self {
            length: cfg.length,
            newlines: cfg.newlines,
            mem_format: cfg.mem_format.clone(),
        })
    }
}

/// Samples the process tree and folds the samples into records.
///
/// The pending sample buffer is owned by whichever thread drives the
/// recorder; only the store is shared.
pub struct Recorder {
    probe: Box<dyn MemoryProbe + Send>,
    pid: u32,
    store: Arc<SeriesStore>,
    samples: Vec<u64>,
    view: Option<LiveView>,
    out: Sink,
}

impl Recorder {
    pub fn new(
        probe: Box<dyn MemoryProbe + Send>,
        pid: u32,
        store: Arc<SeriesStore>,
        view: Option<LiveView>,
        out: Sink,
    ) -> Self {
        Self {
            probe,
            pid,
            store,
            samples: Vec::new(),
            view,
            out,
        }
    }

    /// Measure once. A failed measurement is dropped.
    pub fn sample(&mut self) -> bool {
        match tree_rss(self.probe.as_mut(), self.pid) {
            Ok(rss) => {
                trace!(pid = self.pid, rss, "sample");
                self.samples.push(rss);
                true
            }
            Err(e) => {
                debug!(pid = self.pid, error = %e, "sample failed");
                false
            }
        }
    }

    /// Close the current interval: store its peak and redraw the live line.
    /// Does nothing if no sample succeeded since the last record.
    pub fn record(&mut self, now: OffsetDateTime) -> bool {
        let Some(peak) = self.samples.iter().copied().max() else {
            return false;
        };
        self.samples.clear();
        self.store.append(now, peak);

        if let Some(view) = &self.view {
            let snap = self.store.snapshot(Some(view.length));
            let line = live_line(
                &sparkline(snap.maximum, &snap.values()),
                snap.maximum,
                &view.mem_format,
                view.newlines,
            );
            if let Err(e) = self
                .out
                .write_all(line.as_bytes())
                .and_then(|_| self.out.flush())
            {
                warn!(error = %e, "failed to write live output");
            }
        }

        true
    }

    pub fn pending(&self) -> usize {
        self.samples.len()
    }

    /// One sample and record before any ticker starts, so even a very short
    /// run has a record. Call it while the child is still unreaped.
    pub fn prime(&mut self) -> bool {
        self.sample();
        self.record(OffsetDateTime::now_utc())
    }

    /// Drive the tick loop until `stop` fires or its sender is dropped, then
    /// hand the output sink back.
    pub fn run(mut self, sample_every: Duration, record_every: Duration, stop: Receiver<()>) -> Sink {
        let samples = tick(sample_every);
        let records = tick(record_every);

        loop {
            select! {
                recv(stop) -> _ => break,
                recv(samples) -> _ => {
                    self.sample();
                }
                recv(records) -> _ => {
                    self.record(OffsetDateTime::now_utc());
                }
            }
        }

        debug!(
            records = self.store.len(),
            discarded = self.pending(),
            "recorder stopped"
        );
        self.out
    }
}
