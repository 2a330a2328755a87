use std::{
    io,
    process::{Command, ExitStatus},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use crossbeam_channel::{Receiver, RecvError, Sender, bounded, select};
use nix::{
    sys::signal::{Signal, SigSet, kill},
    unistd::Pid,
};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::{
    agg::{
        live::{LiveView, Recorder},
        store::SeriesStore,
    },
    error::RunError,
    model::{cli::RunConfig, record::Snapshot},
    trace::{MemoryProbe, build_probe},
    ui::report::Sink,
};

/// What a finished run leaves behind for reporting.
#[derive(Debug)]
pub struct RunReport {
    pub snapshot: Snapshot,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub status: ExitStatus,
}

/// One monitored execution of the configured command.
pub struct Session<'a> {
    config: &'a RunConfig,
    probe: Box<dyn MemoryProbe + Send>,
    cancel_tx: Sender<()>,
    cancel_rx: Receiver<()>,
}

impl<'a> Session<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        Self::with_probe(config, build_probe())
    }

    pub fn with_probe(config: &'a RunConfig, probe: Box<dyn MemoryProbe + Send>) -> Self {
        let (cancel_tx, cancel_rx) = bounded(1);
        Self {
            config,
            probe,
            cancel_tx,
            cancel_rx,
        }
    }

    /// Handle that stops the run from another thread. Sending is enough;
    /// dropping it does nothing.
    #[allow(dead_code)]
    pub fn canceller(&self) -> Sender<()> {
        self.cancel_tx.clone()
    }

    /// Run the command to completion, sampling it the whole time.
    ///
    /// Returns once the child has exited, a termination signal arrived or
    /// the run was cancelled. The child is killed on every path that does not
    /// end with it already reaped. The output sink is handed back so the
    /// caller can append the summary after the live lines.
    pub fn run(self, out: Sink) -> Result<(RunReport, Sink), RunError> {
        let Session {
            config,
            probe,
            cancel_tx: _cancel_tx,
            cancel_rx,
        } = self;

        let signals = listen_for_signals()?;

        let start = OffsetDateTime::now_utc();
        let child = Command::new(&config.cmd)
            .args(&config.args)
            .spawn()
            .map_err(|source| RunError::Spawn {
                command: config.cmdline(),
                source,
            })?;

        let pid = child.id();
        info!(pid, cmd = %config.cmdline(), "spawned");

        let reaped = Arc::new(AtomicBool::new(false));
        let _guard = ChildGuard {
            pid,
            reaped: Arc::clone(&reaped),
        };

        let store = Arc::new(SeriesStore::new());
        let mut recorder = Recorder::new(
            probe,
            pid,
            Arc::clone(&store),
            LiveView::from_config(config),
            out,
        );
        // Until the waiter runs, a child that already exited is a zombie and
        // still shows up in the process table.
        recorder.prime();
        let exits = wait_for_exit(child, reaped)?;

        let (stop_tx, stop_rx) = bounded::<()>(0);
        let (sample_every, record_every) = (config.sample_every, config.record_every);
        let handle = thread::Builder::new()
            .name("recorder".into())
            .spawn(move || recorder.run(sample_every, record_every, stop_rx))
            .map_err(|e| RunError::Thread("recorder", e))?;

        let outcome = select! {
            recv(exits) -> msg => exit_outcome(msg),
            recv(signals) -> msg => Err(signal_outcome(msg)),
            recv(cancel_rx) -> _ => Err(RunError::Cancelled),
        };
        let end = OffsetDateTime::now_utc();

        drop(stop_tx);
        let out = handle.join().map_err(|_| RunError::RecorderPanicked)?;

        let status = outcome?;
        if store.is_empty() {
            debug!(pid, "no memory sample succeeded");
        }
        debug!(
            pid,
            %status,
            records = store.len(),
            maximum = store.maximum(),
            "run finished"
        );

        Ok((
            RunReport {
                snapshot: store.snapshot(None),
                start,
                end,
                status,
            },
            out,
        ))
    }
}

fn exit_outcome(msg: Result<io::Result<ExitStatus>, RecvError>) -> Result<ExitStatus, RunError> {
    match msg {
        Ok(Ok(status)) => Ok(status),
        Ok(Err(e)) => Err(RunError::Wait(e)),
        Err(RecvError) => Err(RunError::WaiterStopped),
    }
}

fn signal_outcome(msg: Result<nix::Result<Signal>, RecvError>) -> RunError {
    match msg {
        Ok(Ok(signal)) => RunError::Interrupted(signal),
        Ok(Err(e)) => RunError::Signals(e),
        Err(RecvError) => RunError::SignalListenerStopped,
    }
}

/// Kills the child when the coordinator leaves before it was reaped.
struct ChildGuard {
    pid: u32,
    reaped: Arc<AtomicBool>,
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if self.reaped.load(Ordering::Acquire) {
            return;
        }
        let Ok(raw) = i32::try_from(self.pid) else {
            return;
        };
        match kill(Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) => debug!(pid = self.pid, "killed child"),
            Err(e) => warn!(pid = self.pid, error = %e, "failed to kill child"),
        }
    }
}

fn wait_for_exit(
    mut child: std::process::Child,
    reaped: Arc<AtomicBool>,
) -> Result<Receiver<io::Result<ExitStatus>>, RunError> {
    let (tx, rx) = bounded(1);
    thread::Builder::new()
        .name("waiter".into())
        .spawn(move || {
            let status = child.wait();
            reaped.store(true, Ordering::Release);
            let _ = tx.send(status);
        })
        .map_err(|e| RunError::Thread("waiter", e))?;
    Ok(rx)
}

/// Turn SIGINT and SIGTERM into a channel message.
///
/// Both are blocked on the calling thread before any worker is spawned, so
/// every later thread inherits the mask and only the listener's `sigwait`
/// ever sees them. `Command` clears the mask again in the child.
fn listen_for_signals() -> Result<Receiver<nix::Result<Signal>>, RunError> {
    let mut set = SigSet::empty();
    set.add(Signal::SIGINT);
    set.add(Signal::SIGTERM);
    set.thread_block()?;

    let (tx, rx) = bounded(1);
    thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            let received = set.wait();
            if let Ok(signal) = &received {
                debug!(%signal, "received signal");
            }
            let _ = tx.send(received);
        })
        .map_err(|e| RunError::Thread("signal", e))?;
    Ok(rx)
}
