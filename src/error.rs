use std::{io, process::ExitStatus};

use nix::sys::signal::Signal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start command `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("received signal: {0}")]
    Interrupted(Signal),

    #[error("run cancelled")]
    Cancelled,

    #[error("command failed: {0}")]
    ChildFailed(ExitStatus),

    #[error("failed to wait for command")]
    Wait(#[source] io::Error),

    #[error("child wait thread stopped without a status")]
    WaiterStopped,

    #[error("failed to set up signal handling")]
    Signals(#[from] nix::Error),

    #[error("signal listener stopped")]
    SignalListenerStopped,

    #[error("failed to start {0} thread")]
    Thread(&'static str, #[source] io::Error),

    #[error("recorder thread panicked")]
    RecorderPanicked,
}
