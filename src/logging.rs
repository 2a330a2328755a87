use std::{io::IsTerminal, sync::OnceLock};

use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the log filter, e.g. `MEM_SCOPE_LOG=debug`.
pub const LOG_ENV: &str = "MEM_SCOPE_LOG";

static INIT_GUARD: OnceLock<()> = OnceLock::new();

/// Route `tracing` output to standard error. Quiet (`warn`) unless the
/// filter variable says otherwise. Safe to call more than once.
pub fn initialize_logging() {
    if INIT_GUARD.set(()).is_err() {
        return;
    }

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    // Ignore AlreadyInit errors from a subscriber installed elsewhere.
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}
