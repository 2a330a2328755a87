mod agg;
mod cli;
mod error;
mod logging;
mod model;
mod session;
mod trace;
mod ui;

use std::{io::Write, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use tracing::debug;

use crate::{
    agg::summary::Summary,
    error::RunError,
    model::cli::RunConfig,
    session::Session,
    ui::report,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize_logging();

    let config = cli.into_config();
    debug!(
        cmd = %config.cmdline(),
        sample_ms = config.sample_every.as_millis() as u64,
        record_ms = config.record_every.as_millis() as u64,
        "starting"
    );

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &RunConfig) -> Result<()> {
    let out = report::open_output(&config.output)?;
    let (run, mut out) = Session::new(config).run(out)?;

    let summary = Summary::from_snapshot(&run.snapshot, run.start, run.end);
    let mut text = String::new();
    if !run.snapshot.is_empty() && !config.newlines && !config.quiet {
        // Finish the line the live sparkline was redrawn on.
        text.push('\n');
    }
    text.push_str(&report::render_summary_to_string(
        &summary,
        &config.mem_format,
        &config.time_format,
    ));
    out.write_all(text.as_bytes())
        .and_then(|_| out.flush())
        .context("failed to write summary")?;

    if let Some(path) = &config.dump {
        report::append_history(path, &run.snapshot.records)?;
    }

    if !run.status.success() {
        return Err(RunError::ChildFailed(run.status).into());
    }
    Ok(())
}
