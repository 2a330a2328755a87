use std::{path::PathBuf, time::Duration};

use clap::{ArgAction, Parser};

use crate::{
    model::cli::{OutputTarget, RunConfig},
    ui::printf::{FormatError, Template},
};

pub const DEFAULT_RECORD_MS: u64 = 1000;
pub const DEFAULT_SAMPLE_MS: u64 = 200;

#[derive(Parser, Debug)]
#[command(
    name = "mem-scope",
    version,
    about = "Track the RAM usage (resident set size) of a process and its descendants in real time",
    long_about = None,
    disable_version_flag = true
)]
pub struct Cli {
    /// File to append the full memory usage history to when finished
    #[arg(short, long, value_name = "path")]
    pub dump: Option<PathBuf>,

    /// Sparkline length
    #[arg(short, long, value_name = "n", default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
    pub length: u32,

    /// Format string for memory amounts in MiB
    #[arg(short, long, value_name = "fmt", default_value = "%.1f", value_parser = parse_mem_format)]
    pub mem_format: Template,

    /// Print each sparkline on a new line instead of over the previous one
    #[arg(short, long)]
    pub newlines: bool,

    /// Output file to append to ('-' for standard error)
    #[arg(short, long, value_name = "path", default_value = "-")]
    pub output: String,

    /// Do not print sparklines, only the final report
    #[arg(short, long)]
    pub quiet: bool,

    /// How often to record and report memory usage, in ms [default: 1000]
    #[arg(short, long, value_name = "ms", value_parser = clap::value_parser!(u64).range(1..))]
    pub record: Option<u64>,

    /// How often to sample memory usage, in ms [default: 200]
    #[arg(short, long, value_name = "ms", value_parser = clap::value_parser!(u64).range(1..))]
    pub sample: Option<u64>,

    /// Format string for run time (hours, minutes, seconds)
    #[arg(short, long, value_name = "fmt", default_value = "%d:%02d:%04.1f", value_parser = parse_time_format)]
    pub time_format: Template,

    /// Set both --sample and --record (either one still overrides)
    #[arg(short, long, value_name = "ms", value_parser = clap::value_parser!(u64).range(1..))]
    pub wait: Option<u64>,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    /// Command (and its arguments) to run and monitor.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, value_name = "command")]
    pub command: Vec<String>,
}

fn parse_mem_format(s: &str) -> Result<Template, FormatError> {
    Template::with_arity(s, 1)
}

fn parse_time_format(s: &str) -> Result<Template, FormatError> {
    Template::with_arity(s, 3)
}

impl Cli {
    pub fn into_config(self) -> RunConfig {
        let record_ms = self.record.or(self.wait).unwrap_or(DEFAULT_RECORD_MS);
        let sample_ms = self.sample.or(self.wait).unwrap_or(DEFAULT_SAMPLE_MS);

        let mut command = self.command;
        let cmd = command.remove(0);

        RunConfig {
            cmd,
            args: command,
            sample_every: Duration::from_millis(sample_ms),
            record_every: Duration::from_millis(record_ms),
            length: self.length as usize,
            quiet: self.quiet,
            newlines: self.newlines,
            mem_format: self.mem_format,
            time_format: self.time_format,
            output: OutputTarget::from_arg(&self.output),
            dump: self.dump,
        }
    }
}
