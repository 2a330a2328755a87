use std::{path::PathBuf, time::Duration};

use crate::ui::printf::Template;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum OutputTarget {
    Stderr,
    File(PathBuf),
}

impl OutputTarget {
    pub fn from_arg(arg: &str) -> Self {
        match arg {
            "-" => OutputTarget::Stderr,
            path => OutputTarget::File(PathBuf::from(path)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub cmd: String,
    pub args: Vec<String>,
    pub sample_every: Duration,
    pub record_every: Duration,
    /// Number of recent records drawn in the sparkline.
    pub length: usize,
    pub quiet: bool,
    pub newlines: bool,
    pub mem_format: Template,
    pub time_format: Template,
    pub output: OutputTarget,
    pub dump: Option<PathBuf>,
}

impl RunConfig {
    pub fn cmdline(&self) -> String {
        std::iter::once(self.cmd.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
