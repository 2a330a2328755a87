use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};

use crate::{
    agg::summary::Summary,
    model::{
        cli::OutputTarget,
        record::Record,
    },
    ui::printf::{Arg, Template},
};

/// Where live lines and the final report go.
pub type Sink = Box<dyn Write + Send>;

/// Memory is reported in binary megabytes.
const MIB: f64 = (1u64 << 20) as f64;

pub fn mebibytes(bytes: u64) -> f64 {
    bytes as f64 / MIB
}

pub fn open_output(target: &OutputTarget) -> Result<Sink> {
    match target {
        OutputTarget::Stderr => Ok(Box::new(io::stderr())),
        OutputTarget::File(path) => {
            let file = open_append(path)
                .with_context(|| format!("failed to open output file {}", path.display()))?;
            Ok(Box::new(file))
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// `<sparkline> <mem>`, either prefixed with `\r` to overwrite the previous
/// line or terminated with `\n`.
pub fn live_line(sparkline: &str, maximum: u64, mem_format: &Template, newlines: bool) -> String {
    let mem = mem_format.render(&[Arg::Float(mebibytes(maximum))]);
    if newlines {
        format!("{sparkline} {mem}\n")
    } else {
        format!("\r{sparkline} {mem}")
    }
}

pub fn render_summary_to_string(summary: &Summary, mem_format: &Template, time_format: &Template) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_summary(&mut out, summary, mem_format, time_format);
    out
}

fn write_summary<W: fmt::Write>(
    out: &mut W,
    summary: &Summary,
    mem_format: &Template,
    time_format: &Template,
) -> fmt::Result {
    if summary.records == 0 {
        return writeln!(out, "no data collected");
    }

    let (hours, minutes, seconds) = summary.hms();
    let time = time_format.render(&[Arg::Int(hours), Arg::Int(minutes), Arg::Float(seconds)]);

    writeln!(out, " avg: {}", mem_format.render(&[Arg::Float(mebibytes(summary.average))]))?;
    writeln!(out, " max: {}", mem_format.render(&[Arg::Float(mebibytes(summary.maximum))]))?;
    writeln!(out, "time: {time}")
}

/// One `<epoch-ms> <rss-bytes>` line per record.
pub fn write_history<W: Write>(out: &mut W, records: &[Record]) -> io::Result<()> {
    for r in records {
        writeln!(out, "{} {}", r.timestamp_ms(), r.value)?;
    }
    Ok(())
}

/// Append the history to `path`, creating it if needed.
pub fn append_history(path: &Path, records: &[Record]) -> Result<()> {
    let file = open_append(path)
        .with_context(|| format!("failed to open dump file {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    write_history(&mut writer, records)
        .and_then(|_| writer.flush())
        .with_context(|| format!("failed to write dump file {}", path.display()))
}
