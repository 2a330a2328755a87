#![cfg(unix)]

use std::{
    path::PathBuf,
    process::{Command, Output},
};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mem-scope"))
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .env_remove("MEM_SCOPE_LOG")
        .output()
        .expect("failed to run mem-scope")
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn newlines(text: &str) -> usize {
    text.matches('\n').count()
}

/// The last live line drawn before the summary, without its `\r`.
fn last_live_line(text: &str) -> &str {
    let before_summary = text.split("\n avg:").next().unwrap_or("");
    before_summary.rsplit('\r').next().unwrap_or("")
}

fn assert_summary(text: &str) {
    let avg = text.find(" avg: ").expect("no average line");
    let max = text.find(" max: ").expect("no maximum line");
    let time = text.find("time: ").expect("no time line");
    assert!(avg < max && max < time, "summary out of order:\n{text}");
}

#[test]
fn basic_run_prints_summary() {
    let out = run(&["sleep", "0.5"]);

    assert!(out.status.success(), "{}", stderr(&out));
    assert_summary(&stderr(&out));
}

#[test]
fn instant_exit_still_reports() {
    let out = run(&["-q", "true"]);
    let text = stderr(&out);

    assert!(out.status.success(), "{text}");
    assert!(text.starts_with(" avg: "), "{text:?}");
    assert!(!text.contains("no data collected"));
}

#[test]
fn end_of_options() {
    let out = run(&["--", "sleep", "0.1"]);

    assert!(out.status.success(), "{}", stderr(&out));
    assert_summary(&stderr(&out));
}

#[test]
fn options_after_command_are_passed_through() {
    // `-h` belongs to `ls`, not to us.
    let out = run(&["--", "ls", "-l", "-h"]);

    assert!(out.status.success(), "{}", stderr(&out));
    assert!(String::from_utf8_lossy(&out.stdout).contains('\n'));
    assert_summary(&stderr(&out));
}

#[test]
fn child_keeps_standard_output() {
    let out = run(&["echo", "hello"]);

    assert_eq!(String::from_utf8_lossy(&out.stdout), "hello\n");
}

#[test]
fn sparkline_length() {
    let out = run(&["-l", "5", "-w", "10", "sleep", "0.5"]);
    let text = stderr(&out);

    let line = last_live_line(&text);
    let (sparkline, mem) = line.split_once(' ').expect("no live line");
    assert_eq!(sparkline.chars().count(), 5, "line: {line:?}");

    let (whole, frac) = mem.split_once('.').expect("no decimal point");
    assert!(whole.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(frac.len(), 1);
}

#[test]
fn memory_format() {
    let out = run(&["-l", "5", "-w", "10", "-m", "%0.2f", "sleep", "0.5"]);
    let text = stderr(&out);

    let line = last_live_line(&text);
    let (_, mem) = line.split_once(' ').expect("no live line");
    let (_, frac) = mem.split_once('.').expect("no decimal point");
    assert_eq!(frac.len(), 2, "line: {line:?}");
}

#[test]
fn time_format() {
    let out = run(&["-l", "10", "-t", "%d:%05d:%06.3f", "sleep", "0.5"]);
    let text = stderr(&out);

    let time = text
        .lines()
        .find_map(|l| l.strip_prefix("time: "))
        .expect("no time line");
    let parts: Vec<&str> = time.split(':').collect();
    assert_eq!(parts.len(), 3, "time: {time:?}");
    assert_eq!(parts[1].len(), 5);
    assert_eq!(parts[2].len(), 6);
    assert_eq!(parts[2].find('.'), Some(2));
}

#[test]
fn long_wait_draws_a_single_line() {
    let out = run(&["-w", "2000", "sleep", "0.5"]);

    // Overwritten live line, its terminating newline and three summary lines.
    assert_eq!(newlines(&stderr(&out)), 4, "{:?}", stderr(&out));
}

#[test]
fn short_wait_with_newlines() {
    let out = run(&["-n", "-w", "10", "sleep", "0.5"]);

    assert!(newlines(&stderr(&out)) >= 9, "{:?}", stderr(&out));
}

#[test]
fn separate_sample_and_record_intervals() {
    let out = run(&["-r", "500", "-s", "100", "sleep", "0.5"]);

    assert_eq!(newlines(&stderr(&out)), 4, "{:?}", stderr(&out));
}

#[test]
fn quiet_prints_only_summary() {
    let out = run(&["-q", "sleep", "0.5"]);
    let text = stderr(&out);

    assert!(text.starts_with(" avg"), "{text:?}");
    assert_eq!(newlines(&text), 3);
}

#[test]
fn missing_binary() {
    let out = run(&["/nonexistent/mem-scope-missing-binary"]);

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("failed to start command"));
}

#[test]
fn failing_child_reports_and_fails() {
    let out = run(&["-q", "sh", "-c", "sleep 0.2; exit 3"]);
    let text = stderr(&out);

    assert_eq!(out.status.code(), Some(1));
    assert_summary(&text);
    assert!(text.contains("command failed"), "{text:?}");
}

#[test]
fn dump_is_appended() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("dump.log");
    let dump_arg = dump.to_str().unwrap();

    let out = run(&["-n", "-w", "100", "-d", dump_arg, "sleep", "0.5"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let first = std::fs::read_to_string(&dump).unwrap();

    // One live line per record, then the three summary lines.
    let live_lines = newlines(&stderr(&out)) - 3;
    assert!(live_lines > 0);
    assert_eq!(first.lines().count(), live_lines, "{first:?}");

    run(&["-q", "-w", "100", "-d", dump_arg, "sleep", "0.2"]);
    let both = std::fs::read_to_string(&dump).unwrap();

    assert!(both.starts_with(&first));
    assert!(both.lines().count() > live_lines);

    for line in both.lines() {
        let (ms, rss) = line.split_once(' ').expect("malformed dump line");
        assert!(ms.parse::<u64>().is_ok(), "bad timestamp in {line:?}");
        assert!(rss.parse::<u64>().is_ok(), "bad rss in {line:?}");
    }
}

#[test]
fn output_file_is_appended() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output.log");
    let output_arg = output.to_str().unwrap();

    for _ in 0..2 {
        let out = run(&["-q", "-o", output_arg, "sleep", "0.5"]);
        assert!(out.status.success(), "{}", stderr(&out));
        assert!(out.stderr.is_empty());
    }

    let text = std::fs::read_to_string(&output).unwrap();
    assert_eq!(text.split('\n').count(), 7, "{text:?}");
}

#[test]
fn unknown_option_is_usage_error() {
    let out = run(&["--foo", "sleep", "0.1"]);

    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn missing_command_is_usage_error() {
    let out = run(&[]);

    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn bad_format_is_usage_error() {
    let out = run(&["-m", "%d:%d", "sleep", "0.1"]);

    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn version() {
    let out = run(&["-v"]);

    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[cfg(target_os = "linux")]
mod signals {
    use std::{
        process::Stdio,
        thread,
        time::{Duration, Instant},
    };

    use nix::{
        sys::signal::{Signal, kill},
        unistd::Pid,
    };
    use sysinfo::{ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

    use super::*;

    fn process_table() -> System {
        let mut system = System::new();
        system.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::new());
        system
    }

    /// Pid of the first process whose parent is `parent`, polling for a while.
    fn wait_for_child(parent: u32) -> u32 {
        let parent = sysinfo::Pid::from_u32(parent);
        let started = Instant::now();
        while started.elapsed() < Duration::from_secs(5) {
            let system = process_table();
            let child = system
                .processes()
                .iter()
                .find(|(_, p)| p.thread_kind().is_none() && p.parent() == Some(parent))
                .map(|(pid, _)| pid.as_u32());
            if let Some(child) = child {
                return child;
            }
            thread::sleep(Duration::from_millis(20));
        }
        panic!("no child of {parent} appeared");
    }

    /// Gone from the table, or a zombie nobody has collected yet.
    fn is_dead(pid: u32) -> bool {
        let system = process_table();
        system
            .process(sysinfo::Pid::from_u32(pid))
            .is_none_or(|p| p.status() == ProcessStatus::Zombie)
    }

    #[test]
    fn termination_signal_kills_child_without_summary() {
        let monitor = Command::new(bin_path())
            .args(["-q", "sleep", "30"])
            .env_remove("MEM_SCOPE_LOG")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let child = wait_for_child(monitor.id());

        kill(Pid::from_raw(monitor.id() as i32), Signal::SIGTERM).unwrap();
        let out = monitor.wait_with_output().unwrap();
        let text = stderr(&out);

        assert_eq!(out.status.code(), Some(1), "{text:?}");
        assert!(text.contains("received signal: SIGTERM"), "{text:?}");
        assert!(!text.contains(" avg: "), "{text:?}");

        let started = Instant::now();
        while !is_dead(child) && started.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(is_dead(child), "child {child} still running");
    }
}
