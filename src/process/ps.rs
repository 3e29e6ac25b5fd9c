use log::{debug, trace, warn};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::{ProcessRow, ProcessSource};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },

    #[error("failed to wait for {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Run a command and capture its stdout, killing it if it outlives `timeout`.
/// stdout is drained on a separate thread so a large listing cannot fill the pipe and stall.
pub fn run_command(program: &str, args: &[&str], timeout: Duration) -> Result<String, CommandError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let reader = child.stdout.take().map(|mut stdout| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            buf
        })
    });

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if started.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CommandError::Timeout {
                        program: program.to_string(),
                        timeout,
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(source) => {
                let _ = child.kill();
                return Err(CommandError::Io {
                    program: program.to_string(),
                    source,
                });
            }
        }
    };

    let stdout = reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    if !status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            status,
        });
    }

    Ok(String::from_utf8_lossy(&stdout).into_owned())
}

/// Parse `ps -o pid=,ppid=,pcpu=,command=` output. Malformed rows are skipped.
pub fn parse_ps_output(stdout: &str) -> Vec<ProcessRow> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let pid = parts.next()?.parse::<u32>().ok()?;
            let parent_pid = parts.next()?.parse::<u32>().ok();
            let cpu_percent = parts.next()?.parse::<f32>().ok()?;
            let command = parts.collect::<Vec<_>>().join(" ");
            if command.is_empty() {
                return None;
            }
            Some(ProcessRow {
                pid,
                parent_pid,
                cpu_percent,
                command,
            })
        })
        .collect()
}

/// Parse `lsof -F n` output: the first name line that isn't the filesystem root
pub fn parse_lsof_cwd(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .find(|line| line.starts_with('n') && *line != "n/")
        .map(|line| PathBuf::from(&line[1..]))
}

/// Process listing by shelling out to `ps`, with CWDs from procfs or `lsof`
#[derive(Debug, Clone)]
pub struct PsSource {
    timeout: Duration,
    proc_root: Option<PathBuf>,
}

impl PsSource {
    pub fn new(timeout: Duration) -> Self {
        let proc_root = Path::new("/proc/self/cwd")
            .exists()
            .then(|| PathBuf::from("/proc"));
        PsSource { timeout, proc_root }
    }
}

impl ProcessSource for PsSource {
    fn list_processes(&mut self) -> Vec<ProcessRow> {
        match run_command("ps", &["-ax", "-o", "pid=,ppid=,pcpu=,command="], self.timeout) {
            Ok(stdout) => {
                let rows = parse_ps_output(&stdout);
                trace!("ps listed {} processes", rows.len());
                rows
            }
            Err(e) => {
                warn!("Process listing failed: {}", e);
                Vec::new()
            }
        }
    }

    fn cwd_of(&self, pid: u32) -> Option<PathBuf> {
        if let Some(proc_root) = &self.proc_root {
            return match std::fs::read_link(proc_root.join(pid.to_string()).join("cwd")) {
                Ok(cwd) => Some(cwd),
                Err(e) => {
                    debug!("No cwd for pid={} via procfs: {}", pid, e);
                    None
                }
            };
        }

        let pid_arg = pid.to_string();
        match run_command("lsof", &["-a", "-p", &pid_arg, "-d", "cwd", "-F", "n"], self.timeout) {
            Ok(stdout) => parse_lsof_cwd(&stdout),
            Err(e) => {
                debug!("No cwd for pid={} via lsof: {}", pid, e);
                None
            }
        }
    }
}
