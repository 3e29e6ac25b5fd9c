mod ps;
mod sysinfo_source;

pub use ps::{parse_lsof_cwd, parse_ps_output, run_command, CommandError, PsSource};
pub use sysinfo_source::SysinfoSource;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// One row of a platform process listing
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRow {
    pub pid: u32,
    pub parent_pid: Option<u32>,
    pub cpu_percent: f32,
    pub command: String,
}

/// A candidate assistant process discovered during one scan.
/// A pid means nothing outside the scan that found it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunningProcess {
    pub pid: u32,
    pub cwd: Option<PathBuf>,
    pub cpu_usage: f32,
}

/// Narrow view of the OS process table.
///
/// Implementations must never fail: a listing that cannot be produced is empty,
/// and a CWD that cannot be resolved is `None`.
pub trait ProcessSource: Send + Sync {
    fn list_processes(&mut self) -> Vec<ProcessRow>;
    fn cwd_of(&self, pid: u32) -> Option<PathBuf>;
}

impl ProcessSource for Box<dyn ProcessSource> {
    fn list_processes(&mut self) -> Vec<ProcessRow> {
        (**self).list_processes()
    }

    fn cwd_of(&self, pid: u32) -> Option<PathBuf> {
        (**self).cwd_of(pid)
    }
}

/// Name heuristics deciding which processes are assistant sessions
#[derive(Debug, Clone)]
pub struct ProcessFilter {
    pub include_markers: Vec<String>,
    pub exclude_markers: Vec<String>,
    /// Our own pid, never a candidate
    pub self_pid: u32,
}

impl ProcessFilter {
    pub fn new(include_markers: Vec<String>, exclude_markers: Vec<String>) -> Self {
        ProcessFilter {
            include_markers: include_markers.iter().map(|m| m.to_lowercase()).collect(),
            exclude_markers: exclude_markers.iter().map(|m| m.to_lowercase()).collect(),
            self_pid: std::process::id(),
        }
    }

    pub fn is_candidate(&self, row: &ProcessRow) -> bool {
        if row.pid == self.self_pid {
            return false;
        }
        let command = row.command.to_lowercase();
        self.include_markers.iter().any(|m| command.contains(m.as_str()))
            && !self.exclude_markers.iter().any(|m| command.contains(m.as_str()))
    }
}

impl Default for ProcessFilter {
    fn default() -> Self {
        ProcessFilter::new(
            crate::config::default_process_markers(),
            crate::config::default_exclude_markers(),
        )
    }
}

/// Find all candidate assistant processes and resolve their working directories.
///
/// Sub-agents (candidates whose parent is also a candidate) are dropped. CWD lookups
/// run concurrently and are joined before returning; listing order is preserved.
pub fn list_candidate_processes<S: ProcessSource + ?Sized>(
    source: &mut S,
    filter: &ProcessFilter,
) -> Vec<RunningProcess> {
    debug!("=== Starting process discovery ===");

    let rows = source.list_processes();
    trace!("Total listed processes: {}", rows.len());

    let candidates: Vec<&ProcessRow> = rows.iter().filter(|r| filter.is_candidate(r)).collect();
    let candidate_pids: HashSet<u32> = candidates.iter().map(|r| r.pid).collect();

    let candidates: Vec<&ProcessRow> = candidates
        .into_iter()
        .filter(|row| match row.parent_pid {
            Some(parent) if candidate_pids.contains(&parent) => {
                debug!("Skipping sub-agent process: pid={}, parent_pid={}", row.pid, parent);
                false
            }
            _ => true,
        })
        .collect();

    let source: &S = &*source;
    let cwds: Vec<Option<PathBuf>> = std::thread::scope(|scope| {
        let handles: Vec<_> = candidates
            .iter()
            .map(|row| {
                let pid = row.pid;
                scope.spawn(move || source.cwd_of(pid))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or(None))
            .collect()
    });

    let processes: Vec<RunningProcess> = candidates
        .iter()
        .zip(cwds)
        .map(|(row, cwd)| {
            debug!(
                "Found candidate process: pid={}, cwd={:?}, cpu={:.1}%",
                row.pid, cwd, row.cpu_percent
            );
            RunningProcess {
                pid: row.pid,
                cwd,
                cpu_usage: row.cpu_percent,
            }
        })
        .collect();

    debug!("Process discovery complete: found {} candidate processes", processes.len());
    processes
}
