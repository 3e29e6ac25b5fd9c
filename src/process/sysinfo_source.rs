use log::{debug, trace};
use std::path::PathBuf;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System, UpdateKind};

use super::{ProcessRow, ProcessSource};

fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::new()
        .with_cmd(UpdateKind::Always)
        .with_cwd(UpdateKind::Always)
        .with_cpu()
}

/// Process listing through the `sysinfo` crate.
///
/// The `System` is reused across scans: CPU usage is a delta between two refreshes,
/// so the first scan reports 0% for every process.
pub struct SysinfoSource {
    system: System,
}

impl SysinfoSource {
    pub fn new() -> Self {
        debug!("Initializing new System instance");
        SysinfoSource {
            system: System::new_with_specifics(RefreshKind::new().with_processes(refresh_kind())),
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SysinfoSource {
    fn list_processes(&mut self) -> Vec<ProcessRow> {
        self.system
            .refresh_processes_specifics(ProcessesToUpdate::All, refresh_kind());

        trace!("Total system processes: {}", self.system.processes().len());

        // HashMap order; sort to match `ps` (ascending pid)
        let mut rows: Vec<ProcessRow> = self
            .system
            .processes()
            .iter()
            .map(|(pid, process)| {
                let cmd: Vec<String> = process
                    .cmd()
                    .iter()
                    .map(|s| s.to_string_lossy().to_string())
                    .collect();
                let command = if cmd.is_empty() {
                    process.name().to_string_lossy().to_string()
                } else {
                    cmd.join(" ")
                };
                ProcessRow {
                    pid: pid.as_u32(),
                    parent_pid: process.parent().map(|p| p.as_u32()),
                    cpu_percent: process.cpu_usage(),
                    command,
                }
            })
            .collect();
        rows.sort_by_key(|row| row.pid);
        rows
    }

    fn cwd_of(&self, pid: u32) -> Option<PathBuf> {
        self.system
            .process(Pid::from_u32(pid))
            .and_then(|process| process.cwd())
            .map(|cwd| cwd.to_path_buf())
    }
}
