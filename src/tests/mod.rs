mod monitor_tests;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use crate::process::{ProcessFilter, ProcessRow, ProcessSource};

/// In-memory process table. Clones share the table, so a test can change CPU
/// samples after handing the source to a matcher.
#[derive(Clone, Default)]
pub(crate) struct FakeProcessSource {
    table: Arc<Mutex<Vec<(ProcessRow, Option<PathBuf>)>>>,
}

impl FakeProcessSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, pid: u32, command: &str, cwd: Option<&str>, cpu: f32) {
        self.add_with_parent(pid, None, command, cwd, cpu);
    }

    pub(crate) fn add_with_parent(
        &self,
        pid: u32,
        parent_pid: Option<u32>,
        command: &str,
        cwd: Option<&str>,
        cpu: f32,
    ) {
        let row = ProcessRow {
            pid,
            parent_pid,
            cpu_percent: cpu,
            command: command.to_string(),
        };
        self.table
            .lock()
            .unwrap()
            .push((row, cwd.map(PathBuf::from)));
    }

    pub(crate) fn clear(&self) {
        self.table.lock().unwrap().clear();
    }

    pub(crate) fn set_cpu(&self, pid: u32, cpu: f32) {
        let mut table = self.table.lock().unwrap();
        for (row, _) in table.iter_mut().filter(|(row, _)| row.pid == pid) {
            row.cpu_percent = cpu;
        }
    }
}

impl ProcessSource for FakeProcessSource {
    fn list_processes(&mut self) -> Vec<ProcessRow> {
        self.table
            .lock()
            .unwrap()
            .iter()
            .map(|(row, _)| row.clone())
            .collect()
    }

    fn cwd_of(&self, pid: u32) -> Option<PathBuf> {
        self.table
            .lock()
            .unwrap()
            .iter()
            .find(|(row, _)| row.pid == pid)
            .and_then(|(_, cwd)| cwd.clone())
    }
}

/// Filter matching "claude" commands that never excludes a fake pid as our own
pub(crate) fn test_filter() -> ProcessFilter {
    let mut filter = ProcessFilter::new(vec!["claude".to_string()], vec!["electron".to_string()]);
    filter.self_pid = 0;
    filter
}

pub(crate) fn write_jsonl(path: &Path, lines: &[&str]) {
    let mut file = fs::File::create(path).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
}

/// Set a file's (or directory's) mtime to `secs_ago` seconds in the past
pub(crate) fn age_path(path: &Path, secs_ago: u64) -> SystemTime {
    let when = SystemTime::now() - Duration::from_secs(secs_ago);
    filetime::set_file_mtime(path, filetime::FileTime::from_system_time(when)).unwrap();
    fs::metadata(path).unwrap().modified().unwrap()
}

/// Write a session log into `dir` and age it
pub(crate) fn write_session(dir: &Path, file_name: &str, lines: &[&str], secs_ago: u64) -> PathBuf {
    let path = dir.join(file_name);
    write_jsonl(&path, lines);
    age_path(&path, secs_ago);
    path
}
