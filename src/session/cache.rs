use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::model::SessionSnapshot;
use super::status::StatusEvidence;

/// What a parse of one log file produced
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSession {
    pub snapshot: SessionSnapshot,
    pub evidence: StatusEvidence,
}

/// Per-file parse cache keyed by absolute path.
///
/// An entry is only returned while the file's modification time matches the one
/// recorded at parse time. There is no eviction: the working set is bounded by the
/// number of session files on disk.
#[derive(Debug, Default)]
pub struct SessionLogCache {
    modified: HashMap<PathBuf, SystemTime>,
    sessions: HashMap<PathBuf, CachedSession>,
}

impl SessionLogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path, mtime: SystemTime) -> Option<&CachedSession> {
        if self.modified.get(path) != Some(&mtime) {
            return None;
        }
        self.sessions.get(path)
    }

    pub fn put(&mut self, path: &Path, mtime: SystemTime, entry: CachedSession) {
        self.modified.insert(path.to_path_buf(), mtime);
        self.sessions.insert(path.to_path_buf(), entry);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
