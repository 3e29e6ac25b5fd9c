use log::{debug, info, trace, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::process::{list_candidate_processes, ProcessFilter, ProcessSource, RunningProcess};
use super::cache::SessionLogCache;
use super::model::{Project, SessionSnapshot};
use super::parser::{file_age_secs, parse_session_file, TAIL_WINDOW_BYTES};
use super::path_codec::{clean_dir_name, decode_dir_name, encode_path, project_name};
use super::status::resolve_status;

const SESSION_LOG_EXTENSION: &str = "jsonl";

/// Tunables for a scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanSettings {
    pub tail_window_bytes: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            tail_window_bytes: TAIL_WINDOW_BYTES,
        }
    }
}

/// cwd -> processes running there, in first-seen order so lookups are deterministic
struct CwdIndex<'a> {
    entries: Vec<(String, Vec<&'a RunningProcess>)>,
}

impl<'a> CwdIndex<'a> {
    fn build(processes: &'a [RunningProcess]) -> Self {
        let mut entries: Vec<(String, Vec<&'a RunningProcess>)> = Vec::new();
        for process in processes {
            let Some(cwd) = &process.cwd else {
                warn!("Process pid={} has no cwd, skipping", process.pid);
                continue;
            };
            let cwd = cwd.to_string_lossy().to_string();
            debug!("Mapping process pid={} to cwd={}", process.pid, cwd);
            match entries.iter_mut().find(|(path, _)| *path == cwd) {
                Some((_, procs)) => procs.push(process),
                None => entries.push((cwd, vec![process])),
            }
        }
        CwdIndex { entries }
    }

    fn get(&self, path: &str) -> Option<&[&'a RunningProcess]> {
        self.entries
            .iter()
            .find(|(cwd, _)| cwd == path)
            .map(|(_, procs)| procs.as_slice())
    }

    /// First cwd whose encoding equals the directory name (leading dash ignored)
    fn find_encoded(&self, dir_name: &str) -> Option<(&str, &[&'a RunningProcess])> {
        let clean_name = clean_dir_name(dir_name);
        self.entries
            .iter()
            .find(|(cwd, _)| encode_path(cwd) == clean_name)
            .map(|(cwd, procs)| (cwd.as_str(), procs.as_slice()))
    }
}

/// Subdirectories of the session-log root as (name, path, mtime), sorted by name
fn list_project_dirs(root: &Path) -> Vec<(String, PathBuf, SystemTime)> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read session-log root {:?}: {}", root, e);
            return Vec::new();
        }
    };

    let mut dirs: Vec<_> = entries
        .flatten()
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            if !metadata.is_dir() {
                return None;
            }
            let name = entry.file_name().to_str()?.to_string();
            let modified = metadata.modified().ok()?;
            Some((name, entry.path(), modified))
        })
        .collect();

    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    dirs
}

/// Get JSONL files for a project, sorted by modification time (newest first)
pub fn list_log_files(project_dir: &Path) -> Vec<(PathBuf, SystemTime)> {
    let mut jsonl_files: Vec<_> = fs::read_dir(project_dir)
        .into_iter()
        .flatten()
        .flatten()
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == SESSION_LOG_EXTENSION)
                .unwrap_or(false)
        })
        .filter_map(|e| {
            let metadata = e.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            Some((e.path(), metadata.modified().ok()?))
        })
        .collect();

    jsonl_files.sort_by(|a, b| b.1.cmp(&a.1));
    jsonl_files
}

/// List project directories under `root` with their decoded paths, newest first.
/// A missing or unreadable root yields an empty list.
pub fn recent_projects(root: &Path) -> Vec<Project> {
    if !root.exists() {
        debug!("Session-log root does not exist: {:?}", root);
        return Vec::new();
    }

    let mut projects: Vec<Project> = list_project_dirs(root)
        .into_iter()
        .map(|(dir_name, _, modified)| {
            let path = decode_dir_name(&dir_name);
            Project {
                name: project_name(&path),
                id: dir_name,
                path,
                last_activity_date: modified.into(),
            }
        })
        .collect();

    projects.sort_by(|a, b| b.last_activity_date.cmp(&a.last_activity_date));
    projects
}

/// Matches live assistant processes to the session logs they are writing.
///
/// Owns the parse cache, so it must not run two scans at once; `SessionMonitor`
/// enforces that for shared use.
pub struct SessionMatcher<S: ProcessSource> {
    source: S,
    projects_root: PathBuf,
    filter: ProcessFilter,
    settings: ScanSettings,
    cache: SessionLogCache,
}

impl<S: ProcessSource> SessionMatcher<S> {
    pub fn new(source: S, projects_root: PathBuf) -> Self {
        SessionMatcher {
            source,
            projects_root,
            filter: ProcessFilter::default(),
            settings: ScanSettings::default(),
            cache: SessionLogCache::new(),
        }
    }

    pub fn with_filter(mut self, filter: ProcessFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_settings(mut self, settings: ScanSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn projects_root(&self) -> &Path {
        &self.projects_root
    }

    pub fn cache(&self) -> &SessionLogCache {
        &self.cache
    }

    pub fn recent_projects(&self) -> Vec<Project> {
        recent_projects(&self.projects_root)
    }

    /// Full scan: discover processes, then match them to session logs
    pub fn active_sessions(&mut self) -> Vec<SessionSnapshot> {
        let processes = list_candidate_processes(&mut self.source, &self.filter);
        self.match_sessions(&processes)
    }

    /// Match an already-discovered process list to session logs, newest activity first
    pub fn match_sessions(&mut self, processes: &[RunningProcess]) -> Vec<SessionSnapshot> {
        info!("=== Matching {} processes to sessions ===", processes.len());

        let mut sessions = Vec::new();
        if processes.is_empty() {
            return sessions;
        }

        let cwd_index = CwdIndex::build(processes);

        if !self.projects_root.exists() {
            warn!("Session-log root does not exist: {:?}", self.projects_root);
            return sessions;
        }

        for (dir_name, dir_path, _) in list_project_dirs(&self.projects_root) {
            let mut project_path = decode_dir_name(&dir_name);
            trace!("Checking project: {} -> {}", dir_name, project_path);

            // Exact match first, then encode each live cwd and compare
            let matching_processes = match cwd_index.get(&project_path) {
                Some(procs) => {
                    debug!("Project {} has {} active processes (exact match)", project_path, procs.len());
                    procs
                }
                None => match cwd_index.find_encoded(&dir_name) {
                    Some((cwd, procs)) => {
                        debug!("Project {} matched via reverse lookup to cwd {}", dir_name, cwd);
                        project_path = cwd.to_string();
                        procs
                    }
                    None => {
                        trace!("Project {} has no active processes, skipping", project_path);
                        continue;
                    }
                },
            };

            let jsonl_files = list_log_files(&dir_path);
            debug!("Found {} JSONL files for project {}", jsonl_files.len(), project_path);

            let mut used_files: HashSet<usize> = HashSet::new();
            for process in matching_processes {
                match self.session_for_process(&jsonl_files, &mut used_files, &project_path, process) {
                    Some(session) => {
                        info!(
                            "Session matched: id={}, project={}, status={:?}, pid={}, cpu={:.1}%",
                            session.session_id, session.project_name, session.status, session.pid, session.cpu_usage
                        );
                        sessions.push(session);
                    }
                    None => {
                        debug!("No session file left for process pid={} in project {}", process.pid, project_path);
                    }
                }
            }
        }

        sessions.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));

        info!("=== Session scan complete: {} total ===", sessions.len());
        sessions
    }

    /// Claim the newest unused log file that parses as a session
    fn session_for_process(
        &mut self,
        jsonl_files: &[(PathBuf, SystemTime)],
        used_files: &mut HashSet<usize>,
        project_path: &str,
        process: &RunningProcess,
    ) -> Option<SessionSnapshot> {
        for (index, (path, modified)) in jsonl_files.iter().enumerate() {
            if used_files.contains(&index) {
                continue;
            }

            let session = match self.cache.get(path, *modified) {
                Some(cached) => {
                    trace!("Cache hit for {:?}", path);
                    let mut snapshot = cached.snapshot.clone();
                    snapshot.pid = process.pid;
                    snapshot.cpu_usage = process.cpu_usage;
                    snapshot.status =
                        resolve_status(&cached.evidence, file_age_secs(*modified), process.cpu_usage);
                    Some(snapshot)
                }
                None => parse_session_file(
                    path,
                    *modified,
                    project_path,
                    process,
                    self.settings.tail_window_bytes,
                )
                .map(|parsed| {
                    let snapshot = parsed.snapshot.clone();
                    self.cache.put(path, *modified, parsed);
                    snapshot
                }),
            };

            if let Some(snapshot) = session {
                used_files.insert(index);
                return Some(snapshot);
            }
        }
        None
    }
}
