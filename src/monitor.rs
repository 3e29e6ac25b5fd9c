use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::MonitorConfig;
use crate::process::ProcessSource;
use crate::session::{recent_projects, Project, ScanSettings, SessionMatcher, SessionSnapshot};

/// Shareable front of the session engine.
///
/// Scans are serialized: the matcher (and its cache) sits behind a mutex, so two
/// scans never run at once. Callers that must not wait use `try_get_active_sessions`.
pub struct SessionMonitor<S: ProcessSource = Box<dyn ProcessSource>> {
    matcher: Mutex<SessionMatcher<S>>,
    projects_root: PathBuf,
}

impl SessionMonitor {
    pub fn from_config(config: &MonitorConfig) -> Self {
        let matcher = SessionMatcher::new(config.process_source(), config.projects_root())
            .with_filter(config.process_filter())
            .with_settings(ScanSettings {
                tail_window_bytes: config.tail_window_bytes,
            });
        SessionMonitor::new(matcher)
    }
}

impl<S: ProcessSource> SessionMonitor<S> {
    pub fn new(matcher: SessionMatcher<S>) -> Self {
        let projects_root = matcher.projects_root().to_path_buf();
        SessionMonitor {
            matcher: Mutex::new(matcher),
            projects_root,
        }
    }

    // A panic mid-scan leaves at worst a stale cache entry; keep serving.
    fn lock(&self) -> MutexGuard<'_, SessionMatcher<S>> {
        self.matcher.lock().unwrap_or_else(|poisoned| {
            warn!("Session matcher lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Run a full scan, waiting for any scan already in flight to finish first
    pub fn get_active_sessions(&self) -> Vec<SessionSnapshot> {
        self.lock().active_sessions()
    }

    /// Run a full scan unless one is already running, in which case return None
    pub fn try_get_active_sessions(&self) -> Option<Vec<SessionSnapshot>> {
        let mut matcher = match self.matcher.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return None,
            Err(TryLockError::Poisoned(poisoned)) => {
                warn!("Session matcher lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        Some(matcher.active_sessions())
    }

    /// Project directories under the session-log root, newest first. Does not scan processes.
    pub fn get_recent_projects(&self) -> Vec<Project> {
        recent_projects(&self.projects_root)
    }
}

/// Handle to a background polling thread; stops the thread when dropped
pub struct PollerHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Signal the poller and wait for its current tick to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Scan every `interval` on a background thread and hand each result to `on_scan`.
/// The first scan runs immediately. A tick that finds a scan already running is skipped.
pub fn spawn_poller<S, F>(
    monitor: Arc<SessionMonitor<S>>,
    interval: Duration,
    mut on_scan: F,
) -> PollerHandle
where
    S: ProcessSource + 'static,
    F: FnMut(Vec<SessionSnapshot>) + Send + 'static,
{
    let (stop_tx, stop_rx) = mpsc::channel::<()>();

    let thread = thread::spawn(move || {
        info!("Session poller started (interval {:?})", interval);
        loop {
            match monitor.try_get_active_sessions() {
                Some(sessions) => on_scan(sessions),
                None => debug!("Scan still in flight, skipping tick"),
            }

            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("Session poller stopped");
    });

    PollerHandle {
        stop_tx: Some(stop_tx),
        thread: Some(thread),
    }
}
