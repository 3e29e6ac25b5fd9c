use crate::config::MonitorConfig;
use crate::monitor::{spawn_poller, SessionMonitor};
use crate::process::{ProcessRow, ProcessSource};
use crate::session::{SessionMatcher, SessionStatus};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

use super::{test_filter, write_session, FakeProcessSource};

const WAIT: Duration = Duration::from_secs(5);

/// Source whose listing blocks until the test releases it
struct BlockingSource {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl ProcessSource for BlockingSource {
    fn list_processes(&mut self) -> Vec<ProcessRow> {
        let _ = self.entered.get_mut().unwrap().send(());
        let _ = self.release.get_mut().unwrap().recv_timeout(WAIT);
        Vec::new()
    }

    fn cwd_of(&self, _pid: u32) -> Option<PathBuf> {
        None
    }
}

fn monitor_with_session(root: &TempDir) -> SessionMonitor<FakeProcessSource> {
    let dir = root.path().join("-work-alpha");
    fs::create_dir_all(&dir).unwrap();
    write_session(
        &dir,
        "a.jsonl",
        &[r#"{"sessionId":"polled","type":"user","message":{"role":"user","content":"hi"}}"#],
        10,
    );

    let source = FakeProcessSource::new();
    source.add(1001, "claude", Some("/work/alpha"), 0.0);
    SessionMonitor::new(
        SessionMatcher::new(source, root.path().to_path_buf()).with_filter(test_filter()),
    )
}

#[test]
fn test_try_scan_skips_while_scan_in_flight() {
    let root = TempDir::new().unwrap();
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let source = BlockingSource {
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    };
    let monitor = Arc::new(SessionMonitor::new(SessionMatcher::new(
        source,
        root.path().to_path_buf(),
    )));

    let scanning = Arc::clone(&monitor);
    let scan = thread::spawn(move || scanning.get_active_sessions());
    entered_rx.recv_timeout(WAIT).unwrap();

    assert!(monitor.try_get_active_sessions().is_none());

    release_tx.send(()).unwrap();
    assert!(scan.join().unwrap().is_empty());

    // Free again: the next attempt runs
    release_tx.send(()).unwrap();
    assert!(monitor.try_get_active_sessions().is_some());
}

#[test]
fn test_monitor_scans_and_lists_projects() {
    let root = TempDir::new().unwrap();
    let monitor = monitor_with_session(&root);

    let sessions = monitor.get_active_sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].session_id, "polled");

    let projects = monitor.get_recent_projects();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].id, "-work-alpha");
    assert_eq!(projects[0].path, "/work/alpha");
}

#[test]
fn test_poller_delivers_scans_until_stopped() {
    let root = TempDir::new().unwrap();
    let monitor = Arc::new(monitor_with_session(&root));
    let (tx, rx) = mpsc::channel();

    let handle = spawn_poller(monitor, Duration::from_millis(20), move |sessions| {
        let _ = tx.send(sessions);
    });

    for _ in 0..3 {
        let sessions = rx.recv_timeout(WAIT).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].pid, 1001);
    }

    handle.stop();

    // The callback (and its sender) is gone once the thread has exited
    let disconnected = loop {
        match rx.recv_timeout(WAIT) {
            Ok(_) => continue,
            Err(e) => break e,
        }
    };
    assert_eq!(disconnected, RecvTimeoutError::Disconnected);
}

#[test]
fn test_dropping_poller_handle_stops_thread() {
    let root = TempDir::new().unwrap();
    let monitor = Arc::new(monitor_with_session(&root));
    let (tx, rx) = mpsc::channel();

    let handle = spawn_poller(Arc::clone(&monitor), Duration::from_secs(60), move |sessions| {
        let _ = tx.send(sessions);
    });
    // First scan runs immediately
    assert_eq!(rx.recv_timeout(WAIT).unwrap().len(), 1);

    drop(handle);
    assert_eq!(rx.recv_timeout(WAIT).unwrap_err(), RecvTimeoutError::Disconnected);
    // The monitor is still usable after the poller is gone
    assert_eq!(monitor.get_active_sessions().len(), 1);
}

#[test]
fn test_monitor_from_config_with_empty_root() {
    let root = TempDir::new().unwrap();
    let config = MonitorConfig {
        projects_root: Some(root.path().to_path_buf()),
        ..MonitorConfig::default()
    };

    let monitor = SessionMonitor::from_config(&config);
    assert!(monitor.get_recent_projects().is_empty());
    assert!(monitor.get_active_sessions().is_empty());
}

#[test]
fn test_active_sessions_are_in_recency_order_not_status_order() {
    let root = TempDir::new().unwrap();
    let quiet = root.path().join("-work-quiet");
    let waiting = root.path().join("-work-waiting");
    fs::create_dir_all(&quiet).unwrap();
    fs::create_dir_all(&waiting).unwrap();
    write_session(
        &quiet,
        "q.jsonl",
        &[r#"{"sessionId":"newer-idle","type":"assistant","message":{"role":"assistant","content":"done"}}"#],
        10,
    );
    write_session(
        &waiting,
        "w.jsonl",
        &[r#"{"sessionId":"older-waiting","type":"user","message":{"role":"user","content":"next?"}}"#],
        60,
    );

    let source = FakeProcessSource::new();
    source.add(1, "claude", Some("/work/waiting"), 0.0);
    source.add(2, "claude", Some("/work/quiet"), 0.0);
    let monitor = SessionMonitor::new(
        SessionMatcher::new(source, root.path().to_path_buf()).with_filter(test_filter()),
    );

    let sessions = monitor.get_active_sessions();
    let ids: Vec<&str> = sessions.iter().map(|s| s.session_id.as_str()).collect();
    assert_eq!(ids, vec!["newer-idle", "older-waiting"]);
    assert_eq!(sessions[0].status, SessionStatus::Idle);
    assert_eq!(sessions[1].status, SessionStatus::Waiting);
}
