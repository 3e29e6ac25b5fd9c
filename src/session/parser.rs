use log::{debug, trace, warn};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::SystemTime;

use crate::process::RunningProcess;
use super::cache::CachedSession;
use super::model::{LogRecord, SessionSnapshot};
use super::path_codec::project_name;
use super::status::{has_tool_use, last_text_block, resolve_status, StatusEvidence};

/// Default number of bytes read from the end of a session log
pub const TAIL_WINDOW_BYTES: u64 = 50 * 1024;

/// Longest message preview kept on a snapshot, in characters
pub const MESSAGE_PREVIEW_CHARS: usize = 150;

/// What a tail window of a session log says about the session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogSummary {
    pub session_id: String,
    pub last_record_kind: Option<String>,
    pub last_role: Option<String>,
    pub last_message: Option<String>,
    pub had_tool_use: bool,
}

impl LogSummary {
    pub fn evidence(&self) -> StatusEvidence {
        StatusEvidence {
            last_record_kind: self.last_record_kind.clone(),
            had_tool_use: self.had_tool_use,
        }
    }
}

/// Read at most the last `window_bytes` of a file.
/// Invalid UTF-8 (a multi-byte char cut by the window start) is replaced, not rejected.
pub fn read_tail(path: &Path, window_bytes: u64) -> io::Result<String> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let start = len.saturating_sub(window_bytes);
    file.seek(SeekFrom::Start(start))?;

    let mut buf = Vec::with_capacity((len - start) as usize);
    file.take(window_bytes).read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Truncate a message preview to 150 characters (respecting UTF-8 char boundaries)
pub fn truncate_message(message: &str) -> String {
    if message.chars().count() > MESSAGE_PREVIEW_CHARS {
        format!(
            "{}...",
            message.chars().take(MESSAGE_PREVIEW_CHARS).collect::<String>()
        )
    } else {
        message.to_string()
    }
}

fn carries_content(content: &serde_json::Value) -> bool {
    match content {
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Scan the records of a log window in order.
/// Returns None when no session id appears anywhere in the window.
pub fn parse_log_window(text: &str) -> Option<LogSummary> {
    let mut session_id: Option<String> = None;
    let mut summary = LogSummary::default();
    let mut skipped = 0usize;

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let record = match serde_json::from_str::<LogRecord>(line) {
            Ok(record) => record,
            Err(_) => {
                // Partial first line of the window, or a line still being written
                skipped += 1;
                continue;
            }
        };

        if session_id.is_none() {
            session_id = record.session_id.filter(|id| !id.is_empty());
        }
        if record.record_type.is_some() {
            summary.last_record_kind = record.record_type;
        }

        let Some(message) = record.message else {
            continue;
        };
        let Some(content) = message.content.as_ref().filter(|c| carries_content(c)) else {
            continue;
        };

        summary.last_role = message.role;
        match content {
            serde_json::Value::String(s) => {
                summary.last_message = Some(s.clone());
                summary.had_tool_use = false;
            }
            serde_json::Value::Array(_) => {
                summary.had_tool_use = has_tool_use(content);
                if let Some(text) = last_text_block(content) {
                    summary.last_message = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    if skipped > 0 {
        trace!("Skipped {} unparsable lines in log window", skipped);
    }

    summary.session_id = session_id?;
    summary.last_message = summary.last_message.as_deref().map(truncate_message);
    Some(summary)
}

/// Seconds since `modified`; a timestamp in the future counts as "just now"
pub fn file_age_secs(modified: SystemTime) -> f64 {
    SystemTime::now()
        .duration_since(modified)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Parse a JSONL session file and create a snapshot bound to `process`
pub fn parse_session_file(
    jsonl_path: &Path,
    modified: SystemTime,
    project_path: &str,
    process: &RunningProcess,
    window_bytes: u64,
) -> Option<CachedSession> {
    debug!("Parsing JSONL file: {:?}", jsonl_path);

    let text = match read_tail(jsonl_path, window_bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to read {:?}: {}", jsonl_path, e);
            return None;
        }
    };

    let Some(summary) = parse_log_window(&text) else {
        debug!("No session id in {:?}, not a session file", jsonl_path);
        return None;
    };

    let evidence = summary.evidence();
    let file_age = file_age_secs(modified);
    let status = resolve_status(&evidence, file_age, process.cpu_usage);

    debug!(
        "Status determination: kind={:?}, tool_use={}, file_age={:.1}s, cpu={:.1}% -> {:?}",
        evidence.last_record_kind, evidence.had_tool_use, file_age, process.cpu_usage, status
    );

    let snapshot = SessionSnapshot {
        session_id: summary.session_id,
        project_name: project_name(project_path),
        project_path: project_path.to_string(),
        file_path: jsonl_path.to_string_lossy().to_string(),
        status,
        last_message: summary.last_message,
        last_message_role: summary.last_role,
        last_activity_at: modified.into(),
        pid: process.pid,
        cpu_usage: process.cpu_usage,
    };

    Some(CachedSession { snapshot, evidence })
}
