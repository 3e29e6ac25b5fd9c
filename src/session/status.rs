use super::model::SessionStatus;

/// A log file touched within this many seconds is considered actively written
pub const RECENT_WRITE_SECS: f64 = 3.0;

/// CPU usage above this turns a waiting session into a processing one
pub const BUSY_CPU_PERCENT: f32 = 5.0;

/// What the parser observed in the log window that status depends on.
/// Cached next to the snapshot so status can be re-resolved without re-reading the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusEvidence {
    /// `type` of the most recent record that had one
    pub last_record_kind: Option<String>,
    /// The most recent content-bearing message carried a tool_use block
    pub had_tool_use: bool,
}

/// Check if message content contains a tool_use block
pub fn has_tool_use(content: &serde_json::Value) -> bool {
    if let serde_json::Value::Array(arr) = content {
        arr.iter().any(|item| block_type(item) == Some("tool_use"))
    } else {
        false
    }
}

/// Text of the last `text` block in a content array
pub fn last_text_block(content: &serde_json::Value) -> Option<&str> {
    match content {
        serde_json::Value::Array(arr) => arr
            .iter()
            .rev()
            .filter(|item| block_type(item) == Some("text"))
            .find_map(|item| item.get("text").and_then(|t| t.as_str())),
        _ => None,
    }
}

fn block_type(item: &serde_json::Value) -> Option<&str> {
    item.get("type").and_then(|t| t.as_str())
}

/// Returns sort priority for status (lower = higher priority in list)
/// Active sessions (thinking/processing) appear first, then waiting, then idle
pub fn status_sort_priority(status: &SessionStatus) -> u8 {
    match status {
        SessionStatus::Thinking => 0,
        SessionStatus::Processing => 0,
        SessionStatus::Waiting => 1,
        SessionStatus::Idle => 2,
    }
}

/// A waiting session whose process is burning CPU is working, it just hasn't written yet
pub fn apply_cpu_override(status: SessionStatus, cpu_usage: f32) -> SessionStatus {
    if status == SessionStatus::Waiting && cpu_usage > BUSY_CPU_PERCENT {
        SessionStatus::Processing
    } else {
        status
    }
}

/// Determine session status from log evidence, file age and CPU usage
///
/// Precedence:
/// - file written within 3s -> Processing, whatever the records say
/// - latest message requested a tool -> Thinking
/// - last record is a user record and the file is quiet -> Waiting (assistant owes a reply)
/// - otherwise -> Idle
///
/// and finally Waiting is promoted to Processing when CPU is above 5%.
pub fn resolve_status(
    evidence: &StatusEvidence,
    seconds_since_modified: f64,
    cpu_usage: f32,
) -> SessionStatus {
    let recently_modified = seconds_since_modified < RECENT_WRITE_SECS;

    let status = if recently_modified {
        SessionStatus::Processing
    } else if evidence.had_tool_use {
        SessionStatus::Thinking
    } else if evidence.last_record_kind.as_deref() == Some("user") {
        SessionStatus::Waiting
    } else {
        SessionStatus::Idle
    };

    apply_cpu_override(status, cpu_usage)
}
