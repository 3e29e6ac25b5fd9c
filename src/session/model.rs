use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a monitored coding session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Waiting,
    Processing,
    Thinking,
}

/// Represents one live session: a session log file bound to the process writing it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub project_name: String,
    pub project_path: String,
    pub file_path: String,
    pub status: SessionStatus,
    pub last_message: Option<String>,
    pub last_message_role: Option<String>,
    /// Modification time of the log file when it was parsed
    pub last_activity_at: DateTime<Utc>,
    pub pid: u32,
    pub cpu_usage: f32,
}

/// A project directory under the session-log root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Encoded directory name
    pub id: String,
    pub name: String,
    pub path: String,
    pub last_activity_date: DateTime<Utc>,
}

/// Internal struct for parsing JSONL records
#[derive(Debug, Deserialize)]
pub(crate) struct LogRecord {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub message: Option<MessageContent>,
}

/// Internal struct for message content
#[derive(Debug, Deserialize)]
pub(crate) struct MessageContent {
    pub role: Option<String>,
    pub content: Option<serde_json::Value>,
}
