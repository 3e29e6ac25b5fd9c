use clap::ValueEnum;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::process::{ProcessFilter, ProcessSource, PsSource, SysinfoSource};
use crate::session::parser::TAIL_WINDOW_BYTES;

/// Which process listing implementation to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProcessBackend {
    #[default]
    Sysinfo,
    Ps,
}

// ---------------------------------------------------------------------------
// Config file schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorConfig {
    /// Directory holding one subdirectory per project; `~/.claude/projects` when unset
    pub projects_root: Option<PathBuf>,
    pub poll_interval_secs: u64,
    pub command_timeout_ms: u64,
    pub tail_window_bytes: u64,
    pub process_markers: Vec<String>,
    pub exclude_markers: Vec<String>,
    pub process_backend: ProcessBackend,
}

pub fn default_process_markers() -> Vec<String> {
    vec!["claude".to_string()]
}

pub fn default_exclude_markers() -> Vec<String> {
    ["electron", "agent-sessions", "agent-management", "claude-sessions"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            projects_root: None,
            poll_interval_secs: 5,
            command_timeout_ms: 2000,
            tail_window_bytes: TAIL_WINDOW_BYTES,
            process_markers: default_process_markers(),
            exclude_markers: default_exclude_markers(),
            process_backend: ProcessBackend::default(),
        }
    }
}

impl MonitorConfig {
    /// Session-log root, falling back to `~/.claude/projects`
    pub fn projects_root(&self) -> PathBuf {
        self.projects_root.clone().unwrap_or_else(default_projects_root)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn process_filter(&self) -> ProcessFilter {
        ProcessFilter::new(self.process_markers.clone(), self.exclude_markers.clone())
    }

    pub fn process_source(&self) -> Box<dyn ProcessSource> {
        match self.process_backend {
            ProcessBackend::Sysinfo => Box::new(SysinfoSource::new()),
            ProcessBackend::Ps => Box::new(PsSource::new(self.command_timeout())),
        }
    }
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

pub fn default_projects_root() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".claude").join("projects"))
        .unwrap_or_default()
}

/// `~/.agent-sessions/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".agent-sessions").join("config.json"))
}

/// Read the monitor config from `path`, or the default location.
/// Returns the default config on missing file or parse errors.
pub fn load_config(path: Option<&Path>) -> MonitorConfig {
    let config_path = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(p) => p,
        None => return MonitorConfig::default(),
    };

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(_) => return MonitorConfig::default(),
    };

    match serde_json::from_str::<MonitorConfig>(&content) {
        Ok(config) => {
            debug!("Loaded monitor config from {:?}", config_path);
            config
        }
        Err(e) => {
            warn!("Failed to parse {:?}, using defaults: {}", config_path, e);
            MonitorConfig::default()
        }
    }
}
