//! Discovers locally running AI coding-assistant sessions by observing OS processes
//! and the session logs they append to. Read-only and best-effort: every public
//! operation returns a (possibly empty) result instead of an error.

pub mod config;
pub mod monitor;
pub mod process;
pub mod session;

#[cfg(test)]
mod tests;

pub use config::{load_config, MonitorConfig, ProcessBackend};
pub use monitor::{spawn_poller, PollerHandle, SessionMonitor};
pub use process::{ProcessFilter, ProcessRow, ProcessSource, RunningProcess};
pub use session::{Project, SessionMatcher, SessionSnapshot, SessionStatus};

/// Initialize env_logger once; `RUST_LOG` overrides the given default filter
pub fn init_logging(default_filter: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init();
}
