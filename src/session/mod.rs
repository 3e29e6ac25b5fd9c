pub mod cache;
pub mod matcher;
pub mod model;
pub mod parser;
pub mod path_codec;
pub mod status;

pub use cache::{CachedSession, SessionLogCache};
pub use matcher::{list_log_files, recent_projects, ScanSettings, SessionMatcher};
pub use model::{Project, SessionSnapshot, SessionStatus};
pub use parser::{parse_log_window, parse_session_file, read_tail, truncate_message, LogSummary};
pub use path_codec::{clean_dir_name, decode_dir_name, encode_path, project_name};
pub use status::{apply_cpu_override, resolve_status, status_sort_priority, StatusEvidence};
