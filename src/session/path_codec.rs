//! Conversion between project paths and the directory names used under the
//! session-log root.
//!
//! The encoding replaces every `/` with `-`, so a path component that itself
//! contains `-` cannot be told apart from a separator. `decode_dir_name` is
//! therefore only an inverse of `encode_path` for paths without dashes; the
//! matcher resolves the ambiguity by encoding live process CWDs and comparing.

const DELIMITER: char = '-';
const SEPARATOR: char = '/';

/// Convert a directory name like "-Users-ozan-Projects-app" back to "/Users/ozan/Projects/app"
pub fn decode_dir_name(dir_name: &str) -> String {
    let name = clean_dir_name(dir_name);
    let parts: Vec<&str> = name.split(DELIMITER).collect();
    format!("{}{}", SEPARATOR, parts.join(&SEPARATOR.to_string()))
}

/// Convert a path like "/Users/ozan/Projects/app" to "Users-ozan-Projects-app".
/// No leading dash is added; compare against `clean_dir_name` of the on-disk name.
pub fn encode_path(path: &str) -> String {
    let path = path.strip_prefix(SEPARATOR).unwrap_or(path);
    path.split(SEPARATOR)
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string())
}

/// Strip a single leading dash from an encoded directory name
pub fn clean_dir_name(dir_name: &str) -> &str {
    dir_name.strip_prefix(DELIMITER).unwrap_or(dir_name)
}

/// Extract the display name (last path component) from a project path
pub fn project_name(project_path: &str) -> String {
    project_path
        .split(SEPARATOR)
        .filter(|s| !s.is_empty())
        .last()
        .unwrap_or("Unknown")
        .to_string()
}
