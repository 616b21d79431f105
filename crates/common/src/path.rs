//! Helpers for absolute, slash-separated catalog paths
//!
//! Catalog paths always start with `/` and never end with one, except the
//! root itself.

pub const ROOT: &str = "/";
pub const SEPARATOR: char = '/';

/// Normalize a path to the canonical catalog form
pub fn normalize(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() || path == ROOT {
        return ROOT.to_string();
    }

    let mut normalized = if path.starts_with(SEPARATOR) {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    while normalized.len() > 1 && normalized.ends_with(SEPARATOR) {
        normalized.pop();
    }

    normalized
}

/// Parent directory of a path; the root is its own parent
pub fn parent(path: &str) -> String {
    let normalized = normalize(path);
    match normalized.rfind(SEPARATOR) {
        Some(0) | None => ROOT.to_string(),
        Some(pos) => normalized[..pos].to_string(),
    }
}

/// Last component of a path, empty for the root
pub fn file_name(path: &str) -> &str {
    let path = path.trim_end_matches(SEPARATOR);
    match path.rfind(SEPARATOR) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Join a directory path and a single child name
pub fn join(dir: &str, name: &str) -> String {
    let dir = normalize(dir);
    if dir == ROOT {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Extension of the last path component, without the dot
pub fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    match name.rfind('.') {
        // hidden files like ".csv" have no extension
        Some(0) | None => None,
        Some(pos) => Some(&name[pos + 1..]),
    }
}

/// Prefix every immediate child of `dir` starts with
pub fn child_prefix(dir: &str) -> String {
    let dir = normalize(dir);
    if dir == ROOT {
        dir
    } else {
        format!("{}/", dir)
    }
}
