// Path helpers: user input expansion and lexical normalization.
use crate::log_warn;
use colored::Colorize;
use std::path::{Component, Path, PathBuf};

/// Resolves a user-supplied path, expanding a leading `~` and `$VARS`.
///
/// Falls back to plain tilde expansion if an environment variable is undefined, so
/// a literal `$` in a path does not make the whole path unusable.
///
/// # Arguments
/// * `path`: the path as typed on the command line or read from the environment.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            log_warn!(
                "[Paths] Could not expand variables in {}: {}. Expanding '~' only.",
                path.yellow(),
                e
            );
            expand_tilde(path)
        }
    }
}

/// Expands a leading `~` to the home directory; anything else is returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return PathBuf::from(path.replacen('~', &home.to_string_lossy(), 1));
        }
    }
    PathBuf::from(path)
}

/// Lexically removes `.` and resolves `..` against preceding components.
///
/// Does not touch the filesystem, so it works for paths that do not exist yet
/// (a fallback script that may be added after installation).
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
