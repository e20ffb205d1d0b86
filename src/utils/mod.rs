// Utility functions

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

// =============================================================================
// Path Helpers
// =============================================================================

/// Get the .appforge directory under `root` (a project directory or home).
///
/// # Example
/// ```ignore
/// use crate::utils::appforge_dir;
///
/// // Instead of: project_root.join(".appforge")
/// let dir = appforge_dir(&project_root);
/// ```
#[inline]
pub fn appforge_dir(root: &Path) -> PathBuf {
    root.join(".appforge")
}

/// Get the .appforge/config.toml path under `root`.
#[inline]
pub fn config_path(root: &Path) -> PathBuf {
    appforge_dir(root).join("config.toml")
}

/// Directory whose `.appforge/config.toml` applies to a project file.
///
/// A project JSON file lives inside its project directory, so config is
/// looked up next to it. Bare file names resolve to the current directory.
pub fn project_root_for(project_file: &Path) -> PathBuf {
    match project_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

// =============================================================================
// String Helpers
// =============================================================================

/// Truncate a string to at most `max_chars` characters, appending "..." when cut.
/// Never splits a UTF-8 character.
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Split text into pieces of at most `chunk_chars` characters.
/// A size of 0 yields the whole text as one piece.
pub fn split_into_chunks(text: &str, chunk_chars: usize) -> Vec<String> {
    if chunk_chars == 0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for (i, c) in text.chars().enumerate() {
        if i > 0 && i % chunk_chars == 0 {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    chunks.push(current);
    chunks
}

// =============================================================================
// Locking
// =============================================================================

/// Safely acquire a mutex lock, recovering from poisoning by returning the guard.
/// The mutex state may be inconsistent, so use with caution.
pub fn lock_mutex_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Mutex was poisoned, recovering: {}", poisoned);
            poisoned.into_inner()
        }
    }
}
