//! Modification-time helpers.

use std::path::Path;
use std::time::SystemTime;

use filetime::FileTime;

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Modification time with nanosecond precision, `None` if unreadable.
pub fn file_mtime(path: &Path) -> Option<FileTime> {
    path.metadata()
        .ok()
        .map(|m| FileTime::from_last_modification_time(&m))
}

/// Check if `artifact` is at least as new as `source`.
///
/// Returns `false` if either file is missing.
pub fn is_up_to_date(artifact: &Path, source: &Path) -> bool {
    let (Some(artifact), Some(source)) = (get_mtime(artifact), get_mtime(source)) else {
        return false;
    };
    artifact >= source
}

/// Set a file's mtime to now.
pub fn touch(path: &Path) -> std::io::Result<()> {
    filetime::set_file_mtime(path, FileTime::now())
}
