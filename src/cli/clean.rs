//! `clean` command: external garbage collection for the cache directory.
//!
//! Superseded artifacts are never removed by the pipeline itself.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::log;

/// Remove every file directly under `cache`. Returns what was (or, with
/// `dry`, would be) removed.
pub fn clean(cache: &Path, dry: bool) -> Result<Vec<PathBuf>> {
    if !cache.exists() {
        log!("clean"; "{} does not exist, nothing to do", cache.display());
        return Ok(Vec::new());
    }

    let mut removed = Vec::new();
    for entry in fs::read_dir(cache).with_context(|| format!("failed to read {}", cache.display()))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if !dry {
            fs::remove_file(&path).with_context(|| format!("failed to remove {}", path.display()))?;
        }
        removed.push(path);
    }

    let verb = if dry { "would remove" } else { "removed" };
    log!("clean"; "{} {} file(s) from {}", verb, removed.len(), cache.display());
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_removes_files_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.css"), "").unwrap();
        fs::write(dir.path().join("b.js"), "").unwrap();
        fs::create_dir(dir.path().join("keep")).unwrap();

        let listed = clean(dir.path(), true).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(dir.path().join("a.css").exists());

        clean(dir.path(), false).unwrap();
        assert!(!dir.path().join("a.css").exists());
        assert!(dir.path().join("keep").exists());
    }

    #[test]
    fn test_clean_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(clean(&dir.path().join("none"), false).unwrap().is_empty());
    }
}
