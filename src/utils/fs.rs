//! Cache file writes.
//!
//! Artifacts are written to a temporary file in the destination directory
//! and renamed into place, so a concurrent reader sees either the old file
//! or the complete new one.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::debug;
use crate::error::{PipelineError, Result};

/// Atomically replace `dest` with `content`, creating parent directories.
///
/// A failed attempt is retried once before giving up with
/// [`PipelineError::CacheWrite`].
pub fn write_atomic(dest: &Path, content: &[u8]) -> Result<()> {
    match try_write(dest, content) {
        Ok(()) => Ok(()),
        Err(first) => {
            debug!("cache"; "retrying write of {}: {}", dest.display(), first);
            try_write(dest, content).map_err(|source| PipelineError::CacheWrite {
                path: dest.to_path_buf(),
                source,
            })
        }
    }
}

fn try_write(dest: &Path, content: &[u8]) -> io::Result<()> {
    let dir = dest
        .parent()
        .ok_or_else(|| io::Error::other("cache path has no parent directory"))?;
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}
