//! Per-source compilation.
//!
//! | Extension | Output                                             |
//! |-----------|----------------------------------------------------|
//! | `less`    | `/*<md5 of source>*/` line, then the compiled CSS  |
//! | other     | file content, unchanged                            |
//!
//! The hash line lets the staleness check recognise a touched but
//! unchanged source without recompiling it.

pub mod less;

use std::fs;
use std::path::Path;

use crate::debug;
use crate::error::{PipelineError, Result};
use crate::freshness::{ContentHash, build_hash_marker};

/// Extensions that are compiled rather than copied.
const COMPILED_EXTS: &[&str] = &["less"];

/// Whether sources with extension `ext` need compiling.
#[inline]
pub fn needs_compile(ext: &str) -> bool {
    COMPILED_EXTS.contains(&ext)
}

/// Compile the file at `path`.
///
/// A missing file is [`PipelineError::SourceNotFound`]; a LESS syntax or
/// evaluation error is [`PipelineError::Compile`]. Other types come back
/// byte for byte, whatever their encoding.
pub fn compile(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).map_err(|e| PipelineError::read(path, e))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    if !needs_compile(ext) {
        return Ok(bytes);
    }

    debug!("compile"; "{}", path.display());
    let source = String::from_utf8_lossy(&bytes);
    let css = less::compile(path, &source)
        .map_err(|e| PipelineError::compile(path, e.to_string()))?;
    let marker = build_hash_marker(&ContentHash::of(&bytes));
    Ok(format!("{marker}\n{css}").into_bytes())
}
