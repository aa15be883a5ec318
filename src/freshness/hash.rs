//! Content hashing (md5) and the compiled-artifact hash marker.
//!
//! A compiled style artifact starts with `/*<32 hex chars>*/`: the md5 of
//! the source it was compiled from. The staleness check reads it back to
//! tell a touched-but-unchanged source from an edited one.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A 128-bit content hash (md5 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    #[inline]
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Hash a byte slice.
    #[inline]
    pub fn of(bytes: &[u8]) -> Self {
        Self(md5::compute(bytes).0)
    }

    /// Convert to the 32-char lowercase hex form.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 16] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// md5 of a file's bytes. `None` if it cannot be read.
pub fn compute_file_hash(path: &Path) -> Option<ContentHash> {
    fs::read(path).ok().map(|bytes| ContentHash::of(&bytes))
}

/// Build hash marker line: `/*<hex>*/`
pub fn build_hash_marker(hash: &ContentHash) -> String {
    format!("/*{}*/", hash.to_hex())
}

/// Parse a marker line. Surrounding whitespace is ignored; anything but a
/// closed comment holding exactly 32 hex chars yields `None`.
pub fn parse_hash_marker(line: &str) -> Option<ContentHash> {
    if !line.contains("*/") {
        return None;
    }
    let inner = line.replace("/*", "").replace("*/", "");
    let inner = inner.trim();
    if inner.len() != 32 {
        return None;
    }
    ContentHash::from_hex(inner)
}

/// Read the marker on the first line of an artifact.
pub fn read_hash_marker(artifact: &Path) -> Option<ContentHash> {
    let file = fs::File::open(artifact).ok()?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line).ok()?;
    parse_hash_marker(&line)
}
