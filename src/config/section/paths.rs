//! `[paths]` section configuration.
//!
//! Filesystem roots the pipeline reads from and writes to.
//!
//! # Example
//!
//! ```toml
//! [paths]
//! base = "."                  # holds workbench/ and vendor/ package dirs
//! public = "public"           # document root served by the web server
//! assets = "assets"           # source assets, relative to public
//! cache = "assets/cache"      # compiled/combined artifacts, relative to public
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::utils::path::normalize_path;

/// Filesystem roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Project base directory (parent of `workbench/` and `vendor/`).
    pub base: PathBuf,

    /// Public document root.
    pub public: PathBuf,

    /// Asset source directory, relative to `public`.
    pub assets: PathBuf,

    /// Cache directory for compiled artifacts, relative to `public`.
    pub cache: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base: PathBuf::from("."),
            public: PathBuf::from("public"),
            assets: PathBuf::from("assets"),
            cache: PathBuf::from("assets/cache"),
        }
    }
}

impl PathsConfig {
    pub const BASE: FieldPath = FieldPath::new("paths.base");
    pub const PUBLIC: FieldPath = FieldPath::new("paths.public");
    pub const ASSETS: FieldPath = FieldPath::new("paths.assets");
    pub const CACHE: FieldPath = FieldPath::new("paths.cache");

    /// Validate raw paths (before normalization makes everything absolute).
    pub fn validate_paths(&self, diag: &mut ConfigDiagnostics) {
        if self.assets.is_absolute() {
            diag.error_with_hint(
                Self::ASSETS,
                "must be relative to `paths.public`",
                format!("use \"{}\"", strip_root(&self.assets).display()),
            );
        }
        if self.cache.is_absolute() {
            diag.error_with_hint(
                Self::CACHE,
                "must be relative to `paths.public`",
                format!("use \"{}\"", strip_root(&self.cache).display()),
            );
        }
    }

    /// Resolve all roots to absolute paths.
    ///
    /// `base` and `public` are relative to the config file's directory;
    /// `assets` and `cache` are relative to `public`.
    pub fn normalize(&mut self, root: &Path) {
        self.base = normalize_path(&root.join(&self.base));
        self.public = normalize_path(&root.join(&self.public));
        self.assets = self.public.join(trim_slashes(&self.assets));
        self.cache = self.public.join(trim_slashes(&self.cache));
    }
}

fn strip_root(path: &Path) -> &Path {
    path.strip_prefix("/").unwrap_or(path)
}

fn trim_slashes(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().trim_matches('/'))
}
