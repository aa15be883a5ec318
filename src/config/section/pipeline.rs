//! `[pipeline]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [pipeline]
//! route = "casset"             # deferred mode: links point at /casset/{style,script}
//! combine = true               # merge each type into one artifact
//! minify = true                # minify combined artifacts
//! cdn = "https://cdn.example"  # prefix for emitted artifact URLs
//! base_url = "https://example.com"
//! version = "42"               # or: version_file = "VERSION"
//! show_refer = true            # name sources in artifacts and cache filenames
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Pipeline behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Processing route prefix. Absent means inline mode.
    pub route: Option<String>,

    /// Combine assets of one type into a single artifact.
    pub combine: bool,

    /// Minify constituents of combined artifacts.
    pub minify: bool,

    /// CDN base URL (trailing `/` trimmed on load).
    pub cdn: String,

    /// Application URL used for public links and CSS `url()` rewriting.
    pub base_url: Option<String>,

    /// Fixed cache-busting version appended to route URLs.
    pub version: Option<String>,

    /// File whose trimmed content is the version, read when a container is built.
    pub version_file: Option<PathBuf>,

    /// Embed source names in artifacts and cache filenames.
    pub show_refer: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            route: None,
            combine: true,
            minify: true,
            cdn: String::new(),
            base_url: None,
            version: None,
            version_file: None,
            show_refer: true,
        }
    }
}

impl PipelineConfig {
    pub const ROUTE: FieldPath = FieldPath::new("pipeline.route");
    pub const BASE_URL: FieldPath = FieldPath::new("pipeline.base_url");
    pub const VERSION_FILE: FieldPath = FieldPath::new("pipeline.version_file");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if let Some(route) = &self.route {
            let trimmed = route.trim_matches('/');
            if trimmed.is_empty() {
                diag.error_with_hint(
                    Self::ROUTE,
                    "route must not be empty",
                    "remove `route` to render assets inline",
                );
            } else if trimmed.contains(['?', '#']) {
                diag.error(Self::ROUTE, "route must be a plain path");
            }
        }

        if self.version.is_some() && self.version_file.is_some() {
            diag.error_with_hint(
                Self::VERSION_FILE,
                "`version` and `version_file` are mutually exclusive",
                "keep only one of them",
            );
        }

        if let Some(base) = &self.base_url
            && url::Url::parse(base).is_err()
        {
            diag.error_with_hint(
                Self::BASE_URL,
                format!("invalid URL `{base}`"),
                "use an absolute URL such as \"https://example.com\"",
            );
        }
    }

    /// Trim the CDN/route/base URL and resolve `version_file` against root.
    pub fn normalize(&mut self, root: &Path) {
        self.cdn = self.cdn.trim_end_matches('/').to_string();
        self.route = self
            .route
            .take()
            .map(|r| r.trim_matches('/').to_string());
        self.base_url = self
            .base_url
            .take()
            .map(|u| u.trim_end_matches('/').to_string());
        if let Some(file) = self.version_file.take() {
            self.version_file = Some(root.join(file));
        }
    }
}
