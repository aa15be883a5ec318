//! Pipeline configuration management for `casset.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── collections  # [collections]
//! │   ├── paths        # [paths]
//! │   ├── pipeline     # [pipeline]
//! │   └── serve        # [serve]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   ├── field      # FieldPath
//! │   └── handle     # Global config handle
//! └── mod.rs         # CassetConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section         | Purpose                                         |
//! |-----------------|-------------------------------------------------|
//! | `[paths]`       | base, public, assets and cache roots            |
//! | `[pipeline]`    | route, combine, minify, cdn, version, referrer  |
//! | `[collections]` | named source aliases                            |
//! | `[serve]`       | processing route server (interface, port)       |

pub mod section;
pub mod types;
mod util;

use util::{find_config_file, read_version_file};

pub use section::{
    CollectionEntry, CollectionsConfig, PathsConfig, PipelineConfig, ServeConfig,
};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath, cfg, init_config};

use crate::{
    container::{ContainerOptions, Layout, Version},
    log,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing casset.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CassetConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Filesystem roots
    #[serde(default)]
    pub paths: PathsConfig,

    /// Pipeline behavior
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Named source aliases
    #[serde(default)]
    pub collections: CollectionsConfig,

    /// Processing route server
    #[serde(default)]
    pub serve: ServeConfig,
}

/// CLI-side overrides applied after loading.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub route: Option<String>,
    pub combine: Option<bool>,
    pub minify: Option<bool>,
    pub cdn: Option<String>,
    pub show_refer: Option<bool>,
    pub interface: Option<std::net::IpAddr>,
    pub port: Option<u16>,
}

impl CassetConfig {
    /// Load configuration, searching upward from cwd for `config_name`.
    ///
    /// A missing config file is not an error: defaults apply with the
    /// current directory as project root.
    pub fn load(config_name: &Path, overrides: &Overrides) -> Result<Self> {
        let (mut config, config_path) = match find_config_file(config_name) {
            Some(path) => (Self::from_path(&path)?, path),
            None => {
                let cwd = std::env::current_dir()?;
                log!("config"; "`{}` not found, using defaults", config_name.display());
                (Self::default(), cwd.join(config_name))
            }
        };

        config.validate_paths()?;
        config.config_path = crate::utils::path::normalize_path(&config_path);
        config.finalize(overrides);
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    /// Finalize configuration after loading: resolve roots, apply overrides.
    fn finalize(&mut self, overrides: &Overrides) {
        let root = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.root = crate::utils::path::normalize_path(&root);

        self.apply_overrides(overrides);

        let root = self.root.clone();
        self.paths.normalize(&root);
        self.pipeline.normalize(&root);
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if overrides.route.is_some() {
            self.pipeline.route.clone_from(&overrides.route);
        }
        Self::update_option(&mut self.pipeline.combine, overrides.combine.as_ref());
        Self::update_option(&mut self.pipeline.minify, overrides.minify.as_ref());
        Self::update_option(&mut self.pipeline.cdn, overrides.cdn.as_ref());
        Self::update_option(&mut self.pipeline.show_refer, overrides.show_refer.as_ref());
        Self::update_option(&mut self.serve.interface, overrides.interface.as_ref());
        Self::update_option(&mut self.serve.port, overrides.port.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    // ========================================================================
    // pipeline handoff
    // ========================================================================

    /// Build the options every container of this project is created with.
    ///
    /// `version_file` becomes a deferred version: the file is only read when
    /// a container with a processing route is constructed.
    pub fn container_options(&self) -> ContainerOptions {
        let version = match (&self.pipeline.version, &self.pipeline.version_file) {
            (Some(v), _) => Some(Version::Fixed(v.clone())),
            (None, Some(file)) => {
                let file = file.clone();
                Some(Version::Deferred(Arc::new(move || {
                    read_version_file(&file).unwrap_or_default()
                })))
            }
            (None, None) => None,
        };

        ContainerOptions {
            layout: Layout {
                base: self.paths.base.clone(),
                public: self.paths.public.clone(),
                assets: self.paths.assets.clone(),
                cache: self.paths.cache.clone(),
            },
            route: self.pipeline.route.clone(),
            combine: self.pipeline.combine,
            minify: self.pipeline.minify,
            cdn: self.pipeline.cdn.clone(),
            base_url: self.pipeline.base_url.clone(),
            version,
            show_refer: self.pipeline.show_refer,
            collections: self
                .collections
                .iter()
                .map(|(name, entry)| (name.clone(), entry.to_source()))
                .collect(),
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Pre-validate paths before normalization.
    ///
    /// Normalization turns every root absolute, which would hide an
    /// absolute `assets`/`cache` value written by the user.
    fn validate_paths(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();
        self.paths.validate_paths(&mut diag);
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Validate configuration, collecting all errors at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.pipeline.validate(&mut diag);
        section::collections::validate(&self.collections, &mut diag);

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> CassetConfig {
    let (parsed, ignored) = CassetConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
