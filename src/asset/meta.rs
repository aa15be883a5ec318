//! Asset records: registered, processed, and their wire form.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// HTML attributes, in insertion order.
pub type Attributes = IndexMap<String, String>;

/// One registered source file.
///
/// `ext` is derived from `source` once, at registration, and never
/// recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub source: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl Asset {
    pub fn new(source: impl Into<String>, attributes: Attributes, dependencies: Vec<String>) -> Self {
        let source = source.into();
        Self {
            ext: ext_of(&source),
            source,
            attributes,
            dependencies,
        }
    }

    /// A bare record for a dependency reached only by name.
    pub fn bare(source: &str) -> Self {
        Self::new(source, Attributes::new(), Vec::new())
    }

    /// Fill in `ext` for records decoded from a payload that omitted it.
    pub fn with_derived_ext(mut self) -> Self {
        if self.ext.is_empty() {
            self.ext = ext_of(&self.source);
        }
        self
    }
}

/// Extension of a source string (`pkg::js/app.js` → `js`).
pub fn ext_of(source: &str) -> String {
    let name = source.rsplit("::").next().unwrap_or(source);
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A registered asset after processing: where its artifact lives on disk
/// and the root-relative URL it is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedAsset {
    pub asset: Asset,
    pub path: PathBuf,
    pub url: String,
}

impl ProcessedAsset {
    #[inline]
    pub fn source(&self) -> &str {
        &self.asset.source
    }

    #[inline]
    pub fn attributes(&self) -> &Attributes {
        &self.asset.attributes
    }
}
