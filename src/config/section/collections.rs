//! `[collections]` section configuration.
//!
//! Named source aliases. An entry maps to one source or a list of sources,
//! and list items may name other collections.
//!
//! # Example
//!
//! ```toml
//! [collections]
//! jquery = ["js/jquery.js", "js/jquery.cookie.js"]
//! admin = ["jquery", "admin::js/panel.js"]
//! reset = "css/reset.css"
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::asset::Source;
use crate::config::{ConfigDiagnostics, FieldPath};

/// One collection entry as written in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectionEntry {
    One(String),
    Many(Vec<String>),
}

impl CollectionEntry {
    /// Convert to a registration source; names inside are re-checked
    /// against the collection map during expansion.
    pub fn to_source(&self) -> Source {
        match self {
            Self::One(s) => Source::from(s.as_str()),
            Self::Many(items) => Source::Many(items.iter().map(|s| Source::from(s.as_str())).collect()),
        }
    }
}

/// Named source aliases, in declaration order.
pub type CollectionsConfig = IndexMap<String, CollectionEntry>;

pub const COLLECTIONS: FieldPath = FieldPath::new("collections");

pub fn validate(collections: &CollectionsConfig, diag: &mut ConfigDiagnostics) {
    for (name, entry) in collections {
        if name.trim().is_empty() {
            diag.error(COLLECTIONS, "collection names must not be empty");
        }
        if matches!(entry, CollectionEntry::Many(items) if items.is_empty()) {
            diag.warn(COLLECTIONS, format!("collection `{name}` is empty"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_collections_parse() {
        let config = test_parse_config(
            "[collections]\nreset = \"css/reset.css\"\njquery = [\"js/jquery.js\", \"js/cookie.js\"]",
        );
        assert_eq!(
            config.collections.get("reset"),
            Some(&CollectionEntry::One("css/reset.css".into()))
        );
        assert_eq!(
            config.collections.get("jquery"),
            Some(&CollectionEntry::Many(vec![
                "js/jquery.js".into(),
                "js/cookie.js".into()
            ]))
        );
        // declaration order is preserved
        let names: Vec<_> = config.collections.keys().collect();
        assert_eq!(names, ["reset", "jquery"]);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut collections = CollectionsConfig::new();
        collections.insert(" ".into(), CollectionEntry::One("a.js".into()));
        let mut diag = ConfigDiagnostics::new();
        validate(&collections, &mut diag);
        assert!(diag.has_errors());
    }
}
