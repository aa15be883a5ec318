//! Asset type definitions.

use std::fmt;
use std::str::FromStr;

use crate::utils::mime;

/// Emission unit: every registered asset renders as either a style or a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetType {
    /// `.css` and `.less` sources, rendered as `<link>`.
    Style,
    /// `.js` sources, rendered as `<script>`.
    Script,
}

impl AssetType {
    pub const ALL: [Self; 2] = [Self::Style, Self::Script];

    /// Type owning a source extension, if any.
    pub fn of_ext(ext: &str) -> Option<Self> {
        match ext {
            "css" | "less" => Some(Self::Style),
            "js" => Some(Self::Script),
            _ => None,
        }
    }

    #[inline]
    pub fn matches(self, ext: &str) -> bool {
        Self::of_ext(ext) == Some(self)
    }

    /// Route segment and wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Style => "style",
            Self::Script => "script",
        }
    }

    /// Extension of artifacts of this type.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Style => "css",
            Self::Script => "js",
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Style => mime::types::CSS,
            Self::Script => mime::types::JAVASCRIPT,
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "style" => Ok(Self::Style),
            "script" => Ok(Self::Script),
            other => Err(format!("unknown asset type `{other}` (expected style or script)")),
        }
    }
}
