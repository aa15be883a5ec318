//! Container construction options.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::asset::Collections;

/// Filesystem roots a container works against. All absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Project root holding `workbench/` and `vendor/`.
    pub base: PathBuf,
    /// Web server document root.
    pub public: PathBuf,
    /// Root for plain (non-package) sources.
    pub assets: PathBuf,
    /// Where compiled and combined artifacts go.
    pub cache: PathBuf,
}

impl Layout {
    /// Default layout below `root`: `public/`, `public/assets/`,
    /// `public/assets/cache/`.
    pub fn under(root: &Path) -> Self {
        let public = root.join("public");
        let assets = public.join("assets");
        let cache = assets.join("cache");
        Self {
            base: root.to_path_buf(),
            public,
            assets,
            cache,
        }
    }
}

/// Cache-busting version appended to deferred route URLs.
#[derive(Clone)]
pub enum Version {
    Fixed(String),
    /// Evaluated once, when a container with a route is constructed.
    Deferred(Arc<dyn Fn() -> String + Send + Sync>),
}

impl Version {
    pub fn resolve(&self) -> String {
        match self {
            Self::Fixed(v) => v.clone(),
            Self::Deferred(f) => f(),
        }
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Everything a container is configured with.
#[derive(Debug, Clone)]
pub struct ContainerOptions {
    pub layout: Layout,
    /// Deferred processing route. `None` renders inline.
    pub route: Option<String>,
    pub combine: bool,
    pub minify: bool,
    /// CDN prefix without trailing slash; empty when unset.
    pub cdn: String,
    /// Application URL for public links and CSS `url()` rewriting.
    pub base_url: Option<String>,
    pub version: Option<Version>,
    /// Referrer attribution in artifact names and headers.
    pub show_refer: bool,
    pub collections: Collections,
}

impl ContainerOptions {
    /// Inline mode with combining and minification on.
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            route: None,
            combine: true,
            minify: true,
            cdn: String::new(),
            base_url: None,
            version: None,
            show_refer: true,
            collections: Collections::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under() {
        let layout = Layout::under(Path::new("/srv/site"));
        assert_eq!(layout.public, PathBuf::from("/srv/site/public"));
        assert_eq!(layout.assets, PathBuf::from("/srv/site/public/assets"));
        assert_eq!(layout.cache, PathBuf::from("/srv/site/public/assets/cache"));
    }

    #[test]
    fn test_version_resolve() {
        assert_eq!(Version::Fixed("3".into()).resolve(), "3");
        let deferred = Version::Deferred(Arc::new(|| "abc".to_string()));
        assert_eq!(deferred.resolve(), "abc");
        assert_eq!(format!("{deferred:?}"), "Deferred(..)");
    }
}
