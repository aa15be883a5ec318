//! Asset containers: registration, processing and markup.
//!
//! # Module Structure
//!
//! ```text
//! container/
//! ├── options.rs   # Layout, Version, ContainerOptions
//! ├── process.rs   # per-asset processing, content()
//! ├── deferred.rs  # processing route URLs and payloads
//! ├── render.rs    # styles(), scripts(), inline parameters
//! └── mod.rs       # Container, registration API (this file)
//! ```
//!
//! A container is cheap to build and lives for one render. Filesystem
//! memoization lives in a [`PassCache`](crate::freshness::PassCache)
//! handed to each pass, never in the container.

mod deferred;
mod options;
mod process;
mod render;

pub use deferred::{decode_files, encode_files};
pub use options::{ContainerOptions, Layout, Version};

use indexmap::IndexMap;

use crate::asset::{Asset, AssetType, Attributes, Source, expand, ext_of, url_for};
use crate::encode::Value;
use crate::error::Result;
use crate::utils::html;

/// A named set of registered assets and the options they render with.
#[derive(Debug, Clone)]
pub struct Container {
    name: String,
    options: ContainerOptions,
    /// Resolved once at construction, and only when a route is set.
    version: Option<String>,
    assets: IndexMap<String, Asset>,
    /// Cross-cutting dependencies, bucketed by extension.
    dependencies: IndexMap<String, Vec<String>>,
    parameters: IndexMap<String, Value>,
}

impl Container {
    pub fn new(name: impl Into<String>, options: ContainerOptions) -> Self {
        let version = match (&options.route, &options.version) {
            (Some(_), Some(version)) => Some(version.resolve()).filter(|v| !v.is_empty()),
            _ => None,
        };
        Self {
            name: name.into(),
            options,
            version,
            assets: IndexMap::new(),
            dependencies: IndexMap::new(),
            parameters: IndexMap::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    // ========================================================================
    // registration
    // ========================================================================

    /// Register one source, several, or a collection alias.
    ///
    /// Every expanded source shares `attributes` and `dependencies`.
    /// Registering a source again keeps its position and replaces its
    /// attributes and dependencies.
    pub fn add(
        &mut self,
        source: impl Into<Source>,
        attributes: Attributes,
        dependencies: Vec<String>,
    ) -> Result<&mut Self> {
        for source in expand(&source.into(), &self.options.collections)? {
            let asset = Asset::new(source.clone(), attributes.clone(), dependencies.clone());
            self.assets.insert(source, asset);
        }
        Ok(self)
    }

    /// Register a decoded record as is, without alias expansion.
    pub fn register(&mut self, asset: Asset) -> &mut Self {
        self.assets.insert(asset.source.clone(), asset);
        self
    }

    /// Register a source with no attributes or dependencies.
    pub fn add_plain(&mut self, source: impl Into<Source>) -> Result<&mut Self> {
        self.add(source, Attributes::new(), Vec::new())
    }

    /// Add a container-wide dependency for every asset sharing its extension.
    pub fn dependency(&mut self, source: impl Into<String>) -> &mut Self {
        let source = source.into();
        let bucket = self.dependencies.entry(ext_of(&source)).or_default();
        if !bucket.contains(&source) {
            bucket.push(source);
        }
        self
    }

    /// Merge inline script globals. Later keys replace earlier ones.
    pub fn params<K, V>(&mut self, parameters: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in parameters {
            self.parameters.insert(key.into(), value.into());
        }
        self
    }

    /// Registered assets rendering as `kind`, in registration order.
    pub fn assets_of(&self, kind: AssetType) -> impl Iterator<Item = &Asset> {
        self.assets.values().filter(move |a| kind.matches(&a.ext))
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    /// Global dependencies applying to assets with extension `ext`.
    pub(crate) fn global_dependencies(&self, ext: &str) -> &[String] {
        self.dependencies.get(ext).map_or(&[], Vec::as_slice)
    }

    // ========================================================================
    // images and URLs
    // ========================================================================

    /// `<img>` tag. Local sources are served from the assets root, through
    /// the CDN when one is configured; they never enter the pipeline.
    pub fn image(&self, source: &str, alt: Option<&str>, attributes: &Attributes) -> String {
        let url = if source.contains("://") || source.starts_with("//") {
            source.to_string()
        } else {
            self.cdn_url(source)
        };
        html::image(&url, alt, attributes)
    }

    /// Public URL of a file under the assets root, CDN-prefixed when set.
    pub fn cdn_url(&self, source: &str) -> String {
        let path = self
            .options
            .layout
            .assets
            .join(source.trim_start_matches('/'));
        let url = url_for(&path, &self.options.layout.public);
        format!("{}{url}", self.options.cdn)
    }

    /// Link target for an artifact URL: CDN first, then the application
    /// URL, else root-relative.
    pub(crate) fn public_url(&self, url: &str) -> String {
        if !self.options.cdn.is_empty() {
            return format!("{}{url}", self.options.cdn);
        }
        match &self.options.base_url {
            Some(base) => format!("{base}{url}"),
            None => url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::path::Path;
    use std::sync::Arc;

    pub(super) fn options() -> ContainerOptions {
        ContainerOptions::new(Layout::under(Path::new("/srv/site")))
    }

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_add_overwrites_in_place() {
        let mut c = Container::new("main", options());
        c.add_plain(vec!["css/a.css", "js/app.js", "css/b.less"]).unwrap();
        c.add("css/a.css", attrs(&[("media", "print")]), vec!["css/b.less".into()])
            .unwrap();

        let sources: Vec<&str> = c.assets().map(|a| a.source.as_str()).collect();
        assert_eq!(sources, ["css/a.css", "js/app.js", "css/b.less"]);

        let first = c.assets().next().unwrap();
        assert_eq!(first.attributes.get("media").map(String::as_str), Some("print"));
        assert_eq!(first.dependencies, ["css/b.less"]);
        assert_eq!(first.ext, "css");
    }

    #[test]
    fn test_add_expands_collections() {
        let mut opts = options();
        opts.collections.insert("jquery".into(), vec!["js/jquery.js", "js/cookie.js"].into());
        opts.collections.insert("loop".into(), "loop".into());
        let mut c = Container::new("main", opts);

        c.add_plain("jquery").unwrap();
        assert_eq!(c.assets_of(AssetType::Script).count(), 2);
        assert!(matches!(
            c.add_plain("loop").unwrap_err(),
            PipelineError::AliasCycle(_)
        ));
    }

    #[test]
    fn test_dependency_buckets() {
        let mut c = Container::new("main", options());
        c.dependency("css/vars.less").dependency("css/vars.less").dependency("js/base.js");
        assert_eq!(c.global_dependencies("less"), ["css/vars.less"]);
        assert_eq!(c.global_dependencies("js"), ["js/base.js"]);
        assert!(c.global_dependencies("css").is_empty());
    }

    #[test]
    fn test_version_only_with_route() {
        let mut opts = options();
        opts.version = Some(Version::Deferred(Arc::new(|| "9".to_string())));
        assert_eq!(Container::new("a", opts.clone()).version, None);

        opts.route = Some("casset".into());
        assert_eq!(Container::new("a", opts).version.as_deref(), Some("9"));
    }

    #[test]
    fn test_image_and_cdn() {
        let mut opts = options();
        let c = Container::new("main", opts.clone());
        assert_eq!(c.cdn_url("/img/logo.png"), "/assets/img/logo.png");
        assert_eq!(
            c.image("img/logo.png", Some("Logo"), &Attributes::new()),
            r#"<img src="/assets/img/logo.png" alt="Logo">"#
        );

        opts.cdn = "https://cdn.test".into();
        let c = Container::new("main", opts);
        assert_eq!(c.cdn_url("img/logo.png"), "https://cdn.test/assets/img/logo.png");
        assert_eq!(
            c.image("//other.test/a.png", None, &Attributes::new()),
            r#"<img src="//other.test/a.png">"#
        );
    }

    #[test]
    fn test_public_url() {
        let mut opts = options();
        opts.base_url = Some("https://example.com".into());
        let c = Container::new("main", opts.clone());
        assert_eq!(c.public_url("/assets/a.css"), "https://example.com/assets/a.css");

        opts.cdn = "https://cdn.test".into();
        let c = Container::new("main", opts);
        assert_eq!(c.public_url("/assets/a.css"), "https://cdn.test/assets/a.css");
    }
}
