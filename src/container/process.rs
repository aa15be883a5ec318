//! Per-asset processing and raw content for the processing route.

use std::fs;

use crate::asset::{Asset, AssetType, ProcessedAsset, artifact_path, is_remote, url_for};
use crate::combine::Combiner;
use crate::compiler::compile;
use crate::debug;
use crate::error::{PipelineError, Result};
use crate::freshness::{PassCache, needs_processing};
use crate::resolve::resolve;
use crate::utils::fs::write_atomic;

use super::Container;

impl Container {
    /// Bring `asset`'s artifact up to date and report where it lives.
    ///
    /// Dependencies are processed first so their staleness is known when
    /// `asset` is checked. A source that does not exist writes nothing.
    pub fn process(&self, asset: &Asset, pass: &mut PassCache) -> Result<ProcessedAsset> {
        let mut visiting = Vec::new();
        self.process_inner(asset, pass, &mut visiting)
    }

    fn process_inner(
        &self,
        asset: &Asset,
        pass: &mut PassCache,
        visiting: &mut Vec<String>,
    ) -> Result<ProcessedAsset> {
        visiting.push(asset.source.clone());
        let global = self.global_dependencies(&asset.ext);
        let deps: Vec<&String> = global.iter().chain(&asset.dependencies).collect();
        for dep in deps {
            if visiting.contains(dep) || pass.is_processed(dep) {
                continue;
            }
            self.process_inner(&Asset::bare(dep), pass, visiting)?;
        }
        visiting.pop();

        let path = resolve(&asset.source, &self.options.layout, pass);
        let artifact = artifact_path(asset, &path, &self.options.layout);

        if !pass.is_processed(&asset.source)
            && needs_processing(asset, global, &self.options.layout, pass)
        {
            match compile(&path) {
                Ok(content) => write_atomic(&artifact, &content)?,
                Err(PipelineError::SourceNotFound(missing)) => {
                    debug!("process"; "skipping missing {}", missing.display());
                }
                Err(e) => return Err(e),
            }
        }
        pass.mark_processed(&asset.source);

        Ok(ProcessedAsset {
            asset: asset.clone(),
            url: url_for(&artifact, &self.options.layout.public),
            path: artifact,
        })
    }

    /// Process every local asset of `kind`, in registration order.
    pub fn process_all(&self, kind: AssetType, pass: &mut PassCache) -> Result<Vec<ProcessedAsset>> {
        self.assets_of(kind)
            .filter(|a| !is_remote(&a.source))
            .map(|a| self.process(a, pass))
            .collect()
    }

    /// Processed content of every local asset of `kind`.
    ///
    /// Several assets, or a single one with minification on, are combined
    /// first. An artifact that does not exist contributes nothing. Empty
    /// when nothing of the type is registered.
    pub fn content(&self, kind: AssetType, pass: &mut PassCache) -> Result<Vec<u8>> {
        let mut assets = self.process_all(kind, pass)?;
        if assets.is_empty() {
            return Ok(Vec::new());
        }
        if assets.len() > 1 || self.options.minify {
            let combined = Combiner::new(&self.name, &self.options).combine(&assets, kind)?;
            assets = vec![combined];
        }

        let mut parts = Vec::with_capacity(assets.len());
        for asset in &assets {
            match fs::read(&asset.path).map_err(|e| PipelineError::read(&asset.path, e)) {
                Ok(bytes) => parts.push(bytes),
                Err(PipelineError::SourceNotFound(missing)) => {
                    debug!("content"; "skipping missing {}", missing.display());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(parts.join(&b"\n\n"[..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Attributes;
    use crate::container::{ContainerOptions, Layout};
    use crate::freshness::{ContentHash, build_hash_marker};
    use filetime::FileTime;
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        options: ContainerOptions,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let mut options = ContainerOptions::new(Layout::under(dir.path()));
            options.combine = false;
            options.minify = false;
            Self { dir, options }
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        fn set_mtime(&self, rel: &str, secs: i64) {
            let path = self.dir.path().join(rel);
            filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
        }

        fn container(&self) -> Container {
            Container::new("main", self.options.clone())
        }
    }

    fn mtime(path: &Path) -> FileTime {
        FileTime::from_last_modification_time(&fs::metadata(path).unwrap())
    }

    #[test]
    fn test_public_css_served_in_place() {
        let fx = Fixture::new();
        fx.write("public/assets/css/styles.css", "a { color: red; }");
        let mut c = fx.container();
        c.add_plain("css/styles.css").unwrap();

        let processed = c.process_all(AssetType::Style, &mut PassCache::new()).unwrap();
        assert_eq!(processed[0].url, "/assets/css/styles.css");
        assert!(!fx.options.layout.cache.exists());
    }

    #[test]
    fn test_less_compiled_then_touch_skips_recompile() {
        let fx = Fixture::new();
        let source = "@c: red;\na { color: @c; }\n";
        fx.write("public/assets/css/theme.less", source);
        fx.set_mtime("public/assets/css/theme.less", 1_000_000);
        let mut c = fx.container();
        c.add_plain("css/theme.less").unwrap();

        let processed = c.process_all(AssetType::Style, &mut PassCache::new()).unwrap();
        let artifact = fx.options.layout.cache.join("css-theme.less.css");
        assert_eq!(processed[0].path, artifact);
        assert_eq!(processed[0].url, "/assets/cache/css-theme.less.css");

        let content = fs::read_to_string(&artifact).unwrap();
        let marker = build_hash_marker(&ContentHash::of(source.as_bytes()));
        assert!(content.starts_with(&format!("{marker}\n")));
        assert!(content.contains("color: red;"));

        // Touched source, unchanged content: artifact refreshed, not rewritten.
        fs::write(&artifact, format!("{marker}\nsentinel\n")).unwrap();
        fx.set_mtime("public/assets/cache/css-theme.less.css", 1_000_000);
        fx.set_mtime("public/assets/css/theme.less", 2_000_000);

        c.process_all(AssetType::Style, &mut PassCache::new()).unwrap();
        assert!(fs::read_to_string(&artifact).unwrap().contains("sentinel"));
        assert!(mtime(&artifact) > FileTime::from_unix_time(2_000_000, 0));
    }

    #[test]
    fn test_stale_dependency_recompiles_dependent() {
        let fx = Fixture::new();
        fx.write("public/assets/css/vars.less", "@c: blue;");
        fx.write("public/assets/css/site.less", "a { color: black; }");
        let mut c = fx.container();
        c.add("css/site.less", Attributes::new(), vec!["css/vars.less".into()])
            .unwrap();

        c.process_all(AssetType::Style, &mut PassCache::new()).unwrap();
        let site = fx.options.layout.cache.join("css-site.less.css");
        let vars = fx.options.layout.cache.join("css-vars.less.css");
        assert!(site.exists() && vars.exists());

        // Fresh dependent, stale dependency.
        fs::remove_file(&vars).unwrap();
        fs::write(&site, "stale").unwrap();
        c.process_all(AssetType::Style, &mut PassCache::new()).unwrap();
        assert!(vars.exists());
        assert!(fs::read_to_string(&site).unwrap().contains("color: black;"));
    }

    #[test]
    fn test_mutual_global_dependencies_terminate() {
        let fx = Fixture::new();
        fx.write("public/assets/css/a.less", "a { b: c; }");
        fx.write("public/assets/css/b.less", "b { c: d; }");
        let mut c = fx.container();
        c.dependency("css/a.less").dependency("css/b.less");
        c.add_plain(vec!["css/a.less", "css/b.less"]).unwrap();

        let processed = c.process_all(AssetType::Style, &mut PassCache::new()).unwrap();
        assert_eq!(processed.len(), 2);
    }

    #[test]
    fn test_missing_source_writes_nothing() {
        let fx = Fixture::new();
        let mut c = fx.container();
        c.add_plain("pkg::js/widget.js").unwrap();

        let processed = c.process_all(AssetType::Script, &mut PassCache::new()).unwrap();
        assert!(!processed[0].path.exists());
    }

    #[test]
    fn test_compile_error_propagates() {
        let fx = Fixture::new();
        fx.write("public/assets/css/broken.less", "a { color: red;");
        let mut c = fx.container();
        c.add_plain("css/broken.less").unwrap();

        let err = c.content(AssetType::Style, &mut PassCache::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Compile { .. }));
    }

    #[test]
    fn test_content_single_and_combined() {
        let mut fx = Fixture::new();
        fx.write("public/assets/js/a.js", "var a = 1;");
        fx.write("public/assets/js/b.js", "var b = 2;");
        let mut c = fx.container();
        c.add_plain("js/a.js").unwrap();
        assert_eq!(c.content(AssetType::Script, &mut PassCache::new()).unwrap(), b"var a = 1;");
        assert!(c.content(AssetType::Style, &mut PassCache::new()).unwrap().is_empty());

        fx.options.show_refer = false;
        let mut c = fx.container();
        c.add_plain(vec!["js/a.js", "js/b.js"]).unwrap();
        assert_eq!(
            c.content(AssetType::Script, &mut PassCache::new()).unwrap(),
            b"/* --- */\nvar a = 1;\n\n/* --- */\nvar b = 2;\n\n"
        );
    }

    #[test]
    fn test_content_missing_single_source_is_empty() {
        let fx = Fixture::new();
        let mut c = fx.container();
        c.add_plain("js/gone.js").unwrap();

        let content = c.content(AssetType::Script, &mut PassCache::new()).unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn test_pass_through_copies_bytes_exactly() {
        let fx = Fixture::new();
        let latin1 = b"var s = '\xe9t\xe9';".to_vec();
        let path = fx.dir.path().join("vendor/pkg/public/js/legacy.js");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, &latin1).unwrap();
        let mut c = fx.container();
        c.add_plain("pkg::js/legacy.js").unwrap();

        let processed = c.process_all(AssetType::Script, &mut PassCache::new()).unwrap();
        assert!(processed[0].path.starts_with(&fx.options.layout.cache));
        assert_eq!(fs::read(&processed[0].path).unwrap(), latin1);
        assert_eq!(c.content(AssetType::Script, &mut PassCache::new()).unwrap(), latin1);
    }
}
