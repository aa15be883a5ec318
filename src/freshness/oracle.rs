//! Per-asset staleness decision.

use std::path::Path;

use indexmap::IndexSet;

use super::{PassCache, compute_file_hash, is_up_to_date, read_hash_marker, touch};
use crate::asset::{Asset, artifact_path, serves_in_place};
use crate::container::Layout;
use crate::debug;
use crate::resolve::resolve;

/// Whether `asset`'s artifact must be (re)built in this pass.
///
/// `global` holds the container-wide dependencies for the asset's
/// extension. A dependency only propagates staleness if it was already
/// decided stale earlier in the pass, so dependencies must be checked
/// before their dependents.
///
/// An artifact older than its source but carrying a matching content hash
/// is touched and reported fresh. That outcome is not memoized.
pub fn needs_processing(
    asset: &Asset,
    global: &[String],
    layout: &Layout,
    pass: &mut PassCache,
) -> bool {
    if let Some(stale) = pass.staleness(&asset.source) {
        return stale;
    }

    let deps: IndexSet<&str> = global
        .iter()
        .chain(&asset.dependencies)
        .map(String::as_str)
        .collect();
    if deps.iter().any(|dep| pass.is_known_stale(dep)) {
        return pass.remember(&asset.source, true);
    }

    let path = resolve(&asset.source, layout, pass);
    if serves_in_place(asset, &path, layout) {
        return pass.remember(&asset.source, false);
    }

    let artifact = artifact_path(asset, &path, layout);
    if !artifact.exists() {
        return pass.remember(&asset.source, true);
    }
    if is_up_to_date(&artifact, &path) {
        return pass.remember(&asset.source, false);
    }

    if content_unchanged(&artifact, &path) {
        debug!("fresh"; "{} unchanged, touching {}", asset.source, artifact.display());
        if let Err(e) = touch(&artifact) {
            debug!("fresh"; "touch failed for {}: {}", artifact.display(), e);
        }
        return false;
    }

    pass.remember(&asset.source, true)
}

/// The artifact's hash marker matches the source's current content.
fn content_unchanged(artifact: &Path, source: &Path) -> bool {
    match (read_hash_marker(artifact), compute_file_hash(source)) {
        (Some(recorded), Some(current)) => recorded == current,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freshness::{ContentHash, build_hash_marker, file_mtime};
    use filetime::FileTime;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        layout: Layout,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let layout = Layout::under(dir.path());
            fs::create_dir_all(&layout.cache).unwrap();
            Self { _dir: dir, layout }
        }

        fn source(&self, rel: &str, content: &str, mtime: i64) -> std::path::PathBuf {
            let path = self.layout.assets.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
            path
        }

        fn artifact(&self, name: &str, content: &str, mtime: i64) -> std::path::PathBuf {
            let path = self.layout.cache.join(name);
            fs::write(&path, content).unwrap();
            filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
            path
        }
    }

    #[test]
    fn test_public_plain_source_never_stale() {
        let fx = Fixture::new();
        fx.source("styles.css", "body{}", 1_000);
        let mut pass = PassCache::new();
        assert!(!needs_processing(&Asset::bare("styles.css"), &[], &fx.layout, &mut pass));
    }

    #[test]
    fn test_missing_artifact_is_stale() {
        let fx = Fixture::new();
        fx.source("theme.less", "@a: 1;", 1_000);
        let mut pass = PassCache::new();
        assert!(needs_processing(&Asset::bare("theme.less"), &[], &fx.layout, &mut pass));
        assert_eq!(pass.staleness("theme.less"), Some(true));
    }

    #[test]
    fn test_newer_artifact_is_fresh() {
        let fx = Fixture::new();
        fx.source("theme.less", "@a: 1;", 1_000);
        fx.artifact("theme.less.css", "body{}", 2_000);
        let mut pass = PassCache::new();
        assert!(!needs_processing(&Asset::bare("theme.less"), &[], &fx.layout, &mut pass));
    }

    #[test]
    fn test_matching_hash_touches_without_memo() {
        let fx = Fixture::new();
        fx.source("theme.less", "@a: 1;", 2_000);
        let marker = build_hash_marker(&ContentHash::of(b"@a: 1;"));
        let artifact = fx.artifact("theme.less.css", &format!("{marker}\nbody{{}}"), 1_000);

        let mut pass = PassCache::new();
        assert!(!needs_processing(&Asset::bare("theme.less"), &[], &fx.layout, &mut pass));
        assert!(file_mtime(&artifact).unwrap() > FileTime::from_unix_time(2_000, 0));
        assert_eq!(pass.staleness("theme.less"), None);
    }

    #[test]
    fn test_changed_content_is_stale() {
        let fx = Fixture::new();
        fx.source("theme.less", "@a: 2;", 2_000);
        let marker = build_hash_marker(&ContentHash::of(b"@a: 1;"));
        fx.artifact("theme.less.css", &format!("{marker}\nbody{{}}"), 1_000);

        let mut pass = PassCache::new();
        assert!(needs_processing(&Asset::bare("theme.less"), &[], &fx.layout, &mut pass));
    }

    #[test]
    fn test_stale_dependency_propagates() {
        let fx = Fixture::new();
        fx.source("base.less", "@a: 1;", 3_000);
        fx.source("theme.less", "@b: 1;", 1_000);
        fx.artifact("theme.less.css", "body{}", 2_000);

        let mut pass = PassCache::new();
        let base = Asset::bare("base.less");
        let mut theme = Asset::bare("theme.less");
        theme.dependencies.push("base.less".into());

        assert!(needs_processing(&base, &[], &fx.layout, &mut pass));
        assert!(needs_processing(&theme, &[], &fx.layout, &mut pass));
    }

    #[test]
    fn test_global_dependency_propagates() {
        let fx = Fixture::new();
        fx.source("vars.less", "@a: 1;", 3_000);
        fx.source("theme.less", "@b: 1;", 1_000);
        fx.artifact("theme.less.css", "body{}", 2_000);

        let mut pass = PassCache::new();
        let global = vec!["vars.less".to_string()];
        assert!(needs_processing(&Asset::bare("vars.less"), &[], &fx.layout, &mut pass));
        assert!(needs_processing(&Asset::bare("theme.less"), &global, &fx.layout, &mut pass));
    }
}
