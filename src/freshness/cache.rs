//! Pass-scoped memoization.
//!
//! One render pass (one inline render, one deferred request, one CLI run)
//! owns one [`PassCache`]. Nothing here is valid across passes: the source
//! tree may change between them, so every pass starts from a fresh cache.

use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Default)]
pub struct PassCache {
    /// Memoized staleness decisions, keyed by source.
    needs_processing: FxHashMap<String, bool>,
    /// Sources already processed in this pass.
    processed: FxHashSet<String>,
    /// Package id → chosen base directory (workbench or vendor).
    package_roots: FxHashMap<String, PathBuf>,
}

impl PassCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything, for workers that reuse a cache across passes.
    pub fn clear(&mut self) {
        self.needs_processing.clear();
        self.processed.clear();
        self.package_roots.clear();
    }

    #[inline]
    pub fn staleness(&self, source: &str) -> Option<bool> {
        self.needs_processing.get(source).copied()
    }

    /// Whether `source` is already known to be stale.
    #[inline]
    pub fn is_known_stale(&self, source: &str) -> bool {
        self.staleness(source).unwrap_or(false)
    }

    /// Record a staleness decision and return it.
    #[inline]
    pub fn remember(&mut self, source: &str, stale: bool) -> bool {
        self.needs_processing.insert(source.to_string(), stale);
        stale
    }

    #[inline]
    pub fn is_processed(&self, source: &str) -> bool {
        self.processed.contains(source)
    }

    #[inline]
    pub fn mark_processed(&mut self, source: &str) {
        self.processed.insert(source.to_string());
    }

    #[inline]
    pub fn package_root(&self, package: &str) -> Option<&Path> {
        self.package_roots.get(package).map(PathBuf::as_path)
    }

    #[inline]
    pub fn set_package_root(&mut self, package: &str, root: PathBuf) {
        self.package_roots.insert(package.to_string(), root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remember_and_clear() {
        let mut cache = PassCache::new();
        assert_eq!(cache.staleness("a.less"), None);
        assert!(!cache.is_known_stale("a.less"));

        assert!(cache.remember("a.less", true));
        cache.remember("b.js", false);
        cache.mark_processed("a.less");
        cache.set_package_root("pkg", PathBuf::from("/srv/vendor/pkg"));

        assert!(cache.is_known_stale("a.less"));
        assert_eq!(cache.staleness("b.js"), Some(false));
        assert!(cache.is_processed("a.less"));
        assert_eq!(cache.package_root("pkg"), Some(Path::new("/srv/vendor/pkg")));

        cache.clear();
        assert_eq!(cache.staleness("a.less"), None);
        assert!(!cache.is_processed("a.less"));
        assert_eq!(cache.package_root("pkg"), None);
    }
}
