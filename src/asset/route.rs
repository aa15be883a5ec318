//! Artifact route: source → artifact path → URL mapping.

use std::path::{Path, PathBuf};

use crate::compiler::needs_compile;
use crate::container::Layout;
use crate::utils::path::is_under;

use super::Asset;

/// Where the artifact for `asset` lives.
///
/// A source already under the public root that needs no preprocessing is
/// served as is. Everything else goes to the cache root, named after the
/// source with `/` and `::` flattened to `-` (plus `.css` for compiled
/// styles).
pub fn artifact_path(asset: &Asset, resolved: &Path, layout: &Layout) -> PathBuf {
    if serves_in_place(asset, resolved, layout) {
        return resolved.to_path_buf();
    }

    let mut name = asset.source.replace("::", "-").replace(['/', '\\'], "-");
    if asset.ext == "less" {
        name.push_str(".css");
    }
    layout.cache.join(name)
}

/// Public, non-preprocessed sources have no separate artifact.
#[inline]
pub fn serves_in_place(asset: &Asset, resolved: &Path, layout: &Layout) -> bool {
    is_under(resolved, &layout.public) && !needs_compile(&asset.ext)
}

/// Root-relative URL of a file under the public root.
///
/// Files outside the public root keep their full path, which never
/// resolves on the web server; the caller sees the mistake in the markup.
pub fn url_for(path: &Path, public: &Path) -> String {
    let rel = path.strip_prefix(public).unwrap_or(path);
    let rel = rel.to_string_lossy().replace('\\', "/");
    if rel.starts_with('/') {
        rel
    } else {
        format!("/{rel}")
    }
}
