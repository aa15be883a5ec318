//! Source string → filesystem path.
//!
//! | Source              | Path                                      |
//! |---------------------|-------------------------------------------|
//! | `css/site.css`      | `<assets>/css/site.css`                   |
//! | `pkg::js/widget.js` | `<pkg root>/public/js/widget.js`          |
//! | `pkg::/lib/a.js`    | `<pkg root>/lib/a.js`                     |
//!
//! A package root is `<base>/workbench/<pkg>` when the requested file
//! exists there, else `<base>/vendor/<pkg>`. The choice is made once per
//! package per pass. Existence of the final path is never checked.

use std::path::PathBuf;

use crate::container::Layout;
use crate::freshness::PassCache;

/// Separator between a package id and its relative path.
pub const PACKAGE_SEPARATOR: &str = "::";

/// Resolve `source` to an absolute path.
pub fn resolve(source: &str, layout: &Layout, pass: &mut PassCache) -> PathBuf {
    let Some((package, rel)) = source.split_once(PACKAGE_SEPARATOR) else {
        return layout.assets.join(source.trim_start_matches('/'));
    };

    // Leading `/` is package-rooted, anything else is under its `public/`.
    let rel = match rel.strip_prefix('/') {
        Some(rooted) => PathBuf::from(rooted),
        None => PathBuf::from("public").join(rel),
    };

    if let Some(root) = pass.package_root(package) {
        return root.join(rel);
    }

    let workbench = layout.base.join("workbench").join(package);
    let root = if workbench.join(&rel).exists() {
        workbench
    } else {
        layout.base.join("vendor").join(package)
    };
    let path = root.join(&rel);
    pass.set_package_root(package, root);
    path
}
