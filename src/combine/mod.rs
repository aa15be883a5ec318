//! Combining processed assets into one cache file per type.
//!
//! The artifact name is a hash over every input that shapes its bytes:
//!
//! | Input                       | Why it is keyed                        |
//! |-----------------------------|----------------------------------------|
//! | constituent artifact paths  | set and order of the segments          |
//! | newest constituent mtime    | any edited segment (nanosecond mtime)  |
//! | `minify`, `show_refer`      | segment text and headers               |
//! | `base_url`                  | rewritten `url()` references           |
//!
//! With referrer attribution on, the container name is appended to the
//! file name, so identical sets in two containers get separate files.

mod url;

pub use url::rewrite_urls;

use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;

use crate::asset::minify::{is_marked_minified, minify};
use crate::asset::{Asset, AssetType, Attributes, ProcessedAsset, url_for};
use crate::container::ContainerOptions;
use crate::debug;
use crate::error::{PipelineError, Result};
use crate::freshness::file_mtime;
use crate::utils::fs::write_atomic;

/// File name prefix for attributed combined artifacts.
const REFER_PREFIX: &str = "casset";

/// Merges processed assets of one type for a named container.
pub struct Combiner<'a> {
    name: &'a str,
    options: &'a ContainerOptions,
}

impl<'a> Combiner<'a> {
    pub fn new(name: &'a str, options: &'a ContainerOptions) -> Self {
        Self { name, options }
    }

    /// Combine `assets` into one artifact, rebuilding only when the target
    /// is missing or older than the newest constituent.
    ///
    /// Constituents whose artifact is missing are skipped.
    pub fn combine(&self, assets: &[ProcessedAsset], kind: AssetType) -> Result<ProcessedAsset> {
        let paths: Vec<&Path> = assets.iter().map(|a| a.path.as_path()).collect();
        let lastmod = paths
            .iter()
            .filter_map(|p| file_mtime(p))
            .max()
            .unwrap_or_else(FileTime::zero);
        let file = self.target(&paths, lastmod, kind);

        if file_mtime(&file).is_none_or(|built| built < lastmod) {
            debug!("combine"; "rebuilding {} from {} assets", file.display(), assets.len());
            let content = self.build(assets, kind)?;
            write_atomic(&file, &content)?;
        }

        let url = url_for(&file, &self.options.layout.public);
        let source = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(ProcessedAsset {
            asset: Asset::new(source, Attributes::new(), Vec::new()),
            path: file,
            url,
        })
    }

    /// Absolute path of the combined artifact.
    fn target(&self, paths: &[&Path], lastmod: FileTime, kind: AssetType) -> PathBuf {
        let hash = cache_key(paths, lastmod, self.options);
        let stem = if self.options.show_refer {
            format!("{REFER_PREFIX}-{hash}-{}", sanitize(self.name))
        } else {
            hash
        };
        self.options
            .layout
            .cache
            .join(format!("{stem}.{}", kind.extension()))
    }

    fn build(&self, assets: &[ProcessedAsset], kind: AssetType) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for asset in assets {
            let bytes = match fs::read(&asset.path) {
                Ok(bytes) => bytes,
                Err(e) => match PipelineError::read(&asset.path, e) {
                    PipelineError::SourceNotFound(path) => {
                        debug!("combine"; "skipping missing {}", path.display());
                        continue;
                    }
                    other => return Err(other),
                },
            };

            let header = if self.options.show_refer {
                asset.source()
            } else {
                "---"
            };
            out.extend_from_slice(format!("/* {header} */\n").as_bytes());
            out.extend_from_slice(&self.transform(asset, kind, bytes));
            out.extend_from_slice(b"\n\n");
        }
        Ok(out)
    }

    /// Rewrite `url()` references and minify one segment.
    ///
    /// Both steps work on text; a segment that is not UTF-8 is kept byte for byte.
    fn transform(&self, asset: &ProcessedAsset, kind: AssetType, bytes: Vec<u8>) -> Vec<u8> {
        let mut content = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                debug!("combine"; "{} is not UTF-8, kept as is", asset.source());
                return e.into_bytes();
            }
        };

        if kind == AssetType::Style {
            content = rewrite_urls(&content, &asset.url, self.options.base_url.as_deref());
        }
        if self.options.minify && !is_marked_minified(asset.source()) {
            content = match minify(kind, &content) {
                Some(minified) => minified,
                None => {
                    debug!("combine"; "minify failed for {}, keeping original", asset.source());
                    content
                }
            };
        }
        content.into_bytes()
    }
}

/// Hex md5 naming a combined artifact.
pub fn cache_key(paths: &[&Path], lastmod: FileTime, options: &ContainerOptions) -> String {
    let joined = paths
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join(",");
    let input = format!(
        "{joined}{}.{:09}|minify={}|refer={}|base={}",
        lastmod.unix_seconds(),
        lastmod.nanoseconds(),
        options.minify,
        options.show_refer,
        options.base_url.as_deref().unwrap_or_default()
    );
    hex::encode(md5::compute(input.as_bytes()).0)
}

/// Container names are user-supplied; keep them file-name safe.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Layout;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        options: ContainerOptions,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let options = ContainerOptions::new(Layout::under(dir.path()));
            fs::create_dir_all(&options.layout.cache).unwrap();
            Self { _dir: dir, options }
        }

        fn asset(&self, source: &str, content: &str) -> ProcessedAsset {
            let path = self.options.layout.assets.join(source);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            ProcessedAsset {
                asset: Asset::bare(source),
                url: url_for(&path, &self.options.layout.public),
                path,
            }
        }
    }

    #[test]
    fn test_scripts_with_attribution() {
        let fx = Fixture::new();
        let a = fx.asset("js/app.js", "function add(first, second) {\n  return first + second;\n}\n");
        let b = fx.asset("js/lib.min.js", "var   keep = 1;");

        let combined = Combiner::new("main", &fx.options)
            .combine(&[a, b], AssetType::Script)
            .unwrap();

        let name = combined.asset.source.clone();
        assert!(name.starts_with("casset-") && name.ends_with("-main.js"), "{name}");
        assert_eq!(combined.path.parent().unwrap(), fx.options.layout.cache);
        assert_eq!(combined.url, format!("/assets/cache/{name}"));
        assert!(combined.attributes().is_empty());

        let content = fs::read_to_string(&combined.path).unwrap();
        assert!(content.starts_with("/* js/app.js */\n"));
        assert!(!content.contains("  return"));
        assert!(content.contains("/* js/lib.min.js */\nvar   keep = 1;\n\n"));
    }

    #[test]
    fn test_redacted_headers_share_name() {
        let mut fx = Fixture::new();
        fx.options.show_refer = false;
        fx.options.minify = false;
        let a = fx.asset("css/a.css", "a { color: red; }");

        let one = Combiner::new("one", &fx.options)
            .combine(std::slice::from_ref(&a), AssetType::Style)
            .unwrap();
        let two = Combiner::new("two", &fx.options)
            .combine(&[a], AssetType::Style)
            .unwrap();

        assert_eq!(one.path, two.path);
        let content = fs::read_to_string(&one.path).unwrap();
        assert_eq!(content, "/* --- */\na { color: red; }\n\n");
    }

    #[test]
    fn test_second_combine_is_noop() {
        let fx = Fixture::new();
        let a = fx.asset("js/a.js", "var a = 1;");
        let combiner = Combiner::new("main", &fx.options);

        let first = combiner.combine(std::slice::from_ref(&a), AssetType::Script).unwrap();
        let bytes = fs::read(&first.path).unwrap();
        let source_mtime = file_mtime(&a.path).unwrap();
        let marker = FileTime::from_unix_time(source_mtime.unix_seconds() + 100, 0);
        filetime::set_file_mtime(&first.path, marker).unwrap();

        let second = combiner.combine(&[a], AssetType::Script).unwrap();
        assert_eq!(first.path, second.path);
        assert_eq!(fs::read(&second.path).unwrap(), bytes);
        assert_eq!(FileTime::from_last_modification_time(&fs::metadata(&second.path).unwrap()), marker);
    }

    #[test]
    fn test_key_tracks_mtime_and_flags() {
        let fx = Fixture::new();
        let a = fx.asset("js/a.js", "var a = 1;");
        let paths = [a.path.as_path()];

        let at = FileTime::from_unix_time(100, 0);
        let base = cache_key(&paths, at, &fx.options);
        assert_eq!(base.len(), 32);
        assert_eq!(base, cache_key(&paths, at, &fx.options));
        assert_ne!(base, cache_key(&paths, FileTime::from_unix_time(101, 0), &fx.options));
        assert_ne!(base, cache_key(&paths, FileTime::from_unix_time(100, 1), &fx.options));

        let mut unminified = fx.options.clone();
        unminified.minify = false;
        assert_ne!(base, cache_key(&paths, at, &unminified));
    }

    #[test]
    fn test_edit_within_same_second_rebuilds() {
        let mut fx = Fixture::new();
        fx.options.minify = false;
        let a = fx.asset("js/a.js", "var a = 1;");
        filetime::set_file_mtime(&a.path, FileTime::from_unix_time(1_000, 100_000_000)).unwrap();
        let combiner = Combiner::new("main", &fx.options);

        let first = combiner.combine(std::slice::from_ref(&a), AssetType::Script).unwrap();
        assert_eq!(fs::read_to_string(&first.path).unwrap(), "/* js/a.js */\nvar a = 1;\n\n");

        fs::write(&a.path, "var a = 2;").unwrap();
        filetime::set_file_mtime(&a.path, FileTime::from_unix_time(1_000, 900_000_000)).unwrap();

        let second = combiner.combine(&[a], AssetType::Script).unwrap();
        assert_ne!(first.path, second.path);
        assert_eq!(fs::read_to_string(&second.path).unwrap(), "/* js/a.js */\nvar a = 2;\n\n");
    }

    #[test]
    fn test_non_utf8_segment_kept_verbatim() {
        let fx = Fixture::new();
        let a = fx.asset("js/legacy.js", "");
        let legacy = b"var s = '\xe9t\xe9';".to_vec();
        fs::write(&a.path, &legacy).unwrap();

        let combined = Combiner::new("main", &fx.options)
            .combine(&[a], AssetType::Script)
            .unwrap();

        let mut expected = b"/* js/legacy.js */\n".to_vec();
        expected.extend_from_slice(&legacy);
        expected.extend_from_slice(b"\n\n");
        assert_eq!(fs::read(&combined.path).unwrap(), expected);
    }

    #[test]
    fn test_missing_constituent_skipped() {
        let mut fx = Fixture::new();
        fx.options.minify = false;
        let a = fx.asset("js/a.js", "var a = 1;");
        let mut gone = fx.asset("js/gone.js", "");
        gone.path = fx.options.layout.assets.join("js/never-written.js");

        let combined = Combiner::new("main", &fx.options)
            .combine(&[a, gone], AssetType::Script)
            .unwrap();
        let content = fs::read_to_string(&combined.path).unwrap();
        assert_eq!(content, "/* js/a.js */\nvar a = 1;\n\n");
    }

    #[test]
    fn test_style_urls_rewritten() {
        let mut fx = Fixture::new();
        fx.options.minify = false;
        let a = fx.asset("css/site.css", "a { background: url(../img/bg.png); }");

        let combined = Combiner::new("main", &fx.options)
            .combine(&[a], AssetType::Style)
            .unwrap();
        let content = fs::read_to_string(&combined.path).unwrap();
        assert!(content.contains("url(\"/assets/img/bg.png\")"), "{content}");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("admin/panel"), "admin-panel");
        assert_eq!(sanitize("main_v2.x"), "main_v2.x");
    }
}
