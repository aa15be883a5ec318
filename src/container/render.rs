//! Markup for registered styles and scripts.
//!
//! | Mode                | Local assets                             | Remote assets |
//! |---------------------|------------------------------------------|---------------|
//! | inline, combine     | processed now, one combined link         | direct links  |
//! | inline, no combine  | processed now, one link each             | direct links  |
//! | deferred, combine   | one route URL for all of them            | direct links  |
//! | deferred, no combine| one route URL each                       | direct links  |

use indexmap::IndexSet;

use crate::asset::{Asset, AssetType, Attributes, ProcessedAsset, is_remote};
use crate::combine::Combiner;
use crate::encode::{Value, encode};
use crate::error::Result;
use crate::freshness::PassCache;
use crate::log;
use crate::utils::html;

use super::Container;

impl Container {
    /// `<link>` tags for every registered style.
    pub fn styles(&self, pass: &mut PassCache) -> Result<String> {
        self.render(AssetType::Style, pass)
    }

    /// Inline parameter blocks and `<script>` tags for every registered script.
    pub fn scripts(&self, pass: &mut PassCache) -> Result<String> {
        self.render(AssetType::Script, pass)
    }

    /// [`styles`](Self::styles) in a fresh pass, with recoverable errors
    /// logged and rendered as nothing.
    pub fn render_styles(&self) -> Result<String> {
        self.render_boundary(AssetType::Style)
    }

    /// [`scripts`](Self::scripts) in a fresh pass, with recoverable errors
    /// logged and rendered as nothing.
    pub fn render_scripts(&self) -> Result<String> {
        self.render_boundary(AssetType::Script)
    }

    fn render_boundary(&self, kind: AssetType) -> Result<String> {
        match self.render(kind, &mut PassCache::new()) {
            Err(e) if e.is_recoverable() => {
                log!("render"; "{} {}: {}", self.name, kind, e);
                Ok(String::new())
            }
            other => other,
        }
    }

    fn render(&self, kind: AssetType, pass: &mut PassCache) -> Result<String> {
        let (remote, local): (Vec<&Asset>, Vec<&Asset>) =
            self.assets_of(kind).partition(|a| is_remote(&a.source));
        if remote.is_empty() && local.is_empty() {
            return Ok(String::new());
        }

        if let Some(route) = &self.options.route {
            return Ok(self.deferred_links(route, kind, &local, &remote));
        }

        let mut out = String::new();
        if kind == AssetType::Script {
            out.push_str(&self.inline_parameters());
        }
        for asset in &remote {
            out.push_str(&link(kind, &asset.source, &asset.attributes));
        }

        let mut processed = local
            .iter()
            .map(|a| self.process(a, pass))
            .collect::<Result<Vec<ProcessedAsset>>>()?;
        if self.options.combine && !processed.is_empty() {
            processed = vec![Combiner::new(&self.name, &self.options).combine(&processed, kind)?];
        }
        for asset in &processed {
            out.push_str(&link(kind, &self.public_url(&asset.url), asset.attributes()));
        }
        Ok(out)
    }

    fn deferred_links(&self, route: &str, kind: AssetType, local: &[&Asset], remote: &[&Asset]) -> String {
        let mut out = String::new();
        if self.options.combine {
            for asset in remote {
                out.push_str(&link(kind, &asset.source, &asset.attributes));
            }
            if !local.is_empty() {
                let url = self.route_url(route, kind, local.iter().copied());
                out.push_str(&link(kind, &url, &Attributes::new()));
            }
            return out;
        }

        // Registration order, each asset on its own.
        for asset in self.assets_of(kind) {
            if is_remote(&asset.source) {
                out.push_str(&link(kind, &asset.source, &asset.attributes));
            } else {
                let url = self.route_url(route, kind, [asset]);
                out.push_str(&link(kind, &url, &asset.attributes));
            }
        }
        out
    }

    /// Up to two `<script>` blocks declaring the registered parameters.
    ///
    /// Plain keys become `var` declarations. Dotted keys (`app.user.id`)
    /// are assigned after each enclosing namespace is guarded with
    /// `x = x || {}`; the outermost guard joins the `var` block. Each
    /// namespace is guarded once.
    pub fn inline_parameters(&self) -> String {
        let mut globals = Vec::new();
        let mut objects = Vec::new();
        let mut guarded = IndexSet::new();

        for (key, value) in &self.parameters {
            let Some((namespace, _)) = key.rsplit_once('.').filter(|(ns, _)| !ns.is_empty()) else {
                globals.push(format!("{key} = {}", encode(value)));
                continue;
            };

            let mut path = String::new();
            for (depth, part) in namespace.split('.').enumerate() {
                if depth > 0 {
                    path.push('.');
                }
                path.push_str(part);
                if !guarded.insert(path.clone()) {
                    continue;
                }
                let guard = format!("{path} = {}", encode(&Value::raw(format!("{path} || {{}}"))));
                if depth == 0 {
                    globals.push(guard);
                } else {
                    objects.push(guard);
                }
            }
            objects.push(format!("{key} = {}", encode(value)));
        }

        let mut out = String::new();
        if !globals.is_empty() {
            out.push_str(&html::script(&format!("var {};", globals.join(",\n"))));
        }
        if !objects.is_empty() {
            out.push_str(&html::script(&format!("{};", objects.join(",\n"))));
        }
        out
    }
}

fn link(kind: AssetType, url: &str, attributes: &Attributes) -> String {
    match kind {
        AssetType::Style => html::css_file(url, attributes),
        AssetType::Script => html::script_file(url, attributes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerOptions, Layout, decode_files};
    use std::fs;
    use tempfile::TempDir;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn site() -> (TempDir, ContainerOptions) {
        let dir = TempDir::new().unwrap();
        let options = ContainerOptions::new(Layout::under(dir.path()));
        (dir, options)
    }

    fn write(path: &std::path::Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// `files` payloads of every route URL in `markup`.
    fn payloads(markup: &str) -> Vec<Vec<String>> {
        markup
            .split("&amp;files=")
            .skip(1)
            .map(|rest| {
                let end = rest.find(['&', '"']).unwrap();
                let files = percent_encoding::percent_decode_str(&rest[..end])
                    .decode_utf8()
                    .unwrap();
                decode_files(&files)
                    .unwrap()
                    .into_iter()
                    .map(|a| a.source)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_public_style_links_directly() {
        let (_dir, mut options) = site();
        options.combine = false;
        write(&options.layout.assets.join("css/styles.css"), "a { color: red; }");
        let mut c = Container::new("main", options.clone());
        c.add("css/styles.css", attrs(&[("media", "screen")]), Vec::new())
            .unwrap();

        let html = c.styles(&mut PassCache::new()).unwrap();
        assert_eq!(
            html,
            r#"<link rel="stylesheet" type="text/css" href="/assets/css/styles.css" media="screen">"#
        );
        assert!(!options.layout.cache.exists());
    }

    #[test]
    fn test_inline_combined_scripts() {
        let (_dir, mut options) = site();
        options.cdn = "https://cdn.test".into();
        write(&options.layout.assets.join("js/a.js"), "var a = 1;");
        write(&options.layout.assets.join("js/b.js"), "var b = 2;");
        let mut c = Container::new("main", options);
        c.add_plain(vec!["https://code.test/lib.js", "js/a.js", "js/b.js"])
            .unwrap();

        let html = c.scripts(&mut PassCache::new()).unwrap();
        let tags: Vec<&str> = html.split("</script>").filter(|t| !t.is_empty()).collect();
        assert_eq!(tags.len(), 2);
        assert!(tags[0].contains(r#"src="https://code.test/lib.js""#));
        assert!(tags[1].contains(r#"src="https://cdn.test/assets/cache/casset-"#));
        assert!(tags[1].contains(r#"-main.js""#));
    }

    #[test]
    fn test_deferred_combined() {
        let (_dir, mut options) = site();
        options.route = Some("casset".into());
        let mut c = Container::new("main", options);
        c.add_plain(vec!["css/a.css", "//fonts.test/f.css", "css/b.less"])
            .unwrap();

        let html = c.styles(&mut PassCache::new()).unwrap();
        assert_eq!(html.matches("<link").count(), 2);
        assert!(html.starts_with(r#"<link rel="stylesheet" type="text/css" href="//fonts.test/f.css">"#));
        assert!(html.contains(r#"href="/casset/style?c=main&amp;files="#));
        assert_eq!(payloads(&html), vec![vec!["css/a.css", "css/b.less"]]);
    }

    #[test]
    fn test_deferred_separate() {
        let (_dir, mut options) = site();
        options.route = Some("casset".into());
        options.combine = false;
        let mut c = Container::new("main", options);
        c.add("js/a.js", attrs(&[("defer", "1")]), Vec::new()).unwrap();
        c.add_plain(vec!["http://cdn.test/x.js", "js/b.js"]).unwrap();

        let html = c.scripts(&mut PassCache::new()).unwrap();
        assert_eq!(html.matches("<script").count(), 3);
        assert_eq!(payloads(&html), vec![vec!["js/a.js"], vec!["js/b.js"]]);
        let tags: Vec<&str> = html.split("</script>").collect();
        assert!(tags[0].contains(r#"defer="defer""#));
        assert!(tags[1].contains(r#"src="http://cdn.test/x.js""#));
    }

    #[test]
    fn test_inline_parameters() {
        let (_dir, options) = site();
        let mut c = Container::new("main", options);
        c.params([
            ("debug", Value::from(true)),
            ("app.user.id", Value::from(7i64)),
            ("app.name", Value::from("x")),
            ("app.user.role", Value::from("admin")),
        ]);

        let html = c.inline_parameters();
        assert!(html.contains("var debug = true,\napp = app || {};"), "{html}");
        assert!(html.contains(
            "app.user = app.user || {},\napp.user.id = 7,\napp.name = 'x',\napp.user.role = 'admin';"
        ));
        assert_eq!(html.matches("app = app || {}").count(), 1);
        assert_eq!(html.matches("app.user = app.user || {}").count(), 1);
        assert_eq!(html.matches("<script").count(), 2);
    }

    #[test]
    fn test_render_boundary_swallows_recoverable() {
        let (_dir, options) = site();
        // A directory where a source file should be fails with a read error.
        fs::create_dir_all(options.layout.assets.join("css/odd.less")).unwrap();
        let mut c = Container::new("main", options);
        c.add_plain("css/odd.less").unwrap();

        assert!(c.styles(&mut PassCache::new()).unwrap_err().is_recoverable());
        assert_eq!(c.render_styles().unwrap(), "");
    }

    #[test]
    fn test_render_boundary_propagates_compile_errors() {
        let (_dir, options) = site();
        write(&options.layout.assets.join("css/bad.less"), "a {");
        let mut c = Container::new("main", options);
        c.add_plain("css/bad.less").unwrap();
        assert!(c.render_styles().is_err());
    }
}
