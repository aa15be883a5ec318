//! CSS `url()` rewriting for combined stylesheets.
//!
//! A combined file is served from the cache directory, not from where its
//! constituents lived, so relative references are resolved against each
//! constituent's own URL first.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::{Position, Url};

/// Stand-in origin when no application URL is configured; results on it
/// are emitted root-relative.
const PLACEHOLDER_ORIGIN: &str = "http://casset.invalid";
const PLACEHOLDER_HOST: &str = "casset.invalid";

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"'\s]*))\s*\)"#).unwrap()
});

/// Rewrite every `url(...)` in `css` to an absolute reference.
///
/// `served_url` is the root-relative URL the stylesheet was served from.
/// With `base_url` set, results are protocol-relative (`//host/path`);
/// without it they are root-relative (`/path`). `data:` URIs and fragment
/// references are left alone.
pub fn rewrite_urls(css: &str, served_url: &str, base_url: Option<&str>) -> String {
    let origin = base_url.unwrap_or(PLACEHOLDER_ORIGIN).trim_end_matches('/');
    let Ok(base) = Url::parse(&format!("{origin}{served_url}")) else {
        return css.to_string();
    };

    CSS_URL
        .replace_all(css, |caps: &Captures| {
            let link = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map_or("", |m| m.as_str())
                .trim();
            let is_data = link.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:"));
            if link.is_empty() || link.starts_with('#') || is_data {
                return caps[0].to_string();
            }
            match base.join(link) {
                Ok(absolute) => format!("url(\"{}\")", display(&absolute)),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn display(url: &Url) -> String {
    if url.host_str() == Some(PLACEHOLDER_HOST) {
        return url[Position::BeforePath..].to_string();
    }
    // Drop the scheme so the reference follows the page's protocol.
    format!("//{}", &url[Position::BeforeUsername..])
}
