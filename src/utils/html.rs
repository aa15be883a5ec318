//! HTML tag rendering for asset links.
//!
//! Provides:
//! - `escape_attr()` - HTML entity escaping
//! - `tag()`, `render_attributes()` - generic element rendering
//! - `css_file()`, `script_file()`, `script()`, `image()` - the tags the
//!   pipeline emits

use std::borrow::Cow;

use indexmap::IndexMap;

// =============================================================================
// HTML Escaping
// =============================================================================

/// Characters that require HTML escaping.
const ESCAPE_CHARS: [char; 5] = ['<', '>', '&', '"', '\''];

/// Get the HTML entity for a special character.
#[inline]
fn escape_char(c: char) -> Option<&'static str> {
    match c {
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '&' => Some("&amp;"),
        '"' => Some("&quot;"),
        '\'' => Some("&#39;"),
        _ => None,
    }
}

/// Escape HTML attribute values.
///
/// Uses `Cow` to avoid allocation when no escaping is needed.
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    if !s.contains(ESCAPE_CHARS) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match escape_char(c) {
            Some(entity) => result.push_str(entity),
            None => result.push(c),
        }
    }
    Cow::Owned(result)
}

// =============================================================================
// Attributes
// =============================================================================

/// Attributes rendered as `name="name"` when set, omitted otherwise.
const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "defer",
    "disabled",
    "hidden",
    "ismap",
    "loop",
    "multiple",
    "muted",
    "nomodule",
    "open",
    "readonly",
    "required",
    "reversed",
    "selected",
];

#[inline]
fn is_boolean_attribute(name: &str) -> bool {
    BOOLEAN_ATTRIBUTES.contains(&name)
}

/// A value that reads as "off": empty, `0` or `false`.
#[inline]
fn is_falsy(value: &str) -> bool {
    matches!(value, "" | "0" | "false")
}

/// Render attributes as ` name="value"` pairs.
///
/// Falsy values are skipped; boolean attributes render their own name.
pub fn render_attributes(attributes: &IndexMap<String, String>) -> String {
    let mut html = String::new();
    for (name, value) in attributes {
        if is_falsy(value) {
            continue;
        }
        html.push(' ');
        html.push_str(name);
        html.push_str("=\"");
        if is_boolean_attribute(name) {
            html.push_str(name);
        } else {
            html.push_str(&escape_attr(value));
        }
        html.push('"');
    }
    html
}

/// Render an element. `None` content renders an open tag only (void style).
pub fn tag(name: &str, attributes: &IndexMap<String, String>, content: Option<&str>) -> String {
    let attrs = render_attributes(attributes);
    match content {
        None => format!("<{name}{attrs}>"),
        Some(body) => format!("<{name}{attrs}>{body}</{name}>"),
    }
}

/// Defaults first, then caller attributes (overriding values in place).
fn merged(defaults: &[(&str, &str)], extra: &IndexMap<String, String>) -> IndexMap<String, String> {
    let mut attrs: IndexMap<String, String> = defaults
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    for (k, v) in extra {
        attrs.insert(k.clone(), v.clone());
    }
    attrs
}

// =============================================================================
// Asset tags
// =============================================================================

/// `<link rel="stylesheet" ...>` for a CSS URL.
pub fn css_file(url: &str, attributes: &IndexMap<String, String>) -> String {
    let attrs = merged(&[("rel", "stylesheet"), ("type", "text/css"), ("href", url)], attributes);
    tag("link", &attrs, None)
}

/// `<script src="..."></script>` for a JS URL.
pub fn script_file(url: &str, attributes: &IndexMap<String, String>) -> String {
    let attrs = merged(&[("type", "text/javascript"), ("src", url)], attributes);
    tag("script", &attrs, Some(""))
}

/// Inline script block, CDATA-wrapped for XHTML documents.
pub fn script(text: &str) -> String {
    let attrs = merged(&[("type", "text/javascript")], &IndexMap::new());
    tag(
        "script",
        &attrs,
        Some(&format!("\n/*<![CDATA[*/\n{text}\n/*]]>*/\n")),
    )
}

/// `<img>` tag; `src` and `alt` are set after caller attributes.
pub fn image(src: &str, alt: Option<&str>, attributes: &IndexMap<String, String>) -> String {
    let mut attrs = attributes.clone();
    attrs.insert("src".into(), src.into());
    attrs.insert("alt".into(), alt.unwrap_or_default().into());
    tag("img", &attrs, None)
}

// =============================================================================
// Tests
// =============================================================================
