//! Byte-cursor parser producing [`Node`] trees.
//!
//! Statements are scanned up to the first `{`, `;` or `}` outside strings,
//! parentheses and `@{...}` interpolations, then classified by what ended
//! them: `{` opens a ruleset (or mixin definition), anything else closes a
//! declaration (or mixin call). Comments are dropped while scanning.
//!
//! `.less` imports are parsed here and spliced in place, each file at most
//! once per compilation.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;

use super::ast::{Arg, LessError, Node, Param, Span};
use crate::asset::is_remote;

type PResult<T> = Result<T, LessError>;

/// `.name(@a; @b: 1)` at the head of a block.
static MIXIN_SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([.#][A-Za-z0-9_-]+)\s*\((.*)\)$").unwrap());

/// `.name`, `.name()`, `.name(args) !important` as a statement.
static MIXIN_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([.#][A-Za-z0-9_-]+)\s*(?:\((.*)\))?\s*(!\s*important)?$").unwrap()
});

/// What ended a scanned statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Open,
    Semi,
    Close,
    Eof,
}

pub struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    file: Rc<Path>,
    imported: &'a mut FxHashSet<PathBuf>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, file: &Path, imported: &'a mut FxHashSet<PathBuf>) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            line: 1,
            file: Rc::from(file),
            imported,
        }
    }

    /// Parse a whole file.
    pub fn parse(mut self) -> PResult<Vec<Node>> {
        self.parse_block(None)
    }

    // ========================================================================
    // cursor
    // ========================================================================

    #[inline]
    fn span(&self) -> Span {
        Span {
            file: Rc::clone(&self.file),
            line: self.line,
        }
    }

    #[inline]
    fn error(&self, message: impl Into<String>) -> LessError {
        LessError::at(&self.span(), message)
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    #[inline]
    fn bump(&mut self) {
        if self.peek() == Some(b'\n') {
            self.line += 1;
        }
        self.pos += 1;
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            self.bump();
        }
        self.input[start..self.pos].to_string()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.bump();
        }
    }

    /// Whitespace and comments between statements.
    fn skip_trivia(&mut self) -> PResult<()> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b), _) if b.is_ascii_whitespace() => self.bump(),
                (Some(b'/'), Some(b'*')) => self.skip_block_comment()?,
                (Some(b'/'), Some(b'/')) => self.skip_line_comment(),
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> PResult<()> {
        let span = self.span();
        self.pos += 2;
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b'*'), Some(b'/')) => {
                    self.pos += 2;
                    return Ok(());
                }
                (Some(_), _) => self.bump(),
                (None, _) => return Err(LessError::at(&span, "unterminated comment")),
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while !matches!(self.peek(), None | Some(b'\n')) {
            self.bump();
        }
    }

    fn skip_string(&mut self, quote: u8) -> PResult<()> {
        let span = self.span();
        self.bump();
        loop {
            match self.peek() {
                Some(b'\\') => {
                    self.bump();
                    self.bump();
                }
                Some(b) if b == quote => {
                    self.bump();
                    return Ok(());
                }
                None | Some(b'\n') => return Err(LessError::at(&span, "unterminated string")),
                Some(_) => self.bump(),
            }
        }
    }

    fn skip_interpolation(&mut self) -> PResult<()> {
        let span = self.span();
        self.pos += 2;
        loop {
            match self.peek() {
                Some(b'}') => {
                    self.bump();
                    return Ok(());
                }
                None => return Err(LessError::at(&span, "unterminated `@{` interpolation")),
                Some(_) => self.bump(),
            }
        }
    }

    /// Read up to the next `{`, `;` or `}` that ends a statement.
    ///
    /// Braces always stop the scan; `;` only outside parentheses, so mixin
    /// arguments and `url(data:...;...)` stay intact. The stop byte is not
    /// consumed.
    fn scan(&mut self) -> PResult<(String, Stop)> {
        let mut text = String::new();
        let mut depth = 0usize;
        let mut seg = self.pos;

        while let Some(b) = self.peek() {
            match b {
                b'"' | b'\'' => self.skip_string(b)?,
                b'@' if self.peek_at(1) == Some(b'{') => self.skip_interpolation()?,
                b'/' if self.peek_at(1) == Some(b'*') => {
                    text.push_str(&self.input[seg..self.pos]);
                    self.skip_block_comment()?;
                    text.push(' ');
                    seg = self.pos;
                }
                b'/' if self.peek_at(1) == Some(b'/') && depth == 0 => {
                    text.push_str(&self.input[seg..self.pos]);
                    self.skip_line_comment();
                    text.push(' ');
                    seg = self.pos;
                }
                b'(' => {
                    depth += 1;
                    self.bump();
                }
                b')' => {
                    depth = depth.saturating_sub(1);
                    self.bump();
                }
                b'{' | b'}' => {
                    text.push_str(&self.input[seg..self.pos]);
                    let stop = if b == b'{' { Stop::Open } else { Stop::Close };
                    return Ok((text, stop));
                }
                b';' if depth == 0 => {
                    text.push_str(&self.input[seg..self.pos]);
                    return Ok((text, Stop::Semi));
                }
                _ => self.bump(),
            }
        }

        text.push_str(&self.input[seg..]);
        Ok((text, Stop::Eof))
    }

    // ========================================================================
    // statements
    // ========================================================================

    /// Parse statements until the closing `}` of a block opened at `open`,
    /// or until end of input at the top level.
    fn parse_block(&mut self, open: Option<&Span>) -> PResult<Vec<Node>> {
        let mut nodes = Vec::new();
        loop {
            self.skip_trivia()?;
            let Some(b) = self.peek() else {
                return match open {
                    Some(span) => Err(LessError::at(span, "unclosed block, missing `}`")),
                    None => Ok(nodes),
                };
            };
            match b {
                b'}' => {
                    if open.is_none() {
                        return Err(self.error("unexpected `}`"));
                    }
                    self.bump();
                    return Ok(nodes);
                }
                b';' => self.bump(),
                b'@' if self.peek_at(1) != Some(b'{') => self.parse_at_rule(&mut nodes)?,
                _ => self.parse_statement(&mut nodes)?,
            }
        }
    }

    fn parse_at_rule(&mut self, nodes: &mut Vec<Node>) -> PResult<()> {
        let span = self.span();
        self.bump();
        let name = self.ident();
        if name.is_empty() {
            return Err(self.error("expected a name after `@`"));
        }

        self.skip_whitespace();
        if self.peek() == Some(b':') {
            self.bump();
            let (value, stop) = self.scan()?;
            match stop {
                Stop::Open => {
                    return Err(LessError::at(
                        &span,
                        format!("detached ruleset `@{name}` is not supported"),
                    ));
                }
                Stop::Semi => self.bump(),
                Stop::Close | Stop::Eof => {}
            }
            nodes.push(Node::Variable {
                name,
                value: value.trim().to_string(),
                span,
            });
            return Ok(());
        }

        let (prelude, stop) = self.scan()?;
        let prelude = prelude.trim();

        match (name.as_str(), stop) {
            ("import", Stop::Open) => Err(self.error("expected `;` after @import")),
            ("import", _) => {
                if stop == Stop::Semi {
                    self.bump();
                }
                self.import(prelude, &span, nodes)
            }
            ("media", Stop::Open) => {
                self.bump();
                let body = self.parse_block(Some(&span))?;
                nodes.push(Node::Media {
                    query: prelude.to_string(),
                    body,
                    span,
                });
                Ok(())
            }
            (_, Stop::Open) => {
                self.bump();
                let body = self.parse_block(Some(&span))?;
                nodes.push(Node::AtBlock {
                    prelude: join_at_rule(&name, prelude),
                    body,
                    span,
                });
                Ok(())
            }
            (_, _) => {
                if stop == Stop::Semi {
                    self.bump();
                }
                nodes.push(Node::AtStatement {
                    text: format!("{};", join_at_rule(&name, prelude)),
                    span,
                });
                Ok(())
            }
        }
    }

    fn parse_statement(&mut self, nodes: &mut Vec<Node>) -> PResult<()> {
        let span = self.span();
        let (text, stop) = self.scan()?;
        let text = text.trim();

        if stop == Stop::Open {
            self.bump();
            let body = self.parse_block(Some(&span))?;
            if text.is_empty() {
                return Err(LessError::at(&span, "missing selector before `{`"));
            }
            let node = match mixin_signature(text, &span)? {
                Some((name, params)) => Node::MixinDefinition {
                    name,
                    params,
                    body,
                    span,
                },
                None => Node::Ruleset {
                    selector: text.to_string(),
                    body,
                    span,
                },
            };
            nodes.push(node);
            return Ok(());
        }

        if stop == Stop::Semi {
            self.bump();
        }
        if text.is_empty() {
            return Ok(());
        }

        if let Some(call) = mixin_call(text, &span) {
            nodes.push(call);
            return Ok(());
        }

        match split_declaration(text) {
            Some((name, value)) => {
                nodes.push(Node::Declaration {
                    name: name.to_string(),
                    value: value.to_string(),
                    span,
                });
                Ok(())
            }
            None => Err(LessError::at(
                &span,
                format!("expected a declaration, found `{text}`"),
            )),
        }
    }

    /// `.less` imports are inlined; CSS, remote, `url()` and media-qualified
    /// imports stay as statements.
    fn import(&mut self, prelude: &str, span: &Span, nodes: &mut Vec<Node>) -> PResult<()> {
        let verbatim = || Node::AtStatement {
            text: format!("@import {prelude};"),
            span: span.clone(),
        };

        let Some((target, rest)) = quoted(strip_import_options(prelude)) else {
            nodes.push(verbatim());
            return Ok(());
        };
        if !rest.trim().is_empty() || target.ends_with(".css") || is_remote(target) {
            nodes.push(verbatim());
            return Ok(());
        }
        if target.contains("@{") {
            return Err(LessError::at(
                span,
                "variables in import paths are not supported",
            ));
        }

        let mut path = self.file.parent().unwrap_or(Path::new("")).join(target);
        if path.extension().is_none() {
            path.set_extension("less");
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| LessError::at(span, format!("cannot import `{target}`: {e}")))?;

        let key = path.canonicalize().unwrap_or_else(|_| path.clone());
        if !self.imported.insert(key) {
            return Ok(());
        }

        let imported = Parser::new(&content, &path, self.imported).parse()?;
        nodes.extend(imported);
        Ok(())
    }
}

// ============================================================================
// statement classification
// ============================================================================

fn join_at_rule(name: &str, prelude: &str) -> String {
    if prelude.is_empty() {
        format!("@{name}")
    } else {
        format!("@{name} {prelude}")
    }
}

/// `(reference) "x.less"` → `"x.less"`. Import options are ignored.
fn strip_import_options(prelude: &str) -> &str {
    match prelude.strip_prefix('(') {
        Some(rest) => rest.split_once(')').map_or(prelude, |(_, tail)| tail.trim_start()),
        None => prelude,
    }
}

/// Split a leading quoted string off `text`: `"a.less" screen` → (`a.less`, ` screen`).
fn quoted(text: &str) -> Option<(&str, &str)> {
    let quote = text.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &text[1..];
    let end = body.find(quote)?;
    Some((&body[..end], &body[end + 1..]))
}

fn mixin_signature(text: &str, span: &Span) -> PResult<Option<(String, Vec<Param>)>> {
    if !text.starts_with(['.', '#']) {
        return Ok(None);
    }
    if text.contains(") when") {
        return Err(LessError::at(span, "mixin guards are not supported"));
    }
    let Some(caps) = MIXIN_SIGNATURE.captures(text) else {
        return Ok(None);
    };

    let mut params = Vec::new();
    for part in split_args(&caps[2]) {
        let Some(rest) = part.strip_prefix('@') else {
            return Err(LessError::at(
                span,
                format!("unsupported mixin parameter `{part}`"),
            ));
        };
        let param = match rest.split_once(':') {
            Some((name, default)) => Param {
                name: name.trim().to_string(),
                default: Some(default.trim().to_string()),
            },
            None => Param {
                name: rest.trim().to_string(),
                default: None,
            },
        };
        params.push(param);
    }
    Ok(Some((caps[1].to_string(), params)))
}

fn mixin_call(text: &str, span: &Span) -> Option<Node> {
    if !text.starts_with(['.', '#']) {
        return None;
    }
    let caps = MIXIN_CALL.captures(text)?;

    let args = caps
        .get(2)
        .map(|m| split_args(m.as_str()))
        .unwrap_or_default()
        .into_iter()
        .map(|part| match part.strip_prefix('@').and_then(|r| r.split_once(':')) {
            Some((name, value)) => Arg {
                name: Some(name.trim().to_string()),
                value: value.trim().to_string(),
            },
            None => Arg {
                name: None,
                value: part.to_string(),
            },
        })
        .collect();

    Some(Node::MixinCall {
        name: caps[1].to_string(),
        args,
        important: caps.get(3).is_some(),
        span: span.clone(),
    })
}

/// `name: value` split at the first top-level colon.
fn split_declaration(text: &str) -> Option<(&str, &str)> {
    let idx = find_top_level(text, b':')?;
    let name = text[..idx].trim();
    let value = text[idx + 1..].trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name, value))
}

/// Mixin argument list: `;`-separated when any top-level `;` exists,
/// `,`-separated otherwise. Empty items are dropped.
pub(super) fn split_args(text: &str) -> Vec<&str> {
    let sep = if find_top_level(text, b';').is_some() {
        b';'
    } else {
        b','
    };
    split_top_level(text, sep)
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split on `sep` outside strings, parentheses, brackets and `@{}`.
pub(super) fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for_each_top_level(text, |idx, b| {
        if b == sep {
            parts.push(&text[start..idx]);
            start = idx + 1;
        }
        false
    });
    parts.push(&text[start..]);
    parts
}

fn find_top_level(text: &str, needle: u8) -> Option<usize> {
    let mut found = None;
    for_each_top_level(text, |idx, b| {
        if b == needle {
            found = Some(idx);
            return true;
        }
        false
    });
    found
}

/// Visit bytes at nesting depth zero; `visit` returns `true` to stop.
fn for_each_top_level(text: &str, mut visit: impl FnMut(usize, u8) -> bool) {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth = depth.saturating_sub(1),
                _ if depth == 0 && visit(i, b) => return,
                _ => {}
            },
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> PResult<Vec<Node>> {
        let mut imported = FxHashSet::default();
        Parser::new(src, Path::new("test.less"), &mut imported).parse()
    }

    #[test]
    fn test_classifies_statements() {
        let nodes = parse(
            "@fg: #333;\n.m(@w; @h: 2px) { width: @w; }\na:hover { color: @fg; .m(1px); .plain; }",
        )
        .unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[0], Node::Variable { name, value, .. } if name == "fg" && value == "#333"));
        let Node::MixinDefinition { name, params, .. } = &nodes[1] else {
            panic!("expected mixin definition, got {:?}", nodes[1]);
        };
        assert_eq!(name, ".m");
        assert_eq!(params[1].default.as_deref(), Some("2px"));

        let Node::Ruleset { selector, body, .. } = &nodes[2] else {
            panic!("expected ruleset");
        };
        assert_eq!(selector, "a:hover");
        assert!(matches!(&body[0], Node::Declaration { name, .. } if name == "color"));
        assert!(matches!(&body[1], Node::MixinCall { args, .. } if args.len() == 1));
        assert!(matches!(&body[2], Node::MixinCall { args, .. } if args.is_empty()));
    }

    #[test]
    fn test_comments_dropped() {
        let nodes = parse("// line\n/* block */ a { color: red /* inline */; }").unwrap();
        let Node::Ruleset { body, .. } = &nodes[0] else {
            panic!("expected ruleset");
        };
        assert!(matches!(&body[0], Node::Declaration { value, .. } if value == "red"));
    }

    #[test]
    fn test_url_with_double_slash_kept() {
        let nodes = parse("a { background: url(//cdn.test/x.png); }").unwrap();
        let Node::Ruleset { body, .. } = &nodes[0] else {
            panic!("expected ruleset");
        };
        assert!(
            matches!(&body[0], Node::Declaration { value, .. } if value == "url(//cdn.test/x.png)")
        );
    }

    #[test]
    fn test_error_lines() {
        let err = parse("a {\n  color: red;\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("missing `}`"));

        let err = parse("a { }\n}").unwrap_err();
        assert_eq!(err.line, 2);

        let err = parse("a {\n  content: \"open;\n}").unwrap_err();
        assert!(err.message.contains("unterminated string"));

        let err = parse("/* never closed").unwrap_err();
        assert!(err.message.contains("unterminated comment"));
    }

    #[test]
    fn test_split_args() {
        assert_eq!(split_args("1px, 2px"), vec!["1px", "2px"]);
        assert_eq!(split_args("1px 2px, 3px; red"), vec!["1px 2px, 3px", "red"]);
        assert_eq!(split_args("rgba(0,0,0,.5), 1px"), vec!["rgba(0,0,0,.5)", "1px"]);
        assert!(split_args("  ").is_empty());
    }

    #[test]
    fn test_css_import_kept() {
        let nodes = parse("@import url(base.css);\n@import \"print.css\" print;").unwrap();
        assert!(matches!(&nodes[0], Node::AtStatement { text, .. } if text == "@import url(base.css);"));
        assert!(matches!(&nodes[1], Node::AtStatement { .. }));
    }
}
