//! Scope-aware evaluation of a parsed tree into flat CSS blocks.
//!
//! Every block (`{ ... }`) opens a frame. A frame's variables and mixins are
//! collected before its statements run, so a later definition of the same
//! variable wins for the whole scope. Variables are evaluated lazily, in the
//! scope they were defined in.
//!
//! Nested rulesets are flattened against their parents' selectors and
//! `@media` blocks carry their query down to the rules they contain; the
//! renderer groups them back into `@media` blocks at the top level.

use rustc_hash::FxHashMap;

use super::ast::{Arg, LessError, Node, Param, Span};
use super::math;
use super::parser::split_top_level;

/// Mixin calls nested deeper than this are treated as runaway recursion.
const MAX_MIXIN_DEPTH: usize = 64;

type EResult<T> = Result<T, LessError>;

/// One emitted CSS block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Rule {
        media: Option<String>,
        selectors: Vec<String>,
        declarations: Vec<String>,
    },
    AtRule {
        media: Option<String>,
        prelude: String,
        declarations: Vec<String>,
        children: Vec<Block>,
    },
    /// `@charset`, CSS `@import`; hoisted to the top on output.
    Statement(String),
}

impl Block {
    pub fn media(&self) -> Option<&str> {
        match self {
            Self::Rule { media, .. } | Self::AtRule { media, .. } => media.as_deref(),
            Self::Statement(_) => None,
        }
    }

    fn mark_important(&mut self) {
        match self {
            Self::Rule { declarations, .. } => mark_important(declarations),
            Self::AtRule {
                declarations,
                children,
                ..
            } => {
                mark_important(declarations);
                children.iter_mut().for_each(Self::mark_important);
            }
            Self::Statement(_) => {}
        }
    }
}

fn mark_important(declarations: &mut [String]) {
    for decl in declarations {
        if !decl.ends_with("!important") {
            decl.push_str(" !important");
        }
    }
}

// ============================================================================
// scopes
// ============================================================================

#[derive(Debug, Clone)]
enum Binding<'a> {
    /// Definition text, evaluated on use.
    Raw(&'a str),
    /// Already evaluated (mixin arguments).
    Value(String),
}

#[derive(Debug, Clone, Copy)]
struct Mixin<'a> {
    params: &'a [Param],
    body: &'a [Node],
    /// Plain rulesets (`.m { }`) take no arguments.
    parametric: bool,
}

impl<'a> Mixin<'a> {
    fn accepts(&self, args: &[(Option<&str>, String)]) -> bool {
        if !self.parametric {
            return args.is_empty();
        }

        let named: Vec<&str> = args.iter().filter_map(|(name, _)| *name).collect();
        if named
            .iter()
            .any(|n| !self.params.iter().any(|p| p.name == *n))
        {
            return false;
        }

        let positional = args.iter().filter(|(name, _)| name.is_none()).count();
        let free: Vec<&Param> = self
            .params
            .iter()
            .filter(|p| !named.contains(&p.name.as_str()))
            .collect();
        positional <= free.len() && free[positional..].iter().all(|p| p.default.is_some())
    }

    /// Bind arguments to parameters: named ones by name, the rest in order,
    /// defaults for whatever is left.
    fn bind(&self, args: &[(Option<&str>, String)], frame: &mut Frame<'a>) {
        let mut positional = args
            .iter()
            .filter(|(name, _)| name.is_none())
            .map(|(_, value)| value);

        for param in self.params {
            let named = args
                .iter()
                .find(|(name, _)| *name == Some(param.name.as_str()));
            let binding = if let Some((_, value)) = named {
                Binding::Value(value.clone())
            } else if let Some(value) = positional.next() {
                Binding::Value(value.clone())
            } else {
                Binding::Raw(param.default.as_deref().unwrap_or_default())
            };
            frame.variables.insert(param.name.as_str(), binding);
        }

        let all: Vec<&str> = args.iter().map(|(_, v)| v.as_str()).collect();
        frame
            .variables
            .insert("arguments", Binding::Value(all.join(" ")));
    }
}

#[derive(Debug, Default)]
struct Frame<'a> {
    variables: FxHashMap<&'a str, Binding<'a>>,
    mixins: FxHashMap<&'a str, Vec<Mixin<'a>>>,
}

impl<'a> Frame<'a> {
    fn collect(nodes: &'a [Node]) -> Self {
        let mut frame = Self::default();
        frame.declare(nodes);
        frame
    }

    fn declare(&mut self, nodes: &'a [Node]) {
        for node in nodes {
            match node {
                Node::Variable { name, value, .. } => {
                    self.variables.insert(name.as_str(), Binding::Raw(value));
                }
                Node::MixinDefinition {
                    name, params, body, ..
                } => self.mixins.entry(name.as_str()).or_default().push(Mixin {
                    params,
                    body,
                    parametric: true,
                }),
                Node::Ruleset { selector, body, .. } if is_simple_mixin_name(selector) => self
                    .mixins
                    .entry(selector.as_str())
                    .or_default()
                    .push(Mixin {
                        params: &[],
                        body,
                        parametric: false,
                    }),
                _ => {}
            }
        }
    }
}

/// Where statements are being evaluated.
#[derive(Debug, Clone, Default)]
struct Context {
    parents: Vec<String>,
    media: Option<String>,
    /// Declarations without a selector are allowed (`@font-face`).
    bare_declarations: bool,
}

/// Output of one block: its own declarations and everything nested.
#[derive(Debug, Default)]
struct Sink {
    declarations: Vec<String>,
    blocks: Vec<Block>,
}

// ============================================================================
// evaluator
// ============================================================================

#[derive(Debug, Default)]
pub struct Evaluator<'a> {
    frames: Vec<Frame<'a>>,
    /// Variables currently being evaluated, for cycle detection.
    resolving: Vec<String>,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(mut self, nodes: &'a [Node]) -> EResult<Vec<Block>> {
        let mut sink = Sink::default();
        self.scoped(nodes, &Context::default(), &mut sink)?;
        Ok(sink.blocks)
    }

    fn scoped(&mut self, nodes: &'a [Node], ctx: &Context, sink: &mut Sink) -> EResult<()> {
        self.frames.push(Frame::collect(nodes));
        let result = self.eval_nodes(nodes, ctx, sink);
        self.frames.pop();
        result
    }

    fn eval_nodes(&mut self, nodes: &'a [Node], ctx: &Context, sink: &mut Sink) -> EResult<()> {
        for node in nodes {
            match node {
                Node::Variable { .. } | Node::MixinDefinition { .. } => {}

                Node::Declaration { name, value, span } => {
                    if ctx.parents.is_empty() && !ctx.bare_declarations {
                        return Err(LessError::at(
                            span,
                            format!("declaration `{name}` must be inside a ruleset"),
                        ));
                    }
                    let name = self.substitute(name, span)?;
                    let value = self.value(value, span)?;
                    sink.declarations.push(format!("{name}: {value}"));
                }

                Node::Ruleset {
                    selector,
                    body,
                    span,
                } => {
                    let selectors = self.selectors(selector, &ctx.parents, span)?;
                    let inner = Context {
                        parents: selectors.clone(),
                        media: ctx.media.clone(),
                        bare_declarations: false,
                    };
                    let mut nested = Sink::default();
                    self.scoped(body, &inner, &mut nested)?;
                    if !nested.declarations.is_empty() {
                        sink.blocks.push(Block::Rule {
                            media: ctx.media.clone(),
                            selectors,
                            declarations: nested.declarations,
                        });
                    }
                    sink.blocks.extend(nested.blocks);
                }

                Node::MixinCall {
                    name,
                    args,
                    important,
                    span,
                } => self.call(name, args, *important, span, ctx, sink)?,

                Node::Media { query, body, span } => {
                    let query = collapse_whitespace(&self.substitute(query, span)?);
                    let media = match &ctx.media {
                        Some(outer) => format!("{outer} and {query}"),
                        None => query,
                    };
                    let inner = Context {
                        parents: ctx.parents.clone(),
                        media: Some(media.clone()),
                        bare_declarations: false,
                    };
                    let mut nested = Sink::default();
                    self.scoped(body, &inner, &mut nested)?;
                    if !nested.declarations.is_empty() {
                        sink.blocks.push(Block::Rule {
                            media: Some(media),
                            selectors: ctx.parents.clone(),
                            declarations: nested.declarations,
                        });
                    }
                    sink.blocks.extend(nested.blocks);
                }

                Node::AtBlock {
                    prelude,
                    body,
                    span,
                } => {
                    let prelude = self.at_rule_text(prelude, span)?;
                    let parents = if resets_selectors(&prelude) {
                        Vec::new()
                    } else {
                        ctx.parents.clone()
                    };
                    let inner = Context {
                        parents,
                        media: None,
                        bare_declarations: true,
                    };
                    let mut nested = Sink::default();
                    self.scoped(body, &inner, &mut nested)?;

                    let mut declarations = nested.declarations;
                    let mut children = Vec::new();
                    if !inner.parents.is_empty() && !declarations.is_empty() {
                        children.push(Block::Rule {
                            media: None,
                            selectors: inner.parents,
                            declarations: std::mem::take(&mut declarations),
                        });
                    }
                    children.extend(nested.blocks);
                    sink.blocks.push(Block::AtRule {
                        media: ctx.media.clone(),
                        prelude,
                        declarations,
                        children,
                    });
                }

                Node::AtStatement { text, span } => {
                    sink.blocks
                        .push(Block::Statement(self.at_rule_text(text, span)?));
                }
            }
        }
        Ok(())
    }

    fn call(
        &mut self,
        name: &str,
        args: &'a [Arg],
        important: bool,
        span: &Span,
        ctx: &Context,
        sink: &mut Sink,
    ) -> EResult<()> {
        if self.depth >= MAX_MIXIN_DEPTH {
            return Err(LessError::at(
                span,
                format!("mixin `{name}` nested too deeply"),
            ));
        }

        let mut evaluated = Vec::with_capacity(args.len());
        for arg in args {
            evaluated.push((arg.name.as_deref(), self.value(&arg.value, span)?));
        }

        let candidates = self
            .frames
            .iter()
            .rev()
            .find_map(|frame| frame.mixins.get(name))
            .cloned()
            .ok_or_else(|| LessError::at(span, format!("mixin `{name}` is undefined")))?;
        let matching: Vec<Mixin<'a>> = candidates
            .into_iter()
            .filter(|m| m.accepts(&evaluated))
            .collect();
        if matching.is_empty() {
            return Err(LessError::at(
                span,
                format!(
                    "no definition of mixin `{name}` takes {} argument(s)",
                    evaluated.len()
                ),
            ));
        }

        let mut produced = Sink::default();
        for mixin in matching {
            let mut frame = Frame::default();
            mixin.bind(&evaluated, &mut frame);
            frame.declare(mixin.body);

            self.frames.push(frame);
            self.depth += 1;
            let result = self.eval_nodes(mixin.body, ctx, &mut produced);
            self.depth -= 1;
            self.frames.pop();
            result?;
        }

        if important {
            mark_important(&mut produced.declarations);
            produced.blocks.iter_mut().for_each(Block::mark_important);
        }
        sink.declarations.extend(produced.declarations);
        sink.blocks.extend(produced.blocks);
        Ok(())
    }

    // ========================================================================
    // values
    // ========================================================================

    /// Substitute variables, then evaluate arithmetic.
    fn value(&mut self, raw: &str, span: &Span) -> EResult<String> {
        let text = self.substitute(raw, span)?;
        math::evaluate(&text).map_err(|message| LessError::at(span, message))
    }

    fn variable(&mut self, name: &str, span: &Span) -> EResult<String> {
        if self.resolving.iter().any(|n| n == name) {
            return Err(LessError::at(
                span,
                format!("recursive definition of variable `@{name}`"),
            ));
        }

        let found = self
            .frames
            .iter()
            .enumerate()
            .rev()
            .find_map(|(idx, frame)| frame.variables.get(name).map(|b| (idx, b.clone())));
        let Some((idx, binding)) = found else {
            return Err(LessError::at(
                span,
                format!("variable `@{name}` is undefined"),
            ));
        };

        match binding {
            Binding::Value(value) => Ok(value),
            Binding::Raw(raw) => {
                // Evaluate in the defining scope: hide the frames above it.
                self.resolving.push(name.to_string());
                let upper = self.frames.split_off(idx + 1);
                let result = self.value(raw, span);
                self.frames.extend(upper);
                self.resolving.pop();
                result
            }
        }
    }

    /// Replace `@var`, `@@var` and `@{var}`; unwrap `~"..."` escapes.
    /// Inside quoted strings only `@{var}` is replaced.
    fn substitute(&mut self, text: &str, span: &Span) -> EResult<String> {
        if !text.contains(['@', '~']) {
            return Ok(text.to_string());
        }

        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut seg = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'~' if matches!(bytes.get(i + 1), Some(b'"' | b'\'')) => {
                    out.push_str(&text[seg..i]);
                    let (inner, end) = string_body(text, i + 1);
                    out.push_str(&self.interpolate(inner, span)?);
                    i = end;
                    seg = i;
                }
                quote @ (b'"' | b'\'') => {
                    out.push_str(&text[seg..i]);
                    let (inner, end) = string_body(text, i);
                    out.push(quote as char);
                    out.push_str(&self.interpolate(inner, span)?);
                    out.push(quote as char);
                    i = end;
                    seg = i;
                }
                b'@' => {
                    out.push_str(&text[seg..i]);
                    i = self.reference(text, i, span, &mut out)?;
                    seg = i;
                }
                _ => i += 1,
            }
        }
        out.push_str(&text[seg..]);
        Ok(out)
    }

    /// Expand the reference starting at `at` (an `@`), returning the index
    /// just past it.
    fn reference(&mut self, text: &str, at: usize, span: &Span, out: &mut String) -> EResult<usize> {
        let bytes = text.as_bytes();
        match bytes.get(at + 1) {
            Some(b'{') => {
                let close = text[at..]
                    .find('}')
                    .map(|p| at + p)
                    .ok_or_else(|| LessError::at(span, "unterminated `@{` interpolation"))?;
                let value = self.variable(&text[at + 2..close], span)?;
                out.push_str(unquote(&value));
                Ok(close + 1)
            }
            Some(b'@') => {
                let end = ident_end(bytes, at + 2);
                let indirect = self.variable(&text[at + 2..end], span)?;
                let value = self.variable(unquote(&indirect), span)?;
                out.push_str(&value);
                Ok(end)
            }
            _ => {
                let end = ident_end(bytes, at + 1);
                if end == at + 1 {
                    out.push('@');
                } else {
                    let value = self.variable(&text[at + 1..end], span)?;
                    out.push_str(&value);
                }
                Ok(end)
            }
        }
    }

    /// `@{var}` interpolation inside string contents.
    fn interpolate(&mut self, text: &str, span: &Span) -> EResult<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("@{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let close = after
                .find('}')
                .ok_or_else(|| LessError::at(span, "unterminated `@{` interpolation"))?;
            let value = self.variable(&after[..close], span)?;
            out.push_str(unquote(&value));
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// At-rule text with references substituted after the keyword.
    fn at_rule_text(&mut self, text: &str, span: &Span) -> EResult<String> {
        let split = text
            .find(|c: char| c.is_whitespace() || c == ';')
            .unwrap_or(text.len());
        let (keyword, rest) = text.split_at(split);
        Ok(format!("{keyword}{}", self.substitute(rest, span)?))
    }

    /// Expand a selector list against its parents.
    ///
    /// `&` stands for the parent selector; a child without `&` is a
    /// descendant. Lists expand to the full cartesian product, parent-major.
    fn selectors(&mut self, raw: &str, parents: &[String], span: &Span) -> EResult<Vec<String>> {
        let text = self.substitute(raw, span)?;
        let own: Vec<String> = split_top_level(&text, b',')
            .into_iter()
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty())
            .collect();
        if own.is_empty() {
            return Err(LessError::at(span, "empty selector"));
        }

        if parents.is_empty() {
            return Ok(own
                .into_iter()
                .map(|s| {
                    if s.contains('&') {
                        collapse_whitespace(&s.replace('&', ""))
                    } else {
                        s
                    }
                })
                .collect());
        }

        let mut out = Vec::with_capacity(parents.len() * own.len());
        for parent in parents {
            for child in &own {
                if child.contains('&') {
                    out.push(child.replace('&', parent));
                } else {
                    out.push(format!("{parent} {child}"));
                }
            }
        }
        Ok(out)
    }
}

// ============================================================================
// helpers
// ============================================================================

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `.name` or `#name`: a ruleset callable as a mixin.
fn is_simple_mixin_name(selector: &str) -> bool {
    let Some(rest) = selector.strip_prefix(['.', '#']) else {
        return false;
    };
    !rest.is_empty()
        && rest
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// At-rules whose body does not nest under the enclosing selectors.
fn resets_selectors(prelude: &str) -> bool {
    let keyword = prelude
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_start_matches('@');
    let keyword = match keyword.strip_prefix('-') {
        Some(prefixed) => prefixed.split_once('-').map_or(prefixed, |(_, k)| k),
        None => keyword,
    };
    matches!(
        keyword,
        "keyframes" | "font-face" | "page" | "counter-style" | "font-feature-values" | "property"
    )
}

fn ident_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len()
        && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'-' || bytes[end] == b'_')
    {
        end += 1;
    }
    end
}

/// Contents of the string whose opening quote is at `open`, and the index
/// just past its closing quote.
fn string_body(text: &str, open: usize) -> (&str, usize) {
    let bytes = text.as_bytes();
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return (&text[open + 1..i], i + 1),
            _ => i += 1,
        }
    }
    (&text[(open + 1).min(text.len())..], text.len())
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
