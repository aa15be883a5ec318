//! Syntax tree for the supported LESS subset.

use std::path::Path;
use std::rc::Rc;

use thiserror::Error;

/// Source location of a node, for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub file: Rc<Path>,
    pub line: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{}:{line}: {message}", file.display())]
pub struct LessError {
    pub file: Rc<Path>,
    pub line: usize,
    pub message: String,
}

impl LessError {
    pub fn at(span: &Span, message: impl Into<String>) -> Self {
        Self {
            file: Rc::clone(&span.file),
            line: span.line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Without the leading `@`.
    pub name: String,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    /// Named argument (`@size: 2px`), without the leading `@`.
    pub name: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// `color: @fg;`
    Declaration {
        name: String,
        value: String,
        span: Span,
    },
    /// `@fg: #333;` (name without `@`)
    Variable {
        name: String,
        value: String,
        span: Span,
    },
    /// `selector, list { ... }`
    Ruleset {
        selector: String,
        body: Vec<Node>,
        span: Span,
    },
    /// `.name(@a; @b: 1) { ... }`, never emitted itself.
    MixinDefinition {
        name: String,
        params: Vec<Param>,
        body: Vec<Node>,
        span: Span,
    },
    /// `.name;`, `.name();`, `.name(1px; red) !important;`
    MixinCall {
        name: String,
        args: Vec<Arg>,
        important: bool,
        span: Span,
    },
    /// `@media <query> { ... }`, bubbled to the top level on output.
    Media {
        query: String,
        body: Vec<Node>,
        span: Span,
    },
    /// Any other block at-rule: `@font-face`, `@keyframes`, `@supports`.
    AtBlock {
        prelude: String,
        body: Vec<Node>,
        span: Span,
    },
    /// Statement at-rule kept verbatim: `@charset`, CSS `@import`.
    AtStatement { text: String, span: Span },
}
