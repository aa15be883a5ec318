//! LESS → CSS for the subset the pipeline supports.
//!
//! | Feature        | Example                                      |
//! |----------------|----------------------------------------------|
//! | variables      | `@fg: #333;` `color: @fg;` `.@{name} { }`    |
//! | nesting        | `a { &:hover { } .icon { } }`                |
//! | media bubbling | `.box { @media print { } }`                  |
//! | imports        | `@import "mixins";` (inlined once)           |
//! | mixins         | `.rounded(@r: 2px) { }` `.rounded(4px);`     |
//! | operations     | `@w * 2`, `(@w / 3)`                         |
//!
//! Anything else (`@font-face`, `@keyframes`, `@charset`, CSS imports)
//! passes through. Errors carry `file:line`.

mod ast;
mod eval;
mod math;
mod parser;
mod render;


use std::path::Path;

use rustc_hash::FxHashSet;

pub use ast::LessError;

use eval::Evaluator;
use parser::Parser;

/// Compile `source`, read from `path`. Imports resolve relative to `path`.
pub fn compile(path: &Path, source: &str) -> Result<String, LessError> {
    let mut imported = FxHashSet::default();
    imported.insert(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()));

    let nodes = Parser::new(source, path, &mut imported).parse()?;
    let blocks = Evaluator::new().run(&nodes)?;
    Ok(render::render(&blocks))
}
