//! Asset minification for JS and CSS.
//!
//! Uses oxc for JavaScript and lightningcss for CSS.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use super::AssetType;

/// Minify classic (non-module) JavaScript.
///
/// Combined scripts share one global scope, so top-level names are left
/// unmangled.
pub fn minify_js(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let source_type = SourceType::cjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::default()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Some(code)
}

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Option<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(result.code)
}

/// Minify content of the given type.
///
/// Returns `Some(minified)` if minification succeeded, `None` otherwise.
pub fn minify(kind: AssetType, content: &str) -> Option<String> {
    match kind {
        AssetType::Script => minify_js(content),
        AssetType::Style => minify_css(content),
    }
}

/// Sources named `*.min.*` or `*-min.*` (any case) opt out of minification.
pub fn is_marked_minified(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.contains(".min") || lower.contains("-min")
}
