//! Shared helpers: atomic cache writes, HTML tags, MIME types, paths.

pub mod fs;
pub mod html;
pub mod mime;
pub mod path;
