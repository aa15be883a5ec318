//! Asset records, sources and minification.

mod kind;
mod meta;
pub mod minify;
mod route;
mod source;

// Types
pub use kind::AssetType;
pub use meta::{Asset, Attributes, ProcessedAsset, ext_of};
pub use source::{Collections, Source, expand, is_remote};

// Path mapping
pub use route::{artifact_path, serves_in_place, url_for};
