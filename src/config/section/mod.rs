//! Configuration section definitions.
//!
//! Each module corresponds to a section in `casset.toml`:
//!
//! | Module        | TOML Section    | Purpose                              |
//! |---------------|-----------------|--------------------------------------|
//! | `paths`       | `[paths]`       | Public/assets/cache/package roots    |
//! | `pipeline`    | `[pipeline]`    | Route, combine, minify, CDN, version |
//! | `collections` | `[collections]` | Named source aliases                 |
//! | `serve`       | `[serve]`       | Processing route server              |

pub mod collections;
mod paths;
mod pipeline;
mod serve;

pub use collections::{CollectionEntry, CollectionsConfig};
pub use paths::PathsConfig;
pub use pipeline::PipelineConfig;
pub use serve::ServeConfig;
