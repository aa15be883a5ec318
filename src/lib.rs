//! casset - an asset pipeline for CSS, LESS and JavaScript.
//!
//! Sources are registered on a [`Container`], resolved (including
//! `package::path` references), compiled into a cache when stale, combined
//! and minified, and emitted as markup or as a deferred processing URL.
//!
//! ```ignore
//! let mut assets = Container::new("main", config.container_options());
//! assets.add_plain(vec!["css/site.less", "js/app.js"])?;
//! let head = assets.render_styles()?;
//! ```

pub mod asset;
pub mod cli;
pub mod combine;
pub mod compiler;
pub mod config;
pub mod container;
pub mod encode;
pub mod error;
pub mod freshness;
pub mod logger;
pub mod resolve;
pub mod serve;
pub mod utils;

pub use asset::{Asset, AssetType, ProcessedAsset, Source};
pub use container::{Container, ContainerOptions, Layout, Version};
pub use error::{PipelineError, Result};
pub use freshness::PassCache;
