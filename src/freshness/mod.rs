//! Freshness detection: mtimes first, md5 content markers when mtimes lie.
//!
//! - [`oracle`]: the per-asset staleness decision
//! - [`PassCache`]: pass-scoped memoization shared with path resolution

mod cache;
mod hash;
pub mod mtime;
mod oracle;

pub use cache::PassCache;
pub use hash::{
    ContentHash, build_hash_marker, compute_file_hash, parse_hash_marker, read_hash_marker,
};
pub use mtime::{file_mtime, get_mtime, is_up_to_date, touch};
pub use oracle::needs_processing;
