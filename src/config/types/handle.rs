//! Global config handle.
//!
//! Uses `arc-swap` for lock-free reads: request workers of the processing
//! route call [`cfg`] on every request without contending on a lock.

use crate::config::CassetConfig;
use arc_swap::ArcSwap;
use std::sync::{Arc, LazyLock};

/// Global config storage.
pub static CONFIG: LazyLock<ArcSwap<CassetConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(CassetConfig::default()));

#[inline]
pub fn cfg() -> Arc<CassetConfig> {
    CONFIG.load_full()
}

#[inline]
pub fn init_config(config: CassetConfig) -> Arc<CassetConfig> {
    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}
