// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the cache engine.
//!
//! # Example
//!
//! ```
//! use fmcache::FmCacheConfig;
//!
//! // Minimal config (uses defaults)
//! let config = FmCacheConfig::default();
//! assert_eq!(config.ttl_secs, 7 * 24 * 3600);
//! assert_eq!(config.key_prefix, "fmcache");
//!
//! // Full config
//! let config = FmCacheConfig {
//!     redis_url: Some("redis://localhost:6379".into()),
//!     key_prefix: "users".into(),
//!     ..Default::default()
//! };
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::key::DEFAULT_KEY_PREFIX;

/// Configuration for [`FmCache`](crate::FmCache).
///
/// All fields have defaults; `redis_url` is only needed by
/// [`FmCache::connect`](crate::FmCache::connect).
#[derive(Debug, Clone, Deserialize)]
pub struct FmCacheConfig {
    /// Redis connection string (e.g., "redis://localhost:6379")
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Key namespace: root `1` is stored under `"<key_prefix>:1"`
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Expiry of every written key, refreshed on each write (default: 7 days)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}
fn default_ttl_secs() -> u64 {
    7 * 24 * 3600
}

impl Default for FmCacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: default_key_prefix(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl FmCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
