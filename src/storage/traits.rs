// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("Storage connection error: {0}")]
    Connection(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Hash values to write, keyed by cache key then field path.
pub type HashBatch = HashMap<String, HashMap<String, String>>;

/// Fetched hashes: every requested key maps every requested field to its
/// value, `None` where the field (or the whole key) is absent.
pub type FetchedHashes = HashMap<String, HashMap<String, Option<String>>>;

/// A key → (field → string) store with per-key TTL.
///
/// Each call is one round trip (pipelined for Redis) and a single attempt:
/// implementations do not retry.
#[async_trait]
pub trait HashStore: Send + Sync {
    /// Write every field of every key and (re)arm each key's TTL.
    async fn set(&self, values: &HashBatch, ttl: Duration) -> Result<(), StorageError>;

    /// Read `fields` of every key in `keys`.
    async fn get(&self, keys: &[String], fields: &[String]) -> Result<FetchedHashes, StorageError>;

    /// Delete whole keys.
    async fn del(&self, keys: &[String]) -> Result<(), StorageError>;

    /// Delete every field in `fields` from every key in `keys`.
    async fn hdel(&self, keys: &[String], fields: &[String]) -> Result<(), StorageError>;
}
