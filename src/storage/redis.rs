// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Redis hash backend.
//!
//! One Redis hash per root entity, one hash field per field path:
//!
//! ```text
//! HSET   fmcache:1 id '[{"value":1,"id":1,"p_id":null}]' name '[...]'
//! EXPIRE fmcache:1 604800
//! HMGET  fmcache:1 id name profile.id
//! ```
//!
//! Every operation is sent as one pipeline and tried once.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{pipe, Client, RedisError};
use tracing::debug;

use super::traits::{FetchedHashes, HashBatch, HashStore, StorageError};

pub struct RedisHashStore {
    connection: ConnectionManager,
}

impl RedisHashStore {
    /// Connect to `connection_string` (e.g. `redis://localhost:6379`).
    ///
    /// ```rust,no_run
    /// # use fmcache::storage::redis::RedisHashStore;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = RedisHashStore::new("redis://localhost:6379").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(connection_string: &str) -> Result<Self, StorageError> {
        let client = Client::open(connection_string).map_err(|e| StorageError::Connection(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        debug!(url = %connection_string, "Connected to Redis");
        Ok(Self { connection })
    }

    /// Build over an existing connection manager.
    pub fn from_connection(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    /// Get a clone of the connection manager
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

fn to_storage_error(e: RedisError) -> StorageError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout() {
        StorageError::Connection(e.to_string())
    } else {
        StorageError::Backend(e.to_string())
    }
}

#[async_trait]
impl HashStore for RedisHashStore {
    async fn set(&self, values: &HashBatch, ttl: Duration) -> Result<(), StorageError> {
        let mut pipeline = pipe();
        let mut queued = 0;
        for (key, fields) in values {
            if fields.is_empty() {
                continue;
            }
            let pairs: Vec<(&str, &str)> = fields.iter().map(|(f, v)| (f.as_str(), v.as_str())).collect();
            pipeline.hset_multiple(key, &pairs).ignore();
            pipeline.expire(key, ttl.as_secs() as i64).ignore();
            queued += 1;
        }
        if queued == 0 {
            return Ok(());
        }

        let mut conn = self.connection.clone();
        let _: () = pipeline.query_async(&mut conn).await.map_err(to_storage_error)?;
        Ok(())
    }

    async fn get(&self, keys: &[String], fields: &[String]) -> Result<FetchedHashes, StorageError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        if fields.is_empty() {
            return Ok(keys.iter().map(|k| (k.clone(), HashMap::new())).collect());
        }

        let mut pipeline = pipe();
        for key in keys {
            pipeline.cmd("HMGET").arg(key).arg(fields);
        }

        let mut conn = self.connection.clone();
        let rows: Vec<Vec<Option<String>>> = pipeline.query_async(&mut conn).await.map_err(to_storage_error)?;

        Ok(keys
            .iter()
            .zip(rows)
            .map(|(key, row)| (key.clone(), fields.iter().cloned().zip(row).collect()))
            .collect())
    }

    async fn del(&self, keys: &[String]) -> Result<(), StorageError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut pipeline = pipe();
        pipeline.del(keys).ignore();

        let mut conn = self.connection.clone();
        let _: () = pipeline.query_async(&mut conn).await.map_err(to_storage_error)?;
        Ok(())
    }

    async fn hdel(&self, keys: &[String], fields: &[String]) -> Result<(), StorageError> {
        if keys.is_empty() || fields.is_empty() {
            return Ok(());
        }
        let mut pipeline = pipe();
        for key in keys {
            pipeline.hdel(key, fields).ignore();
        }

        let mut conn = self.connection.clone();
        let _: () = pipeline.query_async(&mut conn).await.map_err(to_storage_error)?;
        Ok(())
    }
}
