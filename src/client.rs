// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Soft-failing front of a [`HashStore`].
//!
//! A cache that cannot be reached must look like an empty cache, not like a
//! broken one: every backend error is logged, counted, handed to the
//! optional notifier and then turned into a neutral value.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::metrics;
use crate::storage::{FetchedHashes, HashBatch, HashStore, StorageError};

/// Callback invoked with every backend error.
pub type Notifier = Arc<dyn Fn(&StorageError) + Send + Sync>;

#[derive(Clone)]
pub struct Client {
    store: Arc<dyn HashStore>,
    notifier: Option<Notifier>,
}

impl Client {
    pub fn new(store: Arc<dyn HashStore>, notifier: Option<Notifier>) -> Self {
        Self { store, notifier }
    }

    pub fn set_notifier(&mut self, notifier: Notifier) {
        self.notifier = Some(notifier);
    }

    /// `false` when the backend failed.
    pub async fn set(&self, values: &HashBatch, ttl: Duration) -> bool {
        if values.is_empty() {
            return true;
        }
        match self.store.set(values, ttl).await {
            Ok(()) => true,
            Err(e) => {
                self.report("set", &e);
                false
            }
        }
    }

    /// On failure every requested field of every key reads as absent.
    pub async fn get(&self, keys: &[String], fields: &[String]) -> FetchedHashes {
        if keys.is_empty() {
            return HashMap::new();
        }
        match self.store.get(keys, fields).await {
            Ok(hashes) => hashes,
            Err(e) => {
                self.report("get", &e);
                keys.iter()
                    .map(|key| (key.clone(), fields.iter().map(|f| (f.clone(), None)).collect()))
                    .collect()
            }
        }
    }

    pub async fn del(&self, keys: &[String]) -> bool {
        if keys.is_empty() {
            return true;
        }
        match self.store.del(keys).await {
            Ok(()) => true,
            Err(e) => {
                self.report("del", &e);
                false
            }
        }
    }

    pub async fn hdel(&self, keys: &[String], fields: &[String]) -> bool {
        if keys.is_empty() || fields.is_empty() {
            return true;
        }
        match self.store.hdel(keys, fields).await {
            Ok(()) => true,
            Err(e) => {
                self.report("hdel", &e);
                false
            }
        }
    }

    fn report(&self, operation: &'static str, error: &StorageError) {
        warn!(operation, error = %error, "Cache backend call failed");
        metrics::record_backend_error(operation);
        if let Some(notify) = &self.notifier {
            notify(error);
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("notifier", &self.notifier.is_some())
            .finish_non_exhaustive()
    }
}
