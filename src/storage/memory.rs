// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::traits::{FetchedHashes, HashBatch, HashStore, StorageError};

#[derive(Debug, Clone)]
struct Entry {
    fields: HashMap<String, String>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// In-process [`HashStore`] for tests and single-process use.
///
/// Expired keys are dropped lazily on access.
#[derive(Debug)]
pub struct InMemoryHashStore {
    data: DashMap<String, Entry>,
}

impl InMemoryHashStore {
    #[must_use]
    pub fn new() -> Self {
        Self { data: DashMap::new() }
    }

    /// Number of stored keys (expired ones included until touched).
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&self) {
        self.data.clear();
    }

    /// Raw field value, as the engine stored it.
    pub fn hget(&self, key: &str, field: &str) -> Option<String> {
        self.live(key).and_then(|fields| fields.get(field).cloned())
    }

    /// All fields of `key`.
    pub fn hgetall(&self, key: &str) -> Option<HashMap<String, String>> {
        self.live(key)
    }

    /// Overwrite one field of an existing key, keeping its TTL. Creates the
    /// key with a one-hour TTL if absent.
    pub fn hset(&self, key: &str, field: &str, value: impl Into<String>) {
        let mut entry = self.data.entry(key.to_string()).or_insert_with(|| Entry {
            fields: HashMap::new(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        });
        entry.fields.insert(field.to_string(), value.into());
    }

    /// Remove one field of one key.
    pub fn hdel_field(&self, key: &str, field: &str) {
        if let Some(mut entry) = self.data.get_mut(key) {
            entry.fields.remove(field);
        }
    }

    fn live(&self, key: &str) -> Option<HashMap<String, String>> {
        let fields = self.data.get(key).and_then(|e| e.is_live().then(|| e.fields.clone()));
        if fields.is_none() {
            self.data.remove_if(key, |_, e| !e.is_live());
        }
        fields
    }
}

impl Default for InMemoryHashStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HashStore for InMemoryHashStore {
    async fn set(&self, values: &HashBatch, ttl: Duration) -> Result<(), StorageError> {
        let expires_at = Instant::now() + ttl;
        for (key, fields) in values {
            let mut entry = self.data.entry(key.clone()).or_insert_with(|| Entry {
                fields: HashMap::new(),
                expires_at,
            });
            if !entry.is_live() {
                entry.fields.clear();
            }
            entry.fields.extend(fields.iter().map(|(f, v)| (f.clone(), v.clone())));
            entry.expires_at = expires_at;
        }
        Ok(())
    }

    async fn get(&self, keys: &[String], fields: &[String]) -> Result<FetchedHashes, StorageError> {
        let mut out = HashMap::with_capacity(keys.len());
        for key in keys {
            let stored = self.live(key);
            let hash = fields
                .iter()
                .map(|field| {
                    let value = stored.as_ref().and_then(|s| s.get(field).cloned());
                    (field.clone(), value)
                })
                .collect();
            out.insert(key.clone(), hash);
        }
        Ok(out)
    }

    async fn del(&self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            self.data.remove(key);
        }
        Ok(())
    }

    async fn hdel(&self, keys: &[String], fields: &[String]) -> Result<(), StorageError> {
        for key in keys {
            if let Some(mut entry) = self.data.get_mut(key) {
                for field in fields {
                    entry.fields.remove(field);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn batch(key: &str, fields: &[(&str, &str)]) -> HashBatch {
        HashMap::from([(
            key.to_string(),
            fields.iter().map(|(f, v)| (f.to_string(), v.to_string())).collect(),
        )])
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_new_store_is_empty() {
        let store = InMemoryHashStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryHashStore::new();
        store.set(&batch("k:1", &[("id", "1"), ("name", "a")]), TTL).await.unwrap();

        let got = store.get(&strings(&["k:1"]), &strings(&["id", "name", "other"])).await.unwrap();
        let hash = &got["k:1"];
        assert_eq!(hash["id"].as_deref(), Some("1"));
        assert_eq!(hash["name"].as_deref(), Some("a"));
        assert_eq!(hash["other"], None);
    }

    #[tokio::test]
    async fn test_get_unknown_key_is_all_none() {
        let store = InMemoryHashStore::new();
        let got = store.get(&strings(&["k:9"]), &strings(&["id"])).await.unwrap();
        assert_eq!(got["k:9"]["id"], None);
    }

    #[tokio::test]
    async fn test_set_merges_fields() {
        let store = InMemoryHashStore::new();
        store.set(&batch("k:1", &[("id", "1"), ("name", "a")]), TTL).await.unwrap();
        store.set(&batch("k:1", &[("name", "b"), ("age", "3")]), TTL).await.unwrap();

        let all = store.hgetall("k:1").unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all["name"], "b");
    }

    #[tokio::test]
    async fn test_expired_key_reads_as_absent() {
        let store = InMemoryHashStore::new();
        store.set(&batch("k:1", &[("id", "1")]), Duration::ZERO).await.unwrap();

        let got = store.get(&strings(&["k:1"]), &strings(&["id"])).await.unwrap();
        assert_eq!(got["k:1"]["id"], None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_del_and_hdel() {
        let store = InMemoryHashStore::new();
        store.set(&batch("k:1", &[("id", "1"), ("name", "a")]), TTL).await.unwrap();
        store.set(&batch("k:2", &[("id", "2"), ("name", "b")]), TTL).await.unwrap();

        store.hdel(&strings(&["k:1", "k:2"]), &strings(&["name"])).await.unwrap();
        assert_eq!(store.hget("k:1", "name"), None);
        assert_eq!(store.hget("k:2", "id").as_deref(), Some("2"));

        store.del(&strings(&["k:1", "k:3"])).await.unwrap();
        assert_eq!(store.hgetall("k:1"), None);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_test_helpers() {
        let store = InMemoryHashStore::new();
        store.hset("k:1", "id", "1");
        store.hset("k:1", "name", "a");
        store.hdel_field("k:1", "name");
        assert_eq!(store.hgetall("k:1").unwrap().len(), 1);

        store.clear();
        assert!(store.is_empty());
    }
}
