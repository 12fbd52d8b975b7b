// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The cache engine: write, read, fetch and delete of nested records under a
//! field mask.
//!
//! # Read path
//!
//! ```text
//! ids, mask ──► HMGET keys × paths ──► Codec ──► Decoder ──► values
//!                                                      ├───► invalid values
//!                                                      └───► IncompleteInfo
//! ```
//!
//! # Fetch path
//!
//! ```text
//! read ──(incomplete)──► loader(ids, mask') ──► write(mask')
//!                                │
//!   cached flats minus ◄─────────┴──► encode(loaded)
//!   their own bad paths
//!          └──────── merge (loaded wins) ────────┘
//!                         │
//!              per-record decode ──(still bad)──► HDEL own paths (read repair)
//! ```

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::client::{Client, Notifier};
use crate::codec::{Codec, ItemSerializer};
use crate::config::FmCacheConfig;
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{FmCacheError, LoadError};
use crate::field_mask::{FieldMask, FieldMaskParser, MaskParser, ID_FIELD};
use crate::incomplete::IncompleteInfo;
use crate::item::{FlatRecord, Item, Slot};
use crate::key::KeyGen;
use crate::metrics::{self, LatencyTimer};
use crate::record::{Id, Record};
use crate::storage::{HashBatch, HashStore, RedisHashStore};

/// Outcome of [`FmCache::read`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResult {
    /// Records fully valid for the mask, in input order.
    pub values: Vec<Record>,
    /// Cached records that are missing or inconsistent somewhere, carrying
    /// whatever part of them could be trusted.
    pub invalid_values: Vec<Record>,
    /// What the caller must load to complete the request.
    pub incomplete: IncompleteInfo,
}

/// Field-mask aware cache over a [`HashStore`].
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use fmcache::{EntitySchema, FmCache, FmCacheConfig, InMemoryHashStore, Record, Schema, SchemaParser};
///
/// # async fn example() -> Result<(), fmcache::FmCacheError> {
/// let parser = SchemaParser::new(
///     Schema::new("User").entity("User", EntitySchema::new().attrs(["name"])),
/// );
/// let cache = FmCache::new(Arc::new(InMemoryHashStore::new()), Arc::new(parser), &FmCacheConfig::default());
///
/// let mask = cache.parse(["name"])?;
/// let users = cache
///     .fetch(&[1, 2], &mask, |ids, _mask| async move {
///         Ok(ids.into_iter().map(|id| Record::new(id).with("name", "Taro")).collect())
///     })
///     .await?;
/// assert_eq!(users.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FmCache {
    client: Client,
    parser: MaskParser,
    keys: KeyGen,
    ttl: Duration,
    codec: Codec,
    encoder: Encoder,
    decoder: Decoder,
}

impl FmCache {
    pub fn new(store: Arc<dyn HashStore>, parser: Arc<dyn FieldMaskParser>, config: &FmCacheConfig) -> Self {
        let parser = MaskParser::new(parser);
        Self {
            client: Client::new(store, None),
            decoder: Decoder::new(parser.clone()),
            parser,
            keys: KeyGen::new(&config.key_prefix),
            ttl: config.ttl(),
            codec: Codec::default(),
            encoder: Encoder::new(),
        }
    }

    /// Connect to the Redis instance at `config.redis_url`.
    pub async fn connect(config: &FmCacheConfig, parser: Arc<dyn FieldMaskParser>) -> Result<Self, FmCacheError> {
        let url = config
            .redis_url
            .as_deref()
            .ok_or_else(|| FmCacheError::Config("redis_url is not set".into()))?;
        let store = RedisHashStore::new(url).await?;
        Ok(Self::new(Arc::new(store), parser, config))
    }

    /// Report every backend failure to `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.client.set_notifier(notifier);
        self
    }

    /// Replace the default JSON item serializer.
    #[must_use]
    pub fn with_serializer(mut self, serializer: Arc<dyn ItemSerializer>) -> Self {
        self.codec = Codec::new(serializer);
        self
    }

    /// Parse dotted paths with the configured parser (normalized).
    pub fn parse<I, S>(&self, paths: I) -> Result<FieldMask, FmCacheError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.parser.parse(paths)
    }

    /// Cache `values` under `mask`. Returns `false` when the backend failed.
    pub async fn write(&self, values: &[Record], mask: &FieldMask) -> bool {
        let _timer = LatencyTimer::new("write");
        let mask = mask.clone().normalized();

        let batch: HashBatch = self
            .encoder
            .encode(values, &mask)
            .iter()
            .map(|flat| (self.keys.to_key(flat.id()), self.codec.encode(flat)))
            .collect();

        debug!(records = batch.len(), fields = mask.paths().len(), "Writing to cache");
        let ok = self.client.set(&batch, self.ttl).await;
        metrics::record_operation("write", if ok { "success" } else { "error" });
        ok
    }

    /// Read `ids` under `mask`, splitting the cached state into trustworthy
    /// values, salvaged invalid values and what is left to load.
    ///
    /// Cache state never causes an error; a key the store hands back that
    /// does not parse as ours does.
    pub async fn read(&self, ids: &[Id], mask: &FieldMask) -> Result<ReadResult, FmCacheError> {
        let _timer = LatencyTimer::new("read");
        let mask = mask.clone().normalized();
        let (read, _) = self.read_cached(&dedup_ids(ids), &mask).await?;
        metrics::record_operation("read", "success");
        Ok(read)
    }

    /// Body of [`FmCache::read`]. Also hands back the flat record of every
    /// cached id, as fetched, so `fetch` can work per record.
    async fn read_cached(
        &self,
        ids: &[Id],
        mask: &FieldMask,
    ) -> Result<(ReadResult, HashMap<Id, FlatRecord>), FmCacheError> {
        let keys = self.keys.to_keys(ids);
        let fields = mask.paths();
        debug!(keys = keys.len(), fields = fields.len(), "Reading from cache");

        let mut by_id = HashMap::with_capacity(keys.len());
        for (key, hash) in self.client.get(&keys, &fields).await {
            by_id.insert(self.keys.to_id(&key)?, hash);
        }

        let mut flats = Vec::with_capacity(ids.len());
        let mut uncached = Vec::new();
        for &id in ids {
            let hash = by_id.remove(&id).unwrap_or_default();
            if hash.values().all(Option::is_none) {
                uncached.push(id);
                continue;
            }
            let mut flat = self.codec.decode(id, hash);
            if flat.get(ID_FIELD).is_missing() {
                flat.set(ID_FIELD, Slot::from_items(vec![Item::root_id(id)]));
            }
            flats.push(flat);
        }
        let cached: HashMap<Id, FlatRecord> = flats.iter().map(|flat| (flat.id(), flat.clone())).collect();

        let outcome = self.decoder.decode(flats, mask)?;
        metrics::record_read_outcome(outcome.values.len(), outcome.invalid_values.len(), uncached.len());

        let incomplete = if uncached.is_empty() {
            outcome.incomplete
        } else {
            let mut info = outcome.incomplete;
            let paths: BTreeSet<String> = info.field_mask.paths().into_iter().chain(fields).collect();
            info.ids.extend(uncached);
            info.field_mask = self.parser.parse(&paths)?;
            info
        };

        let read = ReadResult {
            values: sort_by_ids(outcome.values, ids),
            invalid_values: sort_by_ids(outcome.invalid_values, ids),
            incomplete,
        };
        Ok((read, cached))
    }

    /// Read `ids` under `mask`, completing whatever the cache lacks with one
    /// call to `loader`.
    ///
    /// The loader receives the incomplete ids and the mask of paths to load;
    /// what it returns is written back. Results follow the order of `ids`,
    /// records for ids that were not asked for come last.
    pub async fn fetch<F, Fut>(&self, ids: &[Id], mask: &FieldMask, loader: F) -> Result<Vec<Record>, FmCacheError>
    where
        F: FnOnce(Vec<Id>, FieldMask) -> Fut,
        Fut: Future<Output = Result<Vec<Record>, LoadError>>,
    {
        let _timer = LatencyTimer::new("fetch");
        let mask = mask.clone().normalized();
        let ids = dedup_ids(ids);

        let (read, mut cached) = self.read_cached(&ids, &mask).await?;
        if read.incomplete.is_empty() {
            metrics::record_operation("fetch", "success");
            return Ok(read.values);
        }

        let info = read.incomplete;
        debug!(ids = info.ids.len(), fields = info.field_mask.paths().len(), "Loading incomplete records");
        metrics::record_loader_call(info.ids.len());
        let loaded = match loader(info.ids.clone(), info.field_mask.clone()).await {
            Ok(loaded) => loaded,
            Err(e) => {
                metrics::record_operation("fetch", "error");
                return Err(FmCacheError::Loader(e));
            }
        };
        self.write(&loaded, &info.field_mask).await;

        // Each cached record gives up only its own bad paths; the loaded
        // records fill in whatever they carry.
        let mut merged = BTreeMap::new();
        for id in &info.ids {
            if let Some(mut flat) = cached.remove(id) {
                let own = self.decoder.decode_one(&flat, &mask)?.invalid_paths;
                flat.mark_missing(own.iter().filter(|p| p.as_str() != ID_FIELD));
                merged.insert(*id, flat);
            }
        }
        for flat in self.encoder.encode(&loaded, &info.field_mask) {
            match merged.entry(flat.id()) {
                Entry::Occupied(mut e) => e.get_mut().merge(flat),
                Entry::Vacant(e) => {
                    e.insert(flat);
                }
            }
        }

        let mut records = read.values;
        let mut repairs: BTreeMap<Vec<String>, Vec<Id>> = BTreeMap::new();
        for flat in merged.into_values() {
            let decoded = self.decoder.decode_one(&flat, &mask)?;
            if !decoded.is_valid() {
                repairs
                    .entry(decoded.invalid_paths.into_iter().collect())
                    .or_default()
                    .push(flat.id());
            }
            records.push(decoded.record);
        }

        for (fields, repaired) in repairs {
            let keys = self.keys.to_keys(&repaired);
            info!(keys = keys.len(), fields = fields.len(), "Dropping inconsistent cached fields");
            metrics::record_read_repair(keys.len(), fields.len());
            self.client.hdel(&keys, &fields).await;
        }

        metrics::record_operation("fetch", "success");
        Ok(sort_by_ids(records, &ids))
    }

    /// Drop the cached entries of `ids`. Returns `false` when the backend failed.
    pub async fn delete(&self, ids: &[Id]) -> bool {
        let _timer = LatencyTimer::new("delete");
        let ok = self.client.del(&self.keys.to_keys(ids)).await;
        metrics::record_operation("delete", if ok { "success" } else { "error" });
        ok
    }
}

/// First occurrence wins.
fn dedup_ids(ids: &[Id]) -> Vec<Id> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Stable sort by position in `ids`; unknown ids last.
fn sort_by_ids(mut records: Vec<Record>, ids: &[Id]) -> Vec<Record> {
    let position: HashMap<Id, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    records.sort_by_key(|r| position.get(&r.id()).copied().unwrap_or(usize::MAX));
    records
}
