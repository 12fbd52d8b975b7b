// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Item-list serialization between [`FlatRecord`]s and the string hashes the
//! store keeps.
//!
//! Each field is serialized on its own, so one corrupt field only costs that
//! field: it decodes as [`Slot::Missing`] and the rest of the record survives.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::error::FmCacheError;
use crate::item::{FlatRecord, Item, Slot};
use crate::metrics;
use crate::record::Id;

/// Serializes one field's item list.
pub trait ItemSerializer: Send + Sync {
    fn dump(&self, items: &[Item]) -> Result<String, FmCacheError>;
    fn load(&self, raw: &str) -> Result<Vec<Item>, FmCacheError>;
}

/// Default serializer: a JSON array of `{"value","id","p_id"}` objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl ItemSerializer for JsonSerializer {
    fn dump(&self, items: &[Item]) -> Result<String, FmCacheError> {
        serde_json::to_string(items).map_err(|e| FmCacheError::Serialization(e.to_string()))
    }

    fn load(&self, raw: &str) -> Result<Vec<Item>, FmCacheError> {
        serde_json::from_str(raw).map_err(|e| FmCacheError::Serialization(e.to_string()))
    }
}

/// Applies an [`ItemSerializer`] field by field.
#[derive(Clone)]
pub struct Codec {
    serializer: Arc<dyn ItemSerializer>,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(Arc::new(JsonSerializer))
    }
}

impl Codec {
    pub fn new(serializer: Arc<dyn ItemSerializer>) -> Self {
        Self { serializer }
    }

    /// Serialize every cached slot. `Missing` slots are not written; a field
    /// that fails to serialize is skipped and therefore stays uncached.
    pub fn encode(&self, flat: &FlatRecord) -> HashMap<String, String> {
        let mut out = HashMap::with_capacity(flat.len());
        for (path, slot) in flat.slots() {
            if slot.is_missing() {
                continue;
            }
            match self.serializer.dump(slot.items()) {
                Ok(raw) => {
                    out.insert(path.to_string(), raw);
                }
                Err(e) => {
                    warn!(id = flat.id(), field = path, error = %e, "Failed to serialize field, skipping");
                }
            }
        }
        out
    }

    /// Deserialize a fetched hash. `None` and undecodable fields become `Missing`.
    pub fn decode(&self, id: Id, raw: HashMap<String, Option<String>>) -> FlatRecord {
        let mut flat = FlatRecord::new(id);
        for (path, value) in raw {
            let Some(value) = value else { continue };
            match self.serializer.load(&value) {
                Ok(items) => flat.set(path, Slot::from_items(items)),
                Err(e) => {
                    warn!(id, field = %path, error = %e, "Undecodable cached field, treating as missing");
                    metrics::record_decode_failure();
                }
            }
        }
        flat
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}
