// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Hash-shaped cache backends.

pub mod memory;
pub mod redis;
pub mod traits;

pub use memory::InMemoryHashStore;
pub use self::redis::RedisHashStore;
pub use traits::{FetchedHashes, HashBatch, HashStore, StorageError};
