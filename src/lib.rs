// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # fmcache
//!
//! A field-mask aware partial cache for nested entity graphs.
//!
//! Records are trees: an entity with has-one and has-many associations,
//! arbitrarily deep. A [`FieldMask`] names the subset of that tree a caller
//! wants. The cache stores exactly that subset in a hash-shaped backend (one
//! hash per root entity, one field per dotted path), rebuilds it on read from
//! whatever fragments are still there, and works out the smallest set of ids
//! and paths that must be loaded from the system of record to finish the
//! request.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     FmCache (engine)                        │
//! │  • write / read / fetch / delete                           │
//! │  • loader callback for incomplete records                  │
//! └─────────────────────────────────────────────────────────────┘
//!            │                                  ▲
//!         Encoder                            Decoder
//!   (records → flat items)     (FieldsChecker + ValueDecoder)
//!            ▼                                  │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Codec (per-field item lists)                │
//! └─────────────────────────────────────────────────────────────┘
//!            │                                  ▲
//!            ▼                                  │
//! ┌─────────────────────────────────────────────────────────────┐
//! │        Client (soft failures) → HashStore (Redis, memory)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fmcache::{EntitySchema, FmCache, FmCacheConfig, Record, Schema, SchemaParser};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fmcache::FmCacheError> {
//!     let parser = SchemaParser::new(
//!         Schema::new("User")
//!             .entity("User", EntitySchema::new().attrs(["name"]).has_one("profile", "Profile"))
//!             .entity("Profile", EntitySchema::new().attrs(["introduction"])),
//!     );
//!     let config = FmCacheConfig {
//!         redis_url: Some("redis://localhost:6379".into()),
//!         ..Default::default()
//!     };
//!     let cache = FmCache::connect(&config, Arc::new(parser)).await?;
//!
//!     let mask = cache.parse(["name", "profile.introduction"])?;
//!     let users = cache
//!         .fetch(&[1, 2], &mask, |ids, _mask| async move {
//!             // Load `ids` from the database, restricted to `_mask`.
//!             Ok(ids.into_iter().map(Record::new).collect())
//!         })
//!         .await?;
//!     println!("{:?}", users);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: [`FmCache`], the public entry point
//! - [`field_mask`]: mask trees and the parser seam
//! - [`record`], [`item`]: nested and flat representations
//! - [`encoder`], [`decoder`]: conversion and consistency checking
//! - [`storage`]: hash backends (Redis, memory)
//! - [`client`]: soft-failing backend wrapper

pub mod client;
pub mod codec;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod field_mask;
pub mod incomplete;
pub mod item;
pub mod key;
pub mod metrics;
pub mod record;
pub mod storage;

pub use client::{Client, Notifier};
pub use codec::{Codec, ItemSerializer, JsonSerializer};
pub use config::FmCacheConfig;
pub use decoder::{DecodeOutcome, DecodeResult, Decoder};
pub use encoder::Encoder;
pub use engine::{FmCache, ReadResult};
pub use error::{FmCacheError, LoadError};
pub use field_mask::{EntitySchema, FieldMask, FieldMaskParser, MaskParser, Schema, SchemaParser};
pub use incomplete::IncompleteInfo;
pub use item::{FlatRecord, Item, Slot};
pub use key::KeyGen;
pub use metrics::LatencyTimer;
pub use record::{Field, Id, Record};
pub use storage::{HashStore, InMemoryHashStore, RedisHashStore, StorageError};
