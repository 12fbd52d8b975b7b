// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Crate-level error type.
//!
//! Cache-state problems (missing fields, orphans, unreachable backend) are
//! never errors: they surface as partial results. The variants here are
//! contract violations by the calling code or failures of caller-supplied
//! collaborators.

use thiserror::Error;

use crate::storage::traits::StorageError;

/// Error returned by a `fetch` loader.
pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum FmCacheError {
    /// A cache key did not carry the configured prefix or a numeric id.
    #[error("invalid key: {0}")]
    MalformedKey(String),

    /// A field path names an attribute or association the schema doesn't know.
    #[error("unknown field `{path}`")]
    UnknownField { path: String },

    /// A record could not be built from its JSON form.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// An item list could not be serialized or deserialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The caller-supplied loader failed.
    #[error("loader failed: {0}")]
    Loader(#[source] LoadError),

    /// Missing or inconsistent configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Backend failure outside the soft-failing request path (e.g. connecting).
    #[error(transparent)]
    Storage(#[from] StorageError),
}
