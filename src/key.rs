// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cache key derivation: one hash key per root id, `"<prefix>:<id>"`.

use crate::error::FmCacheError;
use crate::record::Id;

pub const DEFAULT_KEY_PREFIX: &str = "fmcache";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGen {
    /// Prefix including the trailing `:`.
    prefix: String,
}

impl Default for KeyGen {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

impl KeyGen {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: format!("{}:", prefix),
        }
    }

    pub fn to_key(&self, id: Id) -> String {
        format!("{}{}", self.prefix, id)
    }

    pub fn to_keys(&self, ids: &[Id]) -> Vec<String> {
        ids.iter().map(|&id| self.to_key(id)).collect()
    }

    /// Inverse of [`KeyGen::to_key`]. A key without our prefix or without a
    /// numeric id is a bug in the caller or a foreign key, never cache state.
    pub fn to_id(&self, key: &str) -> Result<Id, FmCacheError> {
        key.strip_prefix(&self.prefix)
            .and_then(|rest| rest.parse::<Id>().ok())
            .ok_or_else(|| FmCacheError::MalformedKey(key.to_string()))
    }

    pub fn to_ids(&self, keys: &[String]) -> Result<Vec<Id>, FmCacheError> {
        keys.iter().map(|key| self.to_id(key)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prefix() {
        let keys = KeyGen::default();
        assert_eq!(keys.to_key(1), "fmcache:1");
        assert_eq!(keys.to_keys(&[1, 2]), vec!["fmcache:1", "fmcache:2"]);
    }

    #[test]
    fn test_custom_prefix_round_trip() {
        let keys = KeyGen::new("users");
        assert_eq!(keys.to_key(42), "users:42");
        assert_eq!(keys.to_id("users:42").unwrap(), 42);
        assert_eq!(keys.to_ids(&["users:1".into(), "users:-3".into()]).unwrap(), vec![1, -3]);
    }

    #[test]
    fn test_wrong_prefix_is_malformed() {
        let keys = KeyGen::default();
        let err = keys.to_id("other:1").unwrap_err();
        assert!(matches!(err, FmCacheError::MalformedKey(k) if k == "other:1"));
    }

    #[test]
    fn test_non_numeric_suffix_is_malformed() {
        let keys = KeyGen::default();
        assert!(keys.to_id("fmcache:abc").is_err());
        assert!(keys.to_id("fmcache:").is_err());
        assert!(keys.to_id("fmcache").is_err());
    }
}
