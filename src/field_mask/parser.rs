// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Turning dotted field paths into [`FieldMask`] trees.
//!
//! The engine only depends on the [`FieldMaskParser`] trait; callers inject
//! whatever parser matches their data model. [`SchemaParser`] is a small
//! implementation that resolves each path segment against a declared
//! [`Schema`] of entities.
//!
//! # Example
//!
//! ```
//! use fmcache::{EntitySchema, FieldMaskParser, Schema, SchemaParser};
//!
//! let schema = Schema::new("User")
//!     .entity("User", EntitySchema::new().attrs(["name"]).has_one("profile", "Profile"))
//!     .entity("Profile", EntitySchema::new().attrs(["introduction"]));
//! let parser = SchemaParser::new(schema);
//!
//! let mask = parser.parse(&["name".into(), "profile.introduction".into()]).unwrap();
//! assert!(mask.has_one("profile").is_some());
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use super::{AssocKind, FieldMask, ID_FIELD};
use crate::error::FmCacheError;

/// Parses a list of dotted field paths into a mask tree.
pub trait FieldMaskParser: Send + Sync {
    fn parse(&self, paths: &[String]) -> Result<FieldMask, FmCacheError>;
}

impl<F> FieldMaskParser for F
where
    F: Fn(&[String]) -> Result<FieldMask, FmCacheError> + Send + Sync,
{
    fn parse(&self, paths: &[String]) -> Result<FieldMask, FmCacheError> {
        self(paths)
    }
}

/// Wraps an injected parser so every mask it produces is id-normalized.
#[derive(Clone)]
pub struct MaskParser {
    inner: Arc<dyn FieldMaskParser>,
}

impl MaskParser {
    pub fn new(inner: Arc<dyn FieldMaskParser>) -> Self {
        Self { inner }
    }

    /// Parse `paths` and normalize the result.
    pub fn parse<I, S>(&self, paths: I) -> Result<FieldMask, FmCacheError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths: Vec<String> = paths.into_iter().map(|p| p.as_ref().to_string()).collect();
        Ok(self.inner.parse(&paths)?.normalized())
    }
}

impl std::fmt::Debug for MaskParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskParser").finish_non_exhaustive()
    }
}

/// Attributes and associations of one entity type.
///
/// `id` is implicitly an attribute of every entity.
#[derive(Debug, Clone, Default)]
pub struct EntitySchema {
    attrs: BTreeSet<String>,
    has_ones: BTreeMap<String, String>,
    has_manies: BTreeMap<String, String>,
}

impl EntitySchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn attrs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declare a singular association `name` pointing at entity `target`.
    #[must_use]
    pub fn has_one(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.has_ones.insert(name.into(), target.into());
        self
    }

    /// Declare a collection association `name` pointing at entity `target`.
    #[must_use]
    pub fn has_many(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.has_manies.insert(name.into(), target.into());
        self
    }

    fn has_attr(&self, name: &str) -> bool {
        name == ID_FIELD || self.attrs.contains(name)
    }

    fn association(&self, name: &str) -> Option<(AssocKind, &str)> {
        if let Some(target) = self.has_ones.get(name) {
            return Some((AssocKind::HasOne, target));
        }
        self.has_manies
            .get(name)
            .map(|target| (AssocKind::HasMany, target.as_str()))
    }
}

/// Entity declarations reachable from a root entity.
#[derive(Debug, Clone)]
pub struct Schema {
    root: String,
    entities: HashMap<String, EntitySchema>,
}

impl Schema {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            entities: HashMap::new(),
        }
    }

    #[must_use]
    pub fn entity(mut self, name: impl Into<String>, schema: EntitySchema) -> Self {
        self.entities.insert(name.into(), schema);
        self
    }

    fn lookup(&self, name: &str) -> Result<&EntitySchema, FmCacheError> {
        self.entities
            .get(name)
            .ok_or_else(|| FmCacheError::Config(format!("entity `{}` is not declared", name)))
    }
}

/// Resolves dotted paths against a [`Schema`].
///
/// A path ending at an association requests that association's `id`.
#[derive(Debug, Clone)]
pub struct SchemaParser {
    schema: Schema,
}

impl SchemaParser {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    fn add_path(&self, mask: &mut FieldMask, path: &str) -> Result<(), FmCacheError> {
        let unknown = || FmCacheError::UnknownField {
            path: path.to_string(),
        };
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(unknown());
        }

        let mut entity = self.schema.lookup(&self.schema.root)?;
        let mut node = mask;
        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            if last && entity.has_attr(segment) {
                node.insert_attr(segment);
                return Ok(());
            }
            let (kind, target) = entity.association(segment).ok_or_else(unknown)?;
            entity = self.schema.lookup(target)?;
            node = node.child_mut(segment, kind);
            if last {
                node.insert_attr(ID_FIELD);
            }
        }
        Ok(())
    }
}

impl FieldMaskParser for SchemaParser {
    fn parse(&self, paths: &[String]) -> Result<FieldMask, FmCacheError> {
        let mut mask = FieldMask::new();
        for path in paths {
            self.add_path(&mut mask, path)?;
        }
        Ok(mask)
    }
}
