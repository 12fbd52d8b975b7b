// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Field masks: the tree of field paths a caller asks for.
//!
//! A mask node lists the leaf attributes wanted at that level plus named
//! child masks for has-one and has-many associations:
//!
//! ```text
//! user            attrs: {id, name}
//! └── profile     (has-one)  attrs: {id, introduction}
//!     └── schools (has-many) attrs: {id, name}
//! ```
//!
//! enumerates the paths `id`, `name`, `profile.id`, `profile.introduction`,
//! `profile.schools.id`, `profile.schools.name`.
//!
//! # Example
//!
//! ```
//! use fmcache::FieldMask;
//!
//! let mask = FieldMask::new()
//!     .with_attr("name")
//!     .with_has_one("profile", FieldMask::new().with_attr("introduction"))
//!     .normalized();
//!
//! assert_eq!(mask.paths(), vec!["id", "name", "profile.id", "profile.introduction"]);
//! ```

pub mod parser;

use std::collections::{BTreeMap, BTreeSet};

pub use parser::{EntitySchema, FieldMaskParser, MaskParser, Schema, SchemaParser};

/// The identity attribute every normalized mask node carries.
pub const ID_FIELD: &str = "id";

/// Join a dotted prefix and a name (`""` + `id` → `id`, `profile` + `id` → `profile.id`).
pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Kind of association between a mask node and a child node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssocKind {
    HasOne,
    HasMany,
}

/// Recursive field mask node.
///
/// Equality is structural: two masks are equal when they request the same
/// attributes and associations, regardless of construction order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMask {
    attrs: BTreeSet<String>,
    has_ones: BTreeMap<String, FieldMask>,
    has_manies: BTreeMap<String, FieldMask>,
}

impl FieldMask {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mask requesting only `id`.
    #[must_use]
    pub fn id_only() -> Self {
        Self::new().with_attr(ID_FIELD)
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>) -> Self {
        self.attrs.insert(name.into());
        self
    }

    #[must_use]
    pub fn with_attrs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_has_one(mut self, name: impl Into<String>, mask: FieldMask) -> Self {
        self.has_ones.insert(name.into(), mask);
        self
    }

    #[must_use]
    pub fn with_has_many(mut self, name: impl Into<String>, mask: FieldMask) -> Self {
        self.has_manies.insert(name.into(), mask);
        self
    }

    pub fn attrs(&self) -> &BTreeSet<String> {
        &self.attrs
    }

    pub fn has_ones(&self) -> &BTreeMap<String, FieldMask> {
        &self.has_ones
    }

    pub fn has_manies(&self) -> &BTreeMap<String, FieldMask> {
        &self.has_manies
    }

    pub fn has_one(&self, name: &str) -> Option<&FieldMask> {
        self.has_ones.get(name)
    }

    pub fn has_many(&self, name: &str) -> Option<&FieldMask> {
        self.has_manies.get(name)
    }

    /// All associations, has-ones first.
    pub fn associations(&self) -> impl Iterator<Item = (&str, AssocKind, &FieldMask)> {
        self.has_ones
            .iter()
            .map(|(name, mask)| (name.as_str(), AssocKind::HasOne, mask))
            .chain(
                self.has_manies
                    .iter()
                    .map(|(name, mask)| (name.as_str(), AssocKind::HasMany, mask)),
            )
    }

    /// Mutable access to the child node at `name`, creating it for `kind` if absent.
    pub(crate) fn child_mut(&mut self, name: &str, kind: AssocKind) -> &mut FieldMask {
        let map = match kind {
            AssocKind::HasOne => &mut self.has_ones,
            AssocKind::HasMany => &mut self.has_manies,
        };
        map.entry(name.to_string()).or_default()
    }

    pub(crate) fn insert_attr(&mut self, name: &str) {
        if !self.attrs.contains(name) {
            self.attrs.insert(name.to_string());
        }
    }

    /// Insert `id` into every node of the tree.
    pub fn normalize(&mut self) {
        self.insert_attr(ID_FIELD);
        for child in self.has_ones.values_mut() {
            child.normalize();
        }
        for child in self.has_manies.values_mut() {
            child.normalize();
        }
    }

    /// Consuming form of [`FieldMask::normalize`].
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// True when every node of the tree carries `id`.
    pub fn is_normalized(&self) -> bool {
        self.attrs.contains(ID_FIELD)
            && self.has_ones.values().all(FieldMask::is_normalized)
            && self.has_manies.values().all(FieldMask::is_normalized)
    }

    /// Every dotted leaf path under this node.
    pub fn paths(&self) -> Vec<String> {
        self.paths_under("")
    }

    /// Every dotted leaf path under this node, prefixed with `prefix`.
    pub fn paths_under(&self, prefix: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths(prefix, &mut out);
        out
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for attr in &self.attrs {
            out.push(join_path(prefix, attr));
        }
        for (name, _, child) in self.associations() {
            child.collect_paths(&join_path(prefix, name), out);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty() && self.has_ones.is_empty() && self.has_manies.is_empty()
    }
}
