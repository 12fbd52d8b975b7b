// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Rebuilding a nested record from one flat record.
//!
//! Layers are rebuilt bottom-up: a node's items are grouped into entities,
//! its associations are rebuilt recursively, then each child entity is hung
//! under the parent named by its `p_id`. Whenever a layer cannot be trusted
//! (an entity lacks an attribute, a child has no parent in this layer, or an
//! entity's items disagree about their parent) every path of that layer and
//! its descendants is reported invalid.

use std::collections::BTreeSet;

use crate::field_mask::{join_path, AssocKind, FieldMask, ID_FIELD};
use crate::item::FlatRecord;
use crate::record::Record;

use super::entity::Layer;

/// Reconstructed record plus the paths found untrustworthy on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub record: Record,
    pub invalid_paths: BTreeSet<String>,
}

impl Decoded {
    pub fn is_valid(&self) -> bool {
        self.invalid_paths.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValueDecoder;

impl ValueDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, flat: &FlatRecord, mask: &FieldMask) -> Decoded {
        let mut pass = DecodePass {
            flat,
            invalid: BTreeSet::new(),
        };
        let root = pass.fetch(mask, "").into_root(flat.id());

        let record = match root {
            Some(record) => record,
            None => {
                pass.invalid.extend(mask.paths());
                Record::new(flat.id())
            }
        };

        Decoded {
            record,
            invalid_paths: pass.invalid,
        }
    }
}

struct DecodePass<'f> {
    flat: &'f FlatRecord,
    invalid: BTreeSet<String>,
}

impl DecodePass<'_> {
    fn fetch<'m>(&mut self, mask: &'m FieldMask, prefix: &str) -> Layer<'m> {
        let mut layer = self.fetch_layer(mask, prefix);
        self.assign_associations(&mut layer, mask, prefix);
        layer
    }

    fn fetch_layer<'m>(&mut self, mask: &'m FieldMask, prefix: &str) -> Layer<'m> {
        let mut layer = Layer::default();

        // `id` first, so an entity's parent link comes from its id item.
        let id_attr = mask.attrs().get(ID_FIELD).map(String::as_str);
        let other_attrs = mask.attrs().iter().map(String::as_str).filter(|a| *a != ID_FIELD);

        for attr in id_attr.into_iter().chain(other_attrs) {
            for item in self.flat.get(&join_path(prefix, attr)).items() {
                layer.entry(mask, item).push_attr(attr, item.clone());
            }
        }

        if layer.entities().any(|e| !e.is_complete() || e.is_conflicting()) {
            self.invalidate(mask, prefix);
        }

        layer
    }

    fn assign_associations<'m>(&mut self, parents: &mut Layer<'m>, mask: &'m FieldMask, prefix: &str) {
        for (name, kind, child_mask) in mask.associations() {
            let children = self.fetch(child_mask, &join_path(prefix, name));

            for child in children.into_entities() {
                let parent = if child.is_conflicting() {
                    None
                } else {
                    child.p_id().and_then(|p_id| parents.get_mut(p_id))
                };

                match parent {
                    Some(parent) => {
                        let record = child.into_record();
                        match kind {
                            AssocKind::HasOne => parent.set_one(name, record),
                            AssocKind::HasMany => parent.push_many(name, record),
                        }
                    }
                    // Orphan: this layer and the child layer disagree.
                    None => self.invalidate(mask, prefix),
                }
            }
        }
    }

    fn invalidate(&mut self, mask: &FieldMask, prefix: &str) {
        self.invalid.extend(mask.paths_under(prefix));
    }
}
