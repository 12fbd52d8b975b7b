// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-entity accumulators used while rebuilding one layer of a tree.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::field_mask::{FieldMask, ID_FIELD};
use crate::item::Item;
use crate::record::{Field, Id, Record};

/// Everything collected so far for one entity at one tree position.
#[derive(Debug)]
pub(crate) struct Entity<'m> {
    mask: &'m FieldMask,
    id: Id,
    p_id: Option<Id>,
    attrs: BTreeMap<String, Value>,
    has_ones: BTreeMap<String, Option<Record>>,
    has_manies: BTreeMap<String, Vec<Record>>,
    /// Items of this entity disagree about its parent.
    conflicting: bool,
}

impl<'m> Entity<'m> {
    fn new(mask: &'m FieldMask, id: Id, p_id: Option<Id>) -> Self {
        Self {
            mask,
            id,
            p_id,
            attrs: BTreeMap::new(),
            has_ones: mask.has_ones().keys().map(|name| (name.clone(), None)).collect(),
            has_manies: mask.has_manies().keys().map(|name| (name.clone(), Vec::new())).collect(),
            conflicting: false,
        }
    }

    pub(crate) fn p_id(&self) -> Option<Id> {
        self.p_id
    }

    pub(crate) fn is_conflicting(&self) -> bool {
        self.conflicting
    }

    /// Record attribute `name`. The first item seen fixes the parent link
    /// (layers read `id` first, so normally the id item does).
    ///
    /// # Panics
    ///
    /// If `name` is not an attribute of this entity's mask.
    pub(crate) fn push_attr(&mut self, name: &str, item: Item) {
        assert!(self.mask.attrs().contains(name), "attribute `{}` not in mask", name);
        if item.p_id != self.p_id {
            self.conflicting = true;
        }
        self.attrs.insert(name.to_string(), item.value);
    }

    /// Every attribute the mask asks for has been received.
    pub(crate) fn is_complete(&self) -> bool {
        self.mask.attrs().iter().all(|attr| self.attrs.contains_key(attr))
    }

    pub(crate) fn set_one(&mut self, name: &str, child: Record) {
        self.has_ones.insert(name.to_string(), Some(child));
    }

    pub(crate) fn push_many(&mut self, name: &str, child: Record) {
        self.has_manies.entry(name.to_string()).or_default().push(child);
    }

    pub(crate) fn into_record(self) -> Record {
        let mut record = Record::new(self.id);
        for (name, value) in self.attrs {
            if name != ID_FIELD {
                record.set(name, Field::Scalar(value));
            }
        }
        for (name, child) in self.has_ones {
            record.set(name, Field::One(child.map(Box::new)));
        }
        for (name, children) in self.has_manies {
            record.set(name, Field::Many(children));
        }
        record
    }
}

/// Entities of one layer, in discovery order.
#[derive(Debug, Default)]
pub(crate) struct Layer<'m> {
    entities: Vec<Entity<'m>>,
    index: HashMap<Id, usize>,
}

impl<'m> Layer<'m> {
    /// Entity owning `item`, created on first sight.
    pub(crate) fn entry(&mut self, mask: &'m FieldMask, item: &Item) -> &mut Entity<'m> {
        let idx = match self.index.get(&item.id) {
            Some(&idx) => idx,
            None => {
                self.entities.push(Entity::new(mask, item.id, item.p_id));
                self.index.insert(item.id, self.entities.len() - 1);
                self.entities.len() - 1
            }
        };
        &mut self.entities[idx]
    }

    pub(crate) fn get_mut(&mut self, id: Id) -> Option<&mut Entity<'m>> {
        let idx = *self.index.get(&id)?;
        self.entities.get_mut(idx)
    }

    pub(crate) fn entities(&self) -> impl Iterator<Item = &Entity<'m>> {
        self.entities.iter()
    }

    pub(crate) fn into_entities(self) -> impl Iterator<Item = Entity<'m>> {
        self.entities.into_iter()
    }

    /// The entity `id` if present, else the first one discovered.
    pub(crate) fn into_root(self, id: Id) -> Option<Record> {
        let idx = self.index.get(&id).copied().unwrap_or(0);
        self.entities.into_iter().nth(idx).map(Entity::into_record)
    }
}
