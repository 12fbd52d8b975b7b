// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Depth-first flattening of one record tree into items per field path.

use serde_json::Value;

use crate::field_mask::{join_path, FieldMask};
use crate::item::{FlatRecord, Item};
use crate::record::{Id, Record};

pub(crate) struct Itemizer<'a> {
    flat: &'a mut FlatRecord,
}

impl<'a> Itemizer<'a> {
    pub(crate) fn new(flat: &'a mut FlatRecord) -> Self {
        Self { flat }
    }

    pub(crate) fn run(&mut self, record: &Record, mask: &FieldMask) {
        self.traverse(record, mask, "", None);
    }

    fn traverse(&mut self, record: &Record, mask: &FieldMask, prefix: &str, p_id: Option<Id>) {
        let id = record.id();

        for attr in mask.attrs() {
            let value = record.scalar(attr).unwrap_or(Value::Null);
            self.flat.push(&join_path(prefix, attr), Item::new(value, id, p_id));
        }

        // Absent associations add nothing: their paths stay known-empty.
        for (name, child_mask) in mask.has_ones() {
            if let Some(child) = record.one(name) {
                self.traverse(child, child_mask, &join_path(prefix, name), Some(id));
            }
        }

        for (name, child_mask) in mask.has_manies() {
            let path = join_path(prefix, name);
            for child in record.many(name) {
                self.traverse(child, child_mask, &path, Some(id));
            }
        }
    }
}
