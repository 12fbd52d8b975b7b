// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Records + mask → flat records.
//!
//! Every path of the mask is first set to [`Slot::Empty`], so a path the
//! traversal never reaches (empty has-many, null has-one) is stored as
//! "known empty" rather than left uncached.
//!
//! ```text
//! {id:1, profile:{id:3, schools:[{id:20}, {id:21}]}}
//!
//!   id                 [{id:1,  p_id:null}]
//!   profile.id         [{id:3,  p_id:1}]
//!   profile.schools.id [{id:20, p_id:3}, {id:21, p_id:3}]
//! ```

mod itemizer;

use crate::field_mask::FieldMask;
use crate::item::{FlatRecord, Slot};
use crate::record::Record;

use itemizer::Itemizer;

#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder;

impl Encoder {
    pub fn new() -> Self {
        Self
    }

    /// Flatten each record under `mask`, one [`FlatRecord`] per root.
    pub fn encode(&self, values: &[Record], mask: &FieldMask) -> Vec<FlatRecord> {
        values.iter().map(|value| self.encode_one(value, mask)).collect()
    }

    pub fn encode_one(&self, value: &Record, mask: &FieldMask) -> FlatRecord {
        let mut flat = FlatRecord::new(value.id());
        for path in mask.paths() {
            flat.set(path, Slot::Empty);
        }
        Itemizer::new(&mut flat).run(value, mask);
        flat
    }
}
