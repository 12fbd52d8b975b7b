// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::BTreeSet;

use crate::field_mask::FieldMask;
use crate::record::Id;

/// The ids and field paths that must be refetched from the system of record
/// to complete a request.
///
/// `ids` keeps the order in which incompleteness was discovered; equality
/// compares id sets and masks.
#[derive(Debug, Clone)]
pub struct IncompleteInfo {
    pub ids: Vec<Id>,
    pub field_mask: FieldMask,
}

impl IncompleteInfo {
    pub fn new(ids: Vec<Id>, field_mask: FieldMask) -> Self {
        Self { ids, field_mask }
    }

    /// True when nothing needs refetching.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn id_set(&self) -> BTreeSet<Id> {
        self.ids.iter().copied().collect()
    }
}

impl PartialEq for IncompleteInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id_set() == other.id_set() && self.field_mask == other.field_mask
    }
}

impl Eq for IncompleteInfo {}
