// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Flat representation of a record tree.
//!
//! Each field path of a root entity maps to a list of [`Item`]s, one per
//! entity instance at that tree position. The list is held in a [`Slot`]
//! that keeps "not cached" and "cached, known empty" apart:
//!
//! ```text
//! fmcache:1
//!   id                   Present [{value:1,  id:1,  p_id:null}]
//!   profile.id           Present [{value:3,  id:3,  p_id:1}]
//!   profile.schools.id   Empty   []
//!   profile.schools.name Missing (never written, expired or deleted)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Id;

/// One stored instance of a field path's value.
///
/// Serialized as `{"value":..,"id":..,"p_id":..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub value: Value,
    pub id: Id,
    #[serde(default)]
    pub p_id: Option<Id>,
}

impl Item {
    pub fn new(value: Value, id: Id, p_id: Option<Id>) -> Self {
        Self { value, id, p_id }
    }

    /// The `id` item of a root entity.
    pub fn root_id(id: Id) -> Self {
        Self::new(Value::from(id), id, None)
    }
}

/// Cached content of one field path.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Slot {
    /// Not cached.
    #[default]
    Missing,
    /// Cached and confirmed empty.
    Empty,
    /// Cached items, never empty.
    Present(Vec<Item>),
}

static MISSING: Slot = Slot::Missing;

impl Slot {
    /// `Empty` for an empty list, `Present` otherwise.
    pub fn from_items(items: Vec<Item>) -> Self {
        if items.is_empty() {
            Slot::Empty
        } else {
            Slot::Present(items)
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Slot::Missing)
    }

    /// Items of the slot; empty for `Missing` and `Empty`.
    pub fn items(&self) -> &[Item] {
        match self {
            Slot::Present(items) => items,
            Slot::Missing | Slot::Empty => &[],
        }
    }

    pub fn push(&mut self, item: Item) {
        match self {
            Slot::Present(items) => items.push(item),
            Slot::Missing | Slot::Empty => *self = Slot::Present(vec![item]),
        }
    }
}

/// All field paths of one root entity.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    id: Id,
    slots: BTreeMap<String, Slot>,
}

impl FlatRecord {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            slots: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// Slot at `path`; absent paths are `Missing`.
    pub fn get(&self, path: &str) -> &Slot {
        self.slots.get(path).unwrap_or(&MISSING)
    }

    pub fn set(&mut self, path: impl Into<String>, slot: Slot) {
        self.slots.insert(path.into(), slot);
    }

    /// Append an item at `path`.
    pub fn push(&mut self, path: &str, item: Item) {
        match self.slots.get_mut(path) {
            Some(slot) => slot.push(item),
            None => {
                self.slots.insert(path.to_string(), Slot::Present(vec![item]));
            }
        }
    }

    /// Forget the cached content of each path.
    pub fn mark_missing<I, S>(&mut self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            self.slots.remove(path.as_ref());
        }
    }

    /// Overlay `newer`: every non-missing slot of `newer` replaces ours.
    pub fn merge(&mut self, newer: FlatRecord) {
        for (path, slot) in newer.slots {
            if !slot.is_missing() {
                self.slots.insert(path, slot);
            }
        }
    }

    pub fn slots(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.slots.iter().map(|(path, slot)| (path.as_str(), slot))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_json_shape() {
        let item = Item::root_id(1);
        assert_eq!(
            serde_json::to_string(&item).unwrap(),
            r#"{"value":1,"id":1,"p_id":null}"#
        );

        let nested: Item = serde_json::from_str(r#"{"id":20,"p_id":3,"value":"U"}"#).unwrap();
        assert_eq!(nested, Item::new(json!("U"), 20, Some(3)));
    }

    #[test]
    fn test_item_without_p_id_key() {
        let item: Item = serde_json::from_str(r#"{"value":null,"id":4}"#).unwrap();
        assert_eq!(item.p_id, None);
    }

    #[test]
    fn test_slot_from_items() {
        assert_eq!(Slot::from_items(vec![]), Slot::Empty);
        assert!(matches!(Slot::from_items(vec![Item::root_id(1)]), Slot::Present(_)));
    }

    #[test]
    fn test_slot_push_upgrades() {
        let mut slot = Slot::Empty;
        slot.push(Item::root_id(1));
        slot.push(Item::root_id(2));
        assert_eq!(slot.items().len(), 2);

        let mut missing = Slot::Missing;
        missing.push(Item::root_id(1));
        assert!(!missing.is_missing());
    }

    #[test]
    fn test_absent_path_is_missing() {
        let flat = FlatRecord::new(1);
        assert!(flat.get("name").is_missing());
        assert!(flat.get("name").items().is_empty());
    }

    #[test]
    fn test_merge_newer_wins_but_keeps_older_paths() {
        let mut older = FlatRecord::new(1);
        older.set("id", Slot::from_items(vec![Item::root_id(1)]));
        older.set("name", Slot::from_items(vec![Item::new(json!("old"), 1, None)]));

        let mut newer = FlatRecord::new(1);
        newer.set("name", Slot::from_items(vec![Item::new(json!("new"), 1, None)]));
        newer.set("profile.id", Slot::Empty);
        newer.set("profile.introduction", Slot::Missing);

        older.merge(newer);
        assert_eq!(older.get("name").items()[0].value, json!("new"));
        assert_eq!(older.get("id").items()[0].value, json!(1));
        assert_eq!(older.get("profile.id"), &Slot::Empty);
        assert!(older.get("profile.introduction").is_missing());
    }

    #[test]
    fn test_mark_missing() {
        let mut flat = FlatRecord::new(1);
        flat.set("id", Slot::Empty);
        flat.set("name", Slot::Empty);
        flat.mark_missing(["name"]);
        assert!(flat.get("name").is_missing());
        assert!(!flat.get("id").is_missing());
        assert_eq!(flat.len(), 1);
    }
}
