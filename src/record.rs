// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Nested records: an entity with scalar attributes and nested associations.
//!
//! Which names are attributes and which are associations is only known at
//! runtime (from the [`FieldMask`]), so a record is an ordered map from name
//! to a [`Field`] variant rather than a fixed struct.
//!
//! # Example
//!
//! ```
//! use fmcache::Record;
//! use serde_json::json;
//!
//! let user = Record::new(1)
//!     .with("name", "Taro")
//!     .with_one("profile", Some(Record::new(3).with("introduction", "Hello")));
//!
//! assert_eq!(
//!     user.to_json(),
//!     json!({"id": 1, "name": "Taro", "profile": {"id": 3, "introduction": "Hello"}})
//! );
//! ```

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::error::FmCacheError;
use crate::field_mask::{FieldMask, ID_FIELD};

/// Entity identity.
pub type Id = i64;

/// One named member of a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Leaf attribute value (may legitimately be `null`).
    Scalar(Value),
    /// Singular association, `None` when the association is empty.
    One(Option<Box<Record>>),
    /// Collection association, in order.
    Many(Vec<Record>),
}

impl Field {
    pub fn to_json(&self) -> Value {
        match self {
            Field::Scalar(value) => value.clone(),
            Field::One(Some(record)) => record.to_json(),
            Field::One(None) => Value::Null,
            Field::Many(records) => Value::Array(records.iter().map(Record::to_json).collect()),
        }
    }
}

/// A nested entity record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: Id,
    fields: BTreeMap<String, Field>,
}

impl Record {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// Set a scalar attribute.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, Field::Scalar(value.into()));
        self
    }

    /// Set a has-one association.
    #[must_use]
    pub fn with_one(mut self, name: impl Into<String>, child: Option<Record>) -> Self {
        self.set(name, Field::One(child.map(Box::new)));
        self
    }

    /// Set a has-many association.
    #[must_use]
    pub fn with_many(mut self, name: impl Into<String>, children: Vec<Record>) -> Self {
        self.set(name, Field::Many(children));
        self
    }

    /// Insert or replace a field. `id` is not a field; it is the record identity.
    pub fn set(&mut self, name: impl Into<String>, field: Field) {
        let name = name.into();
        if name != ID_FIELD {
            self.fields.insert(name, field);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Field> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Value of attribute `name`; `id` resolves to the record identity.
    pub fn scalar(&self, name: &str) -> Option<Value> {
        if name == ID_FIELD {
            return Some(Value::from(self.id));
        }
        match self.fields.get(name) {
            Some(Field::Scalar(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Nested record of has-one `name`, if present and non-null.
    pub fn one(&self, name: &str) -> Option<&Record> {
        match self.fields.get(name) {
            Some(Field::One(Some(record))) => Some(record),
            _ => None,
        }
    }

    /// Nested records of has-many `name` (empty when absent).
    pub fn many(&self, name: &str) -> &[Record] {
        match self.fields.get(name) {
            Some(Field::Many(records)) => records,
            _ => &[],
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(ID_FIELD.to_string(), Value::from(self.id));
        for (name, field) in &self.fields {
            map.insert(name.clone(), field.to_json());
        }
        Value::Object(map)
    }

    /// Build a record from JSON, using `mask` to recognise associations.
    ///
    /// Names the mask lists as has-one / has-many become nested records; every
    /// other member is kept as a scalar, including object-valued ones.
    pub fn from_json(value: &Value, mask: &FieldMask) -> Result<Self, FmCacheError> {
        let object = value
            .as_object()
            .ok_or_else(|| FmCacheError::InvalidRecord(format!("expected an object, got {}", value)))?;
        let id = object
            .get(ID_FIELD)
            .and_then(Value::as_i64)
            .ok_or_else(|| FmCacheError::InvalidRecord(format!("missing integer id in {}", value)))?;

        let mut record = Record::new(id);
        for (name, member) in object {
            if name == ID_FIELD {
                continue;
            }
            let field = if let Some(child_mask) = mask.has_one(name) {
                match member {
                    Value::Null => Field::One(None),
                    other => Field::One(Some(Box::new(Record::from_json(other, child_mask)?))),
                }
            } else if let Some(child_mask) = mask.has_many(name) {
                let items = match member {
                    Value::Null => &[][..],
                    Value::Array(items) => items.as_slice(),
                    other => {
                        return Err(FmCacheError::InvalidRecord(format!(
                            "`{}` must be an array, got {}",
                            name, other
                        )))
                    }
                };
                Field::Many(
                    items
                        .iter()
                        .map(|item| Record::from_json(item, child_mask))
                        .collect::<Result<_, _>>()?,
                )
            } else {
                Field::Scalar(member.clone())
            };
            record.fields.insert(name.clone(), field);
        }
        Ok(record)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ID_FIELD, &self.id)?;
        for (name, field) in &self.fields {
            map.serialize_entry(name, field)?;
        }
        map.end()
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Scalar(value) => value.serialize(serializer),
            Field::One(child) => child.serialize(serializer),
            Field::Many(children) => children.serialize(serializer),
        }
    }
}
