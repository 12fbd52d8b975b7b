// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Flat records → nested records, split into trustworthy and not.
//!
//! # Passes
//!
//! ```text
//! flat records ──► FieldsChecker ──┬── consistent ──► ValueDecoder(full mask)
//!                                  │
//!                                  └── incomplete ──► ValueDecoder(mask - missing)
//! ```
//!
//! Records with missing paths are still decoded with the reduced mask so the
//! consistent part of them can be handed back to the caller (as invalid
//! values) and only the missing part has to be refetched.

mod entity;
pub mod fields_checker;
pub mod value_decoder;

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::FmCacheError;
use crate::field_mask::{FieldMask, MaskParser};
use crate::incomplete::IncompleteInfo;
use crate::item::FlatRecord;
use crate::record::Record;

pub use fields_checker::{CheckResult, FieldsChecker};
pub use value_decoder::{Decoded, ValueDecoder};

/// Result of decoding one batch with one mask.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeResult {
    pub values: Vec<Record>,
    pub invalid_values: Vec<Record>,
    pub invalid_paths: BTreeSet<String>,
}

/// Everything a caller needs after decoding a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutcome {
    /// Records fully valid for the requested mask.
    pub values: Vec<Record>,
    /// Records with at least one missing or invalid path, holding whatever
    /// could be salvaged.
    pub invalid_values: Vec<Record>,
    /// Union of every path found missing or invalid.
    pub missing_paths: BTreeSet<String>,
    pub incomplete: IncompleteInfo,
}

#[derive(Debug, Clone)]
pub struct Decoder {
    parser: MaskParser,
    fields_checker: FieldsChecker,
    value_decoder: ValueDecoder,
}

impl Decoder {
    pub fn new(parser: MaskParser) -> Self {
        Self {
            parser,
            fields_checker: FieldsChecker::new(),
            value_decoder: ValueDecoder::new(),
        }
    }

    /// Decode `list` against the normalized `mask`.
    ///
    /// Errors only come from the mask parser, when it rejects a path set it
    /// was built from.
    pub fn decode(&self, list: Vec<FlatRecord>, mask: &FieldMask) -> Result<DecodeOutcome, FmCacheError> {
        let check = self.fields_checker.check(list, mask);

        let full = self.decode_list(&check.consistent, mask);

        let reduced = if check.incomplete.is_empty() {
            DecodeResult::default()
        } else {
            let remaining = mask.paths().into_iter().filter(|p| !check.missing_paths.contains(p));
            let reduced_mask = self.parser.parse(remaining)?;
            self.decode_list(&check.incomplete, &reduced_mask)
        };

        debug!(
            consistent = check.consistent.len(),
            incomplete = check.incomplete.len(),
            valid = full.values.len(),
            "Decoded batch"
        );

        let mut missing_paths = check.missing_paths;
        missing_paths.extend(full.invalid_paths);
        missing_paths.extend(reduced.invalid_paths);

        let mut invalid_values = full.invalid_values;
        invalid_values.extend(reduced.values);
        invalid_values.extend(reduced.invalid_values);

        let incomplete = IncompleteInfo::new(
            invalid_values.iter().map(Record::id).collect(),
            self.parser.parse(&missing_paths)?,
        );

        Ok(DecodeOutcome {
            values: full.values,
            invalid_values,
            missing_paths,
            incomplete,
        })
    }

    /// Decode one record on its own terms: only the paths missing or
    /// inconsistent in `flat` itself are dropped from the result and listed
    /// in `invalid_paths`.
    pub fn decode_one(&self, flat: &FlatRecord, mask: &FieldMask) -> Result<Decoded, FmCacheError> {
        let missing: BTreeSet<String> = self.fields_checker.missing_paths(flat, mask).into_iter().collect();
        if missing.is_empty() {
            return Ok(self.value_decoder.decode(flat, mask));
        }

        let reduced_mask = self.parser.parse(mask.paths().into_iter().filter(|p| !missing.contains(p)))?;
        let mut decoded = self.value_decoder.decode(flat, &reduced_mask);
        decoded.invalid_paths.extend(missing);
        Ok(decoded)
    }

    fn decode_list(&self, list: &[FlatRecord], mask: &FieldMask) -> DecodeResult {
        let mut result = DecodeResult::default();
        for flat in list {
            let decoded = self.value_decoder.decode(flat, mask);
            if decoded.is_valid() {
                result.values.push(decoded.record);
            } else {
                result.invalid_values.push(decoded.record);
                result.invalid_paths.extend(decoded.invalid_paths);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use crate::field_mask::{EntitySchema, Schema, SchemaParser};
    use crate::item::{Item, Slot};
    use serde_json::json;
    use std::sync::Arc;

    fn parser() -> MaskParser {
        MaskParser::new(Arc::new(SchemaParser::new(
            Schema::new("User")
                .entity("User", EntitySchema::new().attrs(["name"]).has_one("profile", "Profile"))
                .entity(
                    "Profile",
                    EntitySchema::new().attrs(["introduction"]).has_many("schools", "School"),
                )
                .entity("School", EntitySchema::new().attrs(["name"])),
        )))
    }

    fn mask() -> FieldMask {
        parser()
            .parse(["name", "profile.introduction", "profile.schools.name"])
            .unwrap()
    }

    fn record(id: i64) -> Record {
        Record::new(id).with("name", "Taro").with_one(
            "profile",
            Some(
                Record::new(id + 100)
                    .with("introduction", "Hello")
                    .with_many("schools", vec![Record::new(id + 200).with("name", "U")]),
            ),
        )
    }

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_round_trip_is_complete() {
        let flats = Encoder::new().encode(&[record(1), record(2)], &mask());
        let outcome = Decoder::new(parser()).decode(flats, &mask()).unwrap();

        assert_eq!(outcome.values, vec![record(1), record(2)]);
        assert!(outcome.invalid_values.is_empty());
        assert!(outcome.missing_paths.is_empty());
        assert_eq!(outcome.incomplete, IncompleteInfo::new(vec![], FieldMask::id_only()));
    }

    #[test]
    fn test_missing_nested_id_salvages_the_rest() {
        let mut flat = Encoder::new().encode_one(&record(1), &mask());
        flat.mark_missing(["profile.schools.id"]);

        let outcome = Decoder::new(parser()).decode(vec![flat], &mask()).unwrap();

        assert!(outcome.values.is_empty());
        assert_eq!(
            outcome.invalid_values,
            vec![Record::new(1)
                .with("name", "Taro")
                .with_one("profile", Some(Record::new(101).with("introduction", "Hello")))]
        );
        assert_eq!(outcome.missing_paths, set(&["profile.schools.id", "profile.schools.name"]));
        assert_eq!(
            outcome.incomplete,
            IncompleteInfo::new(
                vec![1],
                parser().parse(["profile.schools.id", "profile.schools.name"]).unwrap()
            )
        );
    }

    #[test]
    fn test_orphan_moves_record_to_invalid() {
        let mut flat = Encoder::new().encode_one(&record(1), &mask());
        flat.set(
            "profile.schools.id",
            Slot::from_items(vec![Item::new(json!(201), 201, Some(999))]),
        );

        let outcome = Decoder::new(parser()).decode(vec![flat, Encoder::new().encode_one(&record(2), &mask())], &mask()).unwrap();

        assert_eq!(outcome.values, vec![record(2)]);
        assert_eq!(outcome.invalid_values.len(), 1);
        assert_eq!(outcome.invalid_values[0].id(), 1);
        assert_eq!(
            outcome.missing_paths,
            set(&[
                "profile.id",
                "profile.introduction",
                "profile.schools.id",
                "profile.schools.name",
            ])
        );
        assert_eq!(outcome.incomplete.ids, vec![1]);
    }

    #[test]
    fn test_incomplete_mask_is_union_over_records() {
        let mut a = Encoder::new().encode_one(&record(1), &mask());
        a.mark_missing(["name"]);
        let mut b = Encoder::new().encode_one(&record(2), &mask());
        b.mark_missing(["profile.introduction"]);

        let outcome = Decoder::new(parser()).decode(vec![a, b], &mask()).unwrap();

        assert!(outcome.values.is_empty());
        assert_eq!(outcome.incomplete.ids, vec![1, 2]);
        assert_eq!(
            outcome.incomplete.field_mask,
            parser().parse(["name", "profile.introduction"]).unwrap()
        );
        // Salvaged with the reduced mask: `name` gone from both.
        assert_eq!(outcome.invalid_values[0].scalar("name"), None);
        assert_eq!(outcome.invalid_values[1].scalar("name"), None);
    }

    #[test]
    fn test_decode_one_drops_only_its_own_missing_paths() {
        let mut flat = Encoder::new().encode_one(&record(1), &mask());
        flat.mark_missing(["name"]);

        let decoded = Decoder::new(parser()).decode_one(&flat, &mask()).unwrap();

        assert_eq!(decoded.invalid_paths, set(&["name"]));
        let mut expected = record(1);
        expected.remove("name");
        assert_eq!(decoded.record, expected);
    }

    #[test]
    fn test_decode_one_keeps_inconsistent_paths() {
        let mut flat = Encoder::new().encode_one(&record(1), &mask());
        flat.set(
            "profile.schools.id",
            Slot::from_items(vec![Item::new(json!(201), 201, Some(999))]),
        );

        let decoded = Decoder::new(parser()).decode_one(&flat, &mask()).unwrap();

        assert!(!decoded.is_valid());
        assert!(decoded.invalid_paths.contains("profile.introduction"));
        assert!(!decoded.invalid_paths.contains("name"));
    }
}
