// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Presence check of flat records against a mask.
//!
//! A node whose `id` path is missing cannot vouch for anything under it: its
//! own leaves and every descendant path are reported missing, even the ones
//! that happen to be cached.

use std::collections::BTreeSet;

use crate::field_mask::{join_path, FieldMask, ID_FIELD};
use crate::item::FlatRecord;

#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    /// Records with every requested path present.
    pub consistent: Vec<FlatRecord>,
    /// Records with at least one missing path.
    pub incomplete: Vec<FlatRecord>,
    /// Union of missing paths over `incomplete`.
    pub missing_paths: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FieldsChecker;

impl FieldsChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, list: Vec<FlatRecord>, mask: &FieldMask) -> CheckResult {
        let mut result = CheckResult::default();

        for flat in list {
            let mut missing = Vec::new();
            self.check_node(&flat, mask, "", &mut missing);

            if missing.is_empty() {
                result.consistent.push(flat);
            } else {
                result.missing_paths.extend(missing);
                result.incomplete.push(flat);
            }
        }

        result
    }

    /// Missing paths of a single record.
    pub fn missing_paths(&self, flat: &FlatRecord, mask: &FieldMask) -> Vec<String> {
        let mut missing = Vec::new();
        self.check_node(flat, mask, "", &mut missing);
        missing
    }

    fn check_node(&self, flat: &FlatRecord, mask: &FieldMask, prefix: &str, missing: &mut Vec<String>) {
        let mut found = Vec::new();
        let mut id_exists = false;

        for attr in mask.attrs() {
            let path = join_path(prefix, attr);
            if flat.get(&path).is_missing() {
                missing.push(path);
            } else {
                if attr == ID_FIELD {
                    id_exists = true;
                }
                found.push(path);
            }
        }

        if id_exists {
            for (name, _, child) in mask.associations() {
                self.check_node(flat, child, &join_path(prefix, name), missing);
            }
        } else {
            missing.extend(found);
            for (name, _, child) in mask.associations() {
                missing.extend(child.paths_under(&join_path(prefix, name)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use crate::record::Record;

    fn mask() -> FieldMask {
        FieldMask::new()
            .with_attr("name")
            .with_has_one(
                "profile",
                FieldMask::new()
                    .with_attr("introduction")
                    .with_has_many("schools", FieldMask::new().with_attr("name")),
            )
            .normalized()
    }

    fn flat(id: i64) -> FlatRecord {
        let record = Record::new(id).with("name", "Taro").with_one(
            "profile",
            Some(
                Record::new(id + 100)
                    .with("introduction", "Hello")
                    .with_many("schools", vec![Record::new(id + 200).with("name", "U")]),
            ),
        );
        Encoder::new().encode_one(&record, &mask())
    }

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_complete_record_is_consistent() {
        let result = FieldsChecker::new().check(vec![flat(1)], &mask());
        assert_eq!(result.consistent.len(), 1);
        assert!(result.incomplete.is_empty());
        assert!(result.missing_paths.is_empty());
    }

    #[test]
    fn test_missing_leaf_does_not_invalidate_siblings() {
        let mut f = flat(1);
        f.mark_missing(["profile.introduction"]);

        let result = FieldsChecker::new().check(vec![f], &mask());
        assert_eq!(result.incomplete.len(), 1);
        assert_eq!(result.missing_paths, set(&["profile.introduction"]));
    }

    #[test]
    fn test_missing_id_invalidates_node_and_descendants() {
        let mut f = flat(1);
        f.mark_missing(["profile.id"]);

        let result = FieldsChecker::new().check(vec![f], &mask());
        assert_eq!(
            result.missing_paths,
            set(&[
                "profile.id",
                "profile.introduction",
                "profile.schools.id",
                "profile.schools.name",
            ])
        );
    }

    #[test]
    fn test_missing_nested_id_keeps_ancestors() {
        let mut f = flat(1);
        f.mark_missing(["profile.schools.id"]);

        let missing = FieldsChecker::new().missing_paths(&f, &mask());
        assert_eq!(
            missing.into_iter().collect::<BTreeSet<_>>(),
            set(&["profile.schools.id", "profile.schools.name"])
        );
    }

    #[test]
    fn test_missing_paths_of_one_record_lists_only_its_gaps() {
        let checker = FieldsChecker::new();
        assert!(checker.missing_paths(&flat(1), &mask()).is_empty());

        let mut f = flat(1);
        f.mark_missing(["name"]);
        assert_eq!(checker.missing_paths(&f, &mask()), vec!["name".to_string()]);
    }

    #[test]
    fn test_missing_paths_are_unioned_across_records() {
        let mut a = flat(1);
        a.mark_missing(["name"]);
        let mut b = flat(2);
        b.mark_missing(["profile.introduction"]);
        let c = flat(3);

        let result = FieldsChecker::new().check(vec![a, b, c], &mask());
        assert_eq!(result.consistent.len(), 1);
        assert_eq!(result.consistent[0].id(), 3);
        assert_eq!(result.incomplete.len(), 2);
        assert_eq!(result.missing_paths, set(&["name", "profile.introduction"]));
    }

    #[test]
    fn test_empty_flat_record_misses_everything() {
        let result = FieldsChecker::new().check(vec![FlatRecord::new(1)], &mask());
        assert_eq!(result.missing_paths, mask().paths().into_iter().collect());
    }
}
