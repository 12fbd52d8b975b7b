//! Property-based tests for the encode/decode consistency engine.
//!
//! Uses proptest to generate random record trees and random damage to their
//! flat form, and checks that decoding either reproduces the tree exactly or
//! reports the damaged paths, never panicking.
//!
//! Run with: `cargo test --test proptest_roundtrip`

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::Value;

use fmcache::{
    Codec, Decoder, Encoder, EntitySchema, FieldMask, IncompleteInfo, MaskParser, Record, Schema, SchemaParser,
};

// =============================================================================
// Strategies for generating test data
// =============================================================================

fn parser() -> MaskParser {
    MaskParser::new(Arc::new(SchemaParser::new(
        Schema::new("User")
            .entity("User", EntitySchema::new().attrs(["name", "age"]).has_one("profile", "Profile"))
            .entity("Profile", EntitySchema::new().attrs(["introduction"]).has_many("schools", "School"))
            .entity("School", EntitySchema::new().attrs(["name"]).has_many("parks", "Park"))
            .entity("Park", EntitySchema::new().attrs(["location"])),
    )))
}

fn mask() -> FieldMask {
    parser()
        .parse([
            "name",
            "age",
            "profile.introduction",
            "profile.schools.name",
            "profile.schools.parks.location",
        ])
        .unwrap()
}

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
    ]
}

/// A user tree carrying exactly the fields of [`mask`], with ids unique per
/// tree position.
fn user_strategy() -> impl Strategy<Value = Record> {
    let school = (scalar_strategy(), prop::collection::vec(scalar_strategy(), 0..4));
    let profile = (scalar_strategy(), prop::collection::vec(school, 0..4));

    (1..1_000_000i64, scalar_strategy(), scalar_strategy(), prop::option::of(profile)).prop_map(
        |(id, name, age, profile)| {
            let profile = profile.map(|(introduction, schools)| {
                let schools = schools
                    .into_iter()
                    .enumerate()
                    .map(|(i, (school_name, parks))| {
                        let school_id = 100 + i as i64;
                        let parks = parks
                            .into_iter()
                            .enumerate()
                            .map(|(j, location)| {
                                Record::new(school_id * 100 + j as i64).with("location", location)
                            })
                            .collect();
                        Record::new(school_id).with("name", school_name).with_many("parks", parks)
                    })
                    .collect();
                Record::new(id + 7)
                    .with("introduction", introduction)
                    .with_many("schools", schools)
            });
            Record::new(id).with("name", name).with("age", age).with_one("profile", profile)
        },
    )
}

// =============================================================================
// Round Trip
// =============================================================================

proptest! {
    /// A record holding exactly the mask's fields survives encode → decode.
    #[test]
    fn prop_round_trip(user in user_strategy()) {
        let m = mask();
        let flats = Encoder::new().encode(&[user.clone()], &m);
        let outcome = Decoder::new(parser()).decode(flats, &m).unwrap();

        prop_assert_eq!(outcome.values, vec![user]);
        prop_assert!(outcome.invalid_values.is_empty());
        prop_assert_eq!(outcome.incomplete, IncompleteInfo::new(vec![], FieldMask::id_only()));
    }

    /// The serialized form decodes back to the same flat record.
    #[test]
    fn prop_codec_round_trip(user in user_strategy()) {
        let m = mask();
        let codec = Codec::default();
        let flat = Encoder::new().encode_one(&user, &m);

        let raw: HashMap<String, Option<String>> = codec
            .encode(&flat)
            .into_iter()
            .map(|(field, value)| (field, Some(value)))
            .collect();
        prop_assert_eq!(codec.decode(user.id(), raw), flat);
    }

    /// Losing any one path makes the record invalid and names that path.
    #[test]
    fn prop_lost_path_is_reported(user in user_strategy(), pick in any::<prop::sample::Index>()) {
        let m = mask();
        let paths = m.paths();
        let lost = pick.get(&paths).clone();

        let mut flat = Encoder::new().encode_one(&user, &m);
        flat.mark_missing([lost.as_str()]);
        let outcome = Decoder::new(parser()).decode(vec![flat], &m).unwrap();

        prop_assert!(outcome.values.is_empty());
        prop_assert_eq!(outcome.invalid_values.len(), 1);
        prop_assert!(outcome.missing_paths.contains(&lost));
        prop_assert_eq!(outcome.incomplete.ids, vec![user.id()]);
    }

    /// Paths that stayed valid for every record are never asked for again.
    #[test]
    fn prop_incomplete_mask_is_minimal(a in user_strategy(), b in user_strategy()) {
        let m = mask();
        let b = Record::new(a.id() + 1_000_000)
            .with("name", b.scalar("name").unwrap_or(Value::Null))
            .with("age", b.scalar("age").unwrap_or(Value::Null))
            .with_one("profile", b.one("profile").cloned());

        let mut damaged = Encoder::new().encode_one(&a, &m);
        damaged.mark_missing(["age"]);
        let intact = Encoder::new().encode_one(&b, &m);

        let outcome = Decoder::new(parser()).decode(vec![damaged, intact], &m).unwrap();

        prop_assert_eq!(outcome.values, vec![b]);
        prop_assert_eq!(outcome.incomplete.field_mask, parser().parse(["age"]).unwrap());
    }
}

// =============================================================================
// Deserialization Fuzz Tests
// =============================================================================

proptest! {
    /// Garbage in the store never panics; it only makes the field missing.
    #[test]
    fn fuzz_codec_decode_arbitrary_strings(raw in ".*") {
        let decoded = Codec::default().decode(1, HashMap::from([("name".to_string(), Some(raw.clone()))]));
        let parsed: Result<Vec<fmcache::Item>, _> = serde_json::from_str(&raw);
        prop_assert_eq!(decoded.get("name").is_missing(), parsed.is_err());
    }

    /// Decoding arbitrary items (wrong ids, wrong parents) never panics.
    #[test]
    fn fuzz_decoder_arbitrary_items(
        items in prop::collection::vec(
            (0..32usize, 0..6i64, prop::option::of(0..6i64), scalar_strategy()),
            0..24,
        )
    ) {
        let m = mask();
        let paths = m.paths();
        let mut flat = fmcache::FlatRecord::new(1);
        for (path, id, p_id, value) in items {
            flat.push(&paths[path % paths.len()], fmcache::Item::new(value, id, p_id));
        }

        let outcome = Decoder::new(parser()).decode(vec![flat], &m).unwrap();
        prop_assert_eq!(outcome.values.len() + outcome.invalid_values.len(), 1);
    }
}
