//! Property tests: documents produced by a record decode back to an
//! equal record, extra keys never interfere, and strict decoding
//! notices any missing required field.

use std::collections::HashMap;

use bson::Bson;
use docbind_core::convert::{FromBson, ToBson};
use docbind_core::document::{DecodeOptions, FieldSpec, Record, decode_field};
use docbind_core::error::{OdmError, OdmResult};
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Reading {
    name: String,
    level: i64,
    flag: bool,
    scores: Vec<i32>,
    pair: (i32, String),
    attrs: HashMap<String, i64>,
    note: Option<String>,
}

const REQUIRED_KEYS: [&str; 6] = ["name", "level", "flag", "scores", "pair", "attrs"];

impl Record for Reading {
    fn record_name() -> &'static str {
        "Reading"
    }

    fn fields() -> &'static [FieldSpec<Self>] {
        static FIELDS: [FieldSpec<Reading>; 7] = [
            FieldSpec {
                name: "name",
                rename: None,
                unique: false,
                get: |record| record.name.to_bson(),
                set: |record, value| {
                    record.name = FromBson::from_bson(value)?;
                    Ok(())
                },
            },
            FieldSpec {
                name: "level",
                rename: None,
                unique: false,
                get: |record| record.level.to_bson(),
                set: |record, value| {
                    record.level = FromBson::from_bson(value)?;
                    Ok(())
                },
            },
            FieldSpec {
                name: "flag",
                rename: None,
                unique: false,
                get: |record| record.flag.to_bson(),
                set: |record, value| {
                    record.flag = FromBson::from_bson(value)?;
                    Ok(())
                },
            },
            FieldSpec {
                name: "scores",
                rename: None,
                unique: false,
                get: |record| record.scores.to_bson(),
                set: |record, value| {
                    record.scores = FromBson::from_bson(value)?;
                    Ok(())
                },
            },
            FieldSpec {
                name: "pair",
                rename: None,
                unique: false,
                get: |record| record.pair.to_bson(),
                set: |record, value| {
                    record.pair = FromBson::from_bson(value)?;
                    Ok(())
                },
            },
            FieldSpec {
                name: "attrs",
                rename: None,
                unique: false,
                get: |record| record.attrs.to_bson(),
                set: |record, value| {
                    record.attrs = FromBson::from_bson(value)?;
                    Ok(())
                },
            },
            FieldSpec {
                name: "note",
                rename: None,
                unique: false,
                get: |record| record.note.to_bson(),
                set: |record, value| {
                    record.note = FromBson::from_bson(value)?;
                    Ok(())
                },
            },
        ];
        &FIELDS
    }

    fn from_document_with(
        mut document: bson::Document,
        options: &DecodeOptions,
    ) -> OdmResult<Self> {
        Ok(Self {
            name: decode_field::<Self, _>(&mut document, "name", None, options)?,
            level: decode_field::<Self, _>(&mut document, "level", None, options)?,
            flag: decode_field::<Self, _>(&mut document, "flag", None, options)?,
            scores: decode_field::<Self, _>(&mut document, "scores", None, options)?,
            pair: decode_field::<Self, _>(&mut document, "pair", None, options)?,
            attrs: decode_field::<Self, _>(&mut document, "attrs", None, options)?,
            note: decode_field::<Self, _>(&mut document, "note", Some(|| None), options)?,
        })
    }
}

prop_compose! {
    fn arb_reading()(
        name in ".*",
        level in any::<i64>(),
        flag in any::<bool>(),
        scores in proptest::collection::vec(any::<i32>(), 0..8),
        pair in (any::<i32>(), "[a-z]{0,12}"),
        attrs in proptest::collection::hash_map("[a-z]{1,8}", any::<i64>(), 0..6),
        note in proptest::option::of("[ -~]{0,16}"),
    ) -> Reading {
        Reading { name, level, flag, scores, pair, attrs, note }
    }
}

proptest! {
    #[test]
    fn documents_round_trip(reading in arb_reading()) {
        let document = reading.to_document().unwrap();
        let decoded = Reading::from_document(document).unwrap();
        prop_assert_eq!(reading, decoded);
    }

    #[test]
    fn extra_keys_never_interfere(reading in arb_reading(), key in "[a-z]{1,8}", value in any::<i64>()) {
        let mut document = reading.to_document().unwrap();
        document.insert(format!("extra_{key}"), Bson::Int64(value));
        let decoded = Reading::from_document(document).unwrap();
        prop_assert_eq!(reading, decoded);
    }

    #[test]
    fn strict_decoding_reports_any_missing_required_field(
        reading in arb_reading(),
        which in 0..REQUIRED_KEYS.len(),
    ) {
        let mut document = reading.to_document().unwrap();
        let removed = REQUIRED_KEYS[which];
        document.remove(removed);

        match Reading::from_document(document) {
            Err(OdmError::MissingField { record, field }) => {
                prop_assert_eq!(record, "Reading");
                prop_assert_eq!(field, removed);
            }
            other => prop_assert!(false, "unexpected result: {other:?}"),
        }
    }
}
