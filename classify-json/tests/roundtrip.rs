//! Round-trip and schema-evolution tests over the JSON driver.
//!
//! Each test declares its own local types and checks both the wire shape
//! and the reconstructed value.

use std::collections::BTreeMap;

use classify::{Classify, KeyValue};
use classify_testhelpers::setup;

#[derive(Classify, Debug, Default, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

#[test]
fn struct_roundtrip() {
    setup();
    let json = classify_json::to_string(&Point { x: 3, y: -4 }).unwrap();
    assert_eq!(json, r#"{"x":3,"y":-4}"#);
    let back: Point = classify_json::from_str(&json).unwrap();
    assert_eq!(back, Point { x: 3, y: -4 });
}

#[test]
fn nested_structs_and_containers() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Inner {
        name: String,
        tags: Vec<String>,
    }

    #[derive(Classify, Debug, Default, PartialEq)]
    struct Outer {
        inner: Inner,
        counts: BTreeMap<String, u32>,
        maybe: Option<i64>,
    }

    let value = Outer {
        inner: Inner {
            name: "alpha".into(),
            tags: vec!["x".into(), "y".into()],
        },
        counts: BTreeMap::from([("a".into(), 1), ("b".into(), 2)]),
        maybe: None,
    };
    let json = classify_json::to_string(&value).unwrap();
    assert_eq!(
        json,
        r#"{"inner":{"name":"alpha","tags":["x","y"]},"counts":{"a":1,"b":2},"maybe":null}"#
    );
    let back: Outer = classify_json::from_str(&json).unwrap();
    assert_eq!(back, value);
}

#[test]
fn tuples_preserve_order() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Holder {
        pair: (i32, String),
        triple: (u8, bool, f64),
    }

    let value = Holder {
        pair: (7, "seven".into()),
        triple: (1, true, 0.5),
    };
    let json = classify_json::to_string(&value).unwrap();
    assert_eq!(json, r#"{"pair":[7,"seven"],"triple":[1,true,0.5]}"#);
    let back: Holder = classify_json::from_str(&json).unwrap();
    assert_eq!(back, value);
}

#[test]
fn key_value_pairs_use_named_slots() {
    let value = KeyValue::new("k".to_owned(), 9i64);
    let json = classify_json::to_string(&value).unwrap();
    assert_eq!(json, r#"{"key":"k","value":9}"#);
    let back: KeyValue<String, i64> = classify_json::from_str(&json).unwrap();
    assert_eq!(back, value);
}

#[derive(Classify, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
enum Color {
    #[default]
    Red,
    Blue,
}

#[test]
fn dictionary_with_enum_keys() {
    let map = BTreeMap::from([(Color::Red, 1i32), (Color::Blue, 2i32)]);
    let json = classify_json::to_string(&map).unwrap();
    assert_eq!(json, r#"{"Red":1,"Blue":2}"#);
    let back: BTreeMap<Color, i32> = classify_json::from_str(&json).unwrap();
    assert_eq!(back, map);
}

#[test]
fn dictionary_with_integer_keys() {
    let map = BTreeMap::from([(-3i32, "a".to_owned()), (12i32, "b".to_owned())]);
    let json = classify_json::to_string(&map).unwrap();
    assert_eq!(json, r#"{"-3":"a","12":"b"}"#);
    let back: BTreeMap<i32, String> = classify_json::from_str(&json).unwrap();
    assert_eq!(back, map);
}

#[test]
fn unsigned_sixty_four_bit_values_round_trip_exactly() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Big {
        value: u64,
    }

    let value = Big { value: 1 << 63 };
    let json = classify_json::to_string(&value).unwrap();
    assert_eq!(json, r#"{"value":9223372036854775808}"#);
    let back: Big = classify_json::from_str(&json).unwrap();
    assert_eq!(back, value);
}

#[test]
fn floats_round_trip_within_one_ulp() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Floats {
        single: f32,
        double: f64,
    }

    let value = Floats {
        single: 1.1,
        double: 1.0 / 3.0,
    };
    let back: Floats = classify_json::from_str(&classify_json::to_string(&value).unwrap()).unwrap();
    assert_eq!(back, value);

    let weird = Floats {
        single: f32::INFINITY,
        double: f64::NEG_INFINITY,
    };
    let json = classify_json::to_string(&weird).unwrap();
    assert_eq!(json, r#"{"single":"Inf","double":"-Inf"}"#);
    let back: Floats = classify_json::from_str(&json).unwrap();
    assert_eq!(back, weird);
}

#[test]
fn unknown_wire_fields_are_discarded() {
    let back: Point = classify_json::from_str(r#"{"x":1,"age":7,"y":2}"#).unwrap();
    assert_eq!(back, Point { x: 1, y: 2 });
}

#[test]
fn missing_wire_fields_keep_constructor_values() {
    #[derive(Classify, Debug, PartialEq)]
    struct Person {
        name: String,
        age: u32,
    }

    impl Default for Person {
        fn default() -> Self {
            Person {
                name: String::new(),
                age: 42,
            }
        }
    }

    let back: Person = classify_json::from_str(r#"{"name":"x"}"#).unwrap();
    assert_eq!(
        back,
        Person {
            name: "x".into(),
            age: 42,
        }
    );
}

#[test]
fn renamed_and_underscored_members() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Record {
        _hidden: i32,
        #[classify(rename = "label")]
        text: String,
    }

    let value = Record {
        _hidden: 5,
        text: "t".into(),
    };
    let json = classify_json::to_string(&value).unwrap();
    assert_eq!(json, r#"{"hidden":5,"label":"t"}"#);
    let back: Record = classify_json::from_str(&json).unwrap();
    assert_eq!(back, value);
}

#[test]
fn omission_attributes() {
    #[derive(Classify, Debug, PartialEq)]
    struct Sparse {
        #[classify(ignore_if_default)]
        count: u32,
        #[classify(ignore_if_empty)]
        items: Vec<i32>,
        #[classify(ignore_if = 7)]
        level: i32,
        #[classify(ignore)]
        scratch: i32,
    }

    impl Default for Sparse {
        fn default() -> Self {
            Sparse {
                count: 0,
                items: Vec::new(),
                level: 7,
                scratch: 99,
            }
        }
    }

    let json = classify_json::to_string(&Sparse::default()).unwrap();
    assert_eq!(json, "{}");
    let back: Sparse = classify_json::from_str(&json).unwrap();
    assert_eq!(back, Sparse::default());

    let full = Sparse {
        count: 2,
        items: vec![1],
        level: 8,
        scratch: 0,
    };
    let json = classify_json::to_string(&full).unwrap();
    assert_eq!(json, r#"{"count":2,"items":[1],"level":8}"#);
    // The ignored member never travels; it keeps its constructor value.
    let back: Sparse = classify_json::from_str(&json).unwrap();
    assert_eq!(back.scratch, 99);
}

#[test]
fn colon_field_names_and_keys_are_escaped() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Colons {
        #[classify(rename = ":type")]
        tricky: String,
    }

    let value = Colons { tricky: "v".into() };
    let json = classify_json::to_string(&value).unwrap();
    assert_eq!(json, r#"{"::type":"v"}"#);
    let back: Colons = classify_json::from_str(&json).unwrap();
    assert_eq!(back, value);

    let map = BTreeMap::from([(":ref".to_owned(), 1i32)]);
    let json = classify_json::to_string(&map).unwrap();
    assert_eq!(json, r#"{"::ref":1}"#);
    let back: BTreeMap<String, i32> = classify_json::from_str(&json).unwrap();
    assert_eq!(back, map);
}

#[test]
fn self_typed_members_pass_through() {
    use classify_json::JsonValue;

    #[derive(Classify, Debug, Default, PartialEq)]
    struct Raw {
        payload: JsonValue,
    }

    let value = Raw {
        payload: classify_json::to_element(&Point { x: 1, y: 2 }).unwrap(),
    };
    let json = classify_json::to_string(&value).unwrap();
    assert_eq!(json, r#"{"payload":{"x":1,"y":2}}"#);
    let back: Raw = classify_json::from_str(&json).unwrap();
    assert_eq!(back, value);
}

#[test]
fn populate_into_existing_object() {
    let mut target = Point { x: 9, y: 9 };
    classify_json::populate_from_str(r#"{"x":1}"#, &mut target).unwrap();
    assert_eq!(target, Point { x: 1, y: 9 });
}

#[test]
fn deterministic_output() {
    let value = Point { x: 1, y: 2 };
    let first = classify_json::to_vec(&value).unwrap();
    let second = classify_json::to_vec(&value).unwrap();
    assert_eq!(first, second);
}

#[test]
fn datetime_and_decimal_values() {
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    #[derive(Classify, Debug, Default, PartialEq)]
    struct Stamped {
        at: Option<DateTime<Utc>>,
        amount: Option<Decimal>,
    }

    let value = Stamped {
        at: Some(classify::exact::parse_datetime("2021-05-04T10:20:30.5").unwrap()),
        amount: Some("12.3400".parse().unwrap()),
    };
    let json = classify_json::to_string(&value).unwrap();
    assert_eq!(json, r#"{"at":"2021-05-04T10:20:30.5","amount":"12.3400"}"#);
    let back: Stamped = classify_json::from_str(&json).unwrap();
    assert_eq!(back, value);
}
