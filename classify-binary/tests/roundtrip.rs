//! Round-trip and wire-level tests over the binary driver.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use classify::Classify;
use classify_testhelpers::setup;

#[derive(Classify, Debug, Default, PartialEq)]
struct Record {
    name: String,
    count: u32,
}

#[test]
fn struct_roundtrip() {
    setup();
    let value = Record {
        name: "classify".into(),
        count: 300,
    };
    let bytes = classify_binary::to_vec(&value).unwrap();
    // Objects ride in a string-keyed dictionary, entries value first.
    assert_eq!(bytes[0], 0x15);
    let back: Record = classify_binary::from_slice(&bytes).unwrap();
    assert_eq!(back, value);
}

#[test]
fn unsigned_sixty_four_bit_uses_the_ulong_tag() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Big {
        value: u64,
    }

    let value = Big { value: 1 << 63 };
    let bytes = classify_binary::to_vec(&value).unwrap();
    // Dictionary tag, then the value element: ULong with its eight bytes.
    assert_eq!(bytes[0], 0x15);
    assert_eq!(bytes[1], 0x08);
    assert_eq!(&bytes[2..10], &(1u64 << 63).to_le_bytes());
    let back: Big = classify_binary::from_slice(&bytes).unwrap();
    assert_eq!(back, value);
}

#[derive(Classify, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
enum Color {
    #[default]
    Red,
    Blue,
}

#[test]
fn enum_keyed_dictionaries_use_string_keys() {
    let map = BTreeMap::from([(Color::Red, 1i32), (Color::Blue, 2i32)]);
    let bytes = classify_binary::to_vec(&map).unwrap();
    // DictionaryStringUtf8; first entry stores the value (Byte 1) and then
    // the key "Red" as escaped UTF-8.
    assert_eq!(bytes[0], 0x15);
    assert_eq!(bytes[1], 0x01);
    assert_eq!(bytes[2], 1);
    assert_eq!(&bytes[3..6], b"Red");
    assert_eq!(&bytes[6..8], &[0xff, 0x00]);
    let back: BTreeMap<Color, i32> = classify_binary::from_slice(&bytes).unwrap();
    assert_eq!(back, map);
}

#[test]
fn integer_keyed_dictionaries_pick_a_numeric_variant() {
    let map = BTreeMap::from([(1i32, "a".to_owned()), (2i32, "b".to_owned())]);
    let bytes = classify_binary::to_vec(&map).unwrap();
    assert_eq!(bytes[0], 0x10);
    let back: BTreeMap<i32, String> = classify_binary::from_slice(&bytes).unwrap();
    assert_eq!(back, map);

    let wide = BTreeMap::from([(5_000_000_000i64, 1u8)]);
    let bytes = classify_binary::to_vec(&wide).unwrap();
    assert_eq!(bytes[0], 0x11);
    let back: BTreeMap<i64, u8> = classify_binary::from_slice(&bytes).unwrap();
    assert_eq!(back, wide);
}

#[test]
fn scalars_round_trip() {
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    #[derive(Classify, Debug, Default, PartialEq)]
    struct Mixed {
        flag: bool,
        ch: char,
        small: i8,
        wide: i64,
        single: f32,
        double: f64,
        amount: Option<Decimal>,
        at: Option<DateTime<Utc>>,
        text: String,
    }

    let value = Mixed {
        flag: true,
        ch: '中',
        small: -7,
        wide: -5_000_000_000,
        single: 1.5,
        double: 1.0 / 3.0,
        amount: Some("-42.42".parse().unwrap()),
        at: Some(classify::exact::parse_datetime("1999-12-31T23:59:59.9999999").unwrap()),
        text: "hello \u{4eff}".into(),
    };
    let bytes = classify_binary::to_vec(&value).unwrap();
    let back: Mixed = classify_binary::from_slice(&bytes).unwrap();
    assert_eq!(back, value);
}

#[test]
fn date_like_strings_round_trip_through_the_datetime_tag() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Text {
        s: String,
    }

    let value = Text {
        s: "2020-01-02T03:04:05".into(),
    };
    let bytes = classify_binary::to_vec(&value).unwrap();
    // The value element carries the DateTime tag, not a string tag.
    assert_eq!(bytes[1], 0x0c);
    let back: Text = classify_binary::from_slice(&bytes).unwrap();
    assert_eq!(back, value);
}

#[test]
fn boolean_like_strings_round_trip_through_the_bool_tags() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Text {
        s: String,
    }

    let value = Text { s: "True".into() };
    let bytes = classify_binary::to_vec(&value).unwrap();
    assert_eq!(bytes[1], 0x1b);
    let back: Text = classify_binary::from_slice(&bytes).unwrap();
    assert_eq!(back, value);
}

#[derive(Classify, Debug, Default)]
struct A {
    b: Option<Rc<RefCell<B>>>,
}

#[derive(Classify, Debug, Default)]
struct B {
    a: Option<Rc<RefCell<A>>>,
}

#[test]
fn cycles_round_trip() {
    let a1 = Rc::new(RefCell::new(A { b: None }));
    let b1 = Rc::new(RefCell::new(B {
        a: Some(Rc::clone(&a1)),
    }));
    a1.borrow_mut().b = Some(Rc::clone(&b1));

    let bytes = classify_binary::to_vec(&a1).unwrap();
    // The root carries the HasRefId flag on its dictionary tag.
    assert_eq!(bytes[0] & 0x20, 0x20);

    let a2: Rc<RefCell<A>> = classify_binary::from_slice(&bytes).unwrap();
    let b2 = a2.borrow().b.clone().unwrap();
    let back = b2.borrow().a.clone().unwrap();
    assert!(Rc::ptr_eq(&a2, &back));
}

#[test]
fn lists_and_tuples_preserve_order() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Seq {
        items: Vec<u16>,
        pair: (bool, String),
    }

    let value = Seq {
        items: vec![3, 1, 2],
        pair: (false, "p".into()),
    };
    let bytes = classify_binary::to_vec(&value).unwrap();
    let back: Seq = classify_binary::from_slice(&bytes).unwrap();
    assert_eq!(back, value);
}

#[test]
fn deterministic_output() {
    let value = Record {
        name: "same".into(),
        count: 1,
    };
    assert_eq!(
        classify_binary::to_vec(&value).unwrap(),
        classify_binary::to_vec(&value).unwrap()
    );
}

#[test]
fn truncated_streams_fail_cleanly() {
    let value = Record {
        name: "x".into(),
        count: 1,
    };
    let bytes = classify_binary::to_vec(&value).unwrap();
    let err = classify_binary::from_slice::<Record>(&bytes[..bytes.len() - 2]).unwrap_err();
    assert!(err.to_string().contains("truncated"));
}
