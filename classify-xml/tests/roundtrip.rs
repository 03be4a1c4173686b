//! Round-trip tests over the XML driver.
//!
//! Each test defines its own local types and checks the produced markup
//! along with the reconstructed value.

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
        count: 3,
    };
    let xml = classify_xml::to_string(&value).unwrap();
    assert_eq!(xml, "<item><name>classify</name><count>3</count></item>");
    let back: Record = classify_xml::from_str(&xml).unwrap();
    assert_eq!(back, value);
}

#[test]
fn nested_lists_and_options() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Doc {
        tags: Vec<String>,
        note: Option<String>,
    }

    let value = Doc {
        tags: vec!["a".into(), "b".into()],
        note: None,
    };
    let xml = classify_xml::to_string(&value).unwrap();
    assert_eq!(
        xml,
        r#"<item><tags><item>a</item><item>b</item></tags><note null="true"/></item>"#
    );
    let back: Doc = classify_xml::from_str(&xml).unwrap();
    assert_eq!(back, value);
}

#[test]
fn dictionaries_use_key_attributes() {
    let map = BTreeMap::from([("x".to_owned(), 1i32), ("y".to_owned(), 2i32)]);
    let xml = classify_xml::to_string(&map).unwrap();
    assert_eq!(
        xml,
        r#"<item><item key="x">1</item><item key="y">2</item></item>"#
    );
    let back: BTreeMap<String, i32> = classify_xml::from_str(&xml).unwrap();
    assert_eq!(back, map);
}

#[test]
fn control_characters_use_c_literal_encoding() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Text {
        body: String,
    }

    let value = Text {
        body: "line1\nline2\ttab\u{1}".into(),
    };
    let xml = classify_xml::to_string(&value).unwrap();
    assert_eq!(
        xml,
        r#"<item><body encoding="c-literal">line1\nline2\ttab\x01</body></item>"#
    );
    let back: Text = classify_xml::from_str(&xml).unwrap();
    assert_eq!(back, value);
}

#[test]
fn low_characters_use_codepoint_encoding() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Ch {
        ch: char,
    }

    let value = Ch { ch: '\n' };
    let xml = classify_xml::to_string(&value).unwrap();
    assert_eq!(xml, r#"<item><ch encoding="codepoint">10</ch></item>"#);
    let back: Ch = classify_xml::from_str(&xml).unwrap();
    assert_eq!(back, value);

    let plain = Ch { ch: 'A' };
    let xml = classify_xml::to_string(&plain).unwrap();
    assert_eq!(xml, "<item><ch>A</ch></item>");
    let back: Ch = classify_xml::from_str(&xml).unwrap();
    assert_eq!(back, plain);
}

#[test]
fn markup_characters_are_escaped() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Text {
        body: String,
    }

    let value = Text {
        body: "a<b&c>\"d\"".into(),
    };
    let xml = classify_xml::to_string(&value).unwrap();
    let back: Text = classify_xml::from_str(&xml).unwrap();
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
fn cycles_round_trip_through_ref_attributes() {
    let a1 = Rc::new(RefCell::new(A { b: None }));
    let b1 = Rc::new(RefCell::new(B {
        a: Some(Rc::clone(&a1)),
    }));
    a1.borrow_mut().b = Some(Rc::clone(&b1));

    let xml = classify_xml::to_string(&a1).unwrap();
    assert_eq!(xml, r#"<item refid="1"><b><a ref="1"/></b></item>"#);

    let a2: Rc<RefCell<A>> = classify_xml::from_str(&xml).unwrap();
    let b2 = a2.borrow().b.clone().unwrap();
    let back = b2.borrow().a.clone().unwrap();
    assert!(Rc::ptr_eq(&a2, &back));
}

#[test]
fn unknown_elements_are_discarded() {
    let back: Record =
        classify_xml::from_str("<item><name>n</name><legacy>1</legacy><count>2</count></item>")
            .unwrap();
    assert_eq!(
        back,
        Record {
            name: "n".into(),
            count: 2,
        }
    );
}

#[test]
fn missing_elements_keep_constructor_values() {
    let back: Record = classify_xml::from_str("<item><name>n</name></item>").unwrap();
    assert_eq!(back.count, 0);
    assert_eq!(back.name, "n");
}

#[test]
fn populate_into_existing_object() {
    let mut target = Record {
        name: "old".into(),
        count: 9,
    };
    classify_xml::populate_from_str("<item><name>new</name></item>", &mut target).unwrap();
    assert_eq!(target.name, "new");
    assert_eq!(target.count, 9);
}

#[test]
fn whitespace_in_strings_survives() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Text {
        body: String,
    }

    let value = Text {
        body: "  padded  ".into(),
    };
    let xml = classify_xml::to_string(&value).unwrap();
    let back: Text = classify_xml::from_str(&xml).unwrap();
    assert_eq!(back, value);
}

#[test]
fn tuples_and_pairs() {
    use classify::KeyValue;

    #[derive(Classify, Debug, Default, PartialEq)]
    struct Mixed {
        pair: (i32, String),
        kv: KeyValue<String, u8>,
    }

    let value = Mixed {
        pair: (1, "one".into()),
        kv: KeyValue::new("k".to_owned(), 2),
    };
    let xml = classify_xml::to_string(&value).unwrap();
    assert_eq!(
        xml,
        "<item><pair><item>1</item><item>one</item></pair>\
         <kv><key>k</key><value>2</value></kv></item>"
    );
    let back: Mixed = classify_xml::from_str(&xml).unwrap();
    assert_eq!(back, value);
}
