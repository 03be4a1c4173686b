//! Options-driven behavior: substitutions, processors, parent members and
//! mandatory enforcement.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use classify::{Classify, Options, Processor, TypeOptions};
use classify_testhelpers::setup;

#[derive(Debug, Default, PartialEq, Clone, Copy)]
struct Ip {
    a: u8,
    b: u8,
    c: u8,
    d: u8,
}

// Substituted on the wire through its dotted string form; the type itself
// never derives Classify.
impl classify::Classify for Ip {
    fn build_descriptor() -> classify::Descriptor {
        // Objects without members; only reachable through substitution in
        // these tests.
        classify::Descriptor::of::<Ip>(classify::Shape::Object(classify::ObjectVt {
            fields: Vec::new(),
            default: Some(|| Box::new(Ip::default())),
            before_serialize: None,
            after_serialize: None,
            before_deserialize: None,
            after_deserialize: None,
        }))
    }
}

fn ip_options() -> Options {
    Options::new()
        .add_type::<Ip>(TypeOptions::new().substitute(
            |ip: &Ip| format!("{}.{}.{}.{}", ip.a, ip.b, ip.c, ip.d),
            |text: String| {
                let mut parts = text.split('.').map(|p| p.parse().unwrap_or(0));
                Ip {
                    a: parts.next().unwrap_or(0),
                    b: parts.next().unwrap_or(0),
                    c: parts.next().unwrap_or(0),
                    d: parts.next().unwrap_or(0),
                }
            },
        ))
        .unwrap()
}

#[test]
fn substitution_round_trips_through_the_surrogate() {
    setup();
    let ip = Ip {
        a: 127,
        b: 0,
        c: 0,
        d: 1,
    };
    let json = classify_json::to_string_with(&ip, &ip_options()).unwrap();
    assert_eq!(json, r#""127.0.0.1""#);
    let back: Ip = classify_json::from_str_with(&json, &ip_options()).unwrap();
    assert_eq!(back, ip);
}

#[test]
fn self_substitution_is_rejected() {
    let err = Options::new()
        .add_type::<String>(TypeOptions::new().substitute(
            |s: &String| s.clone(),
            |s: String| s,
        ))
        .unwrap_err();
    assert!(matches!(err.kind(), classify::ErrorKind::OptionsConflict(_)));
}

#[test]
fn duplicate_registration_is_rejected() {
    let err = Options::new()
        .add_type::<Ip>(TypeOptions::new())
        .unwrap()
        .add_type::<Ip>(TypeOptions::new())
        .unwrap_err();
    assert!(matches!(err.kind(), classify::ErrorKind::OptionsConflict(_)));
}

#[derive(Classify, Debug, Default)]
#[classify(processor)]
struct Audited {
    value: i32,
    #[classify(ignore)]
    serialized: std::cell::Cell<u32>,
    #[classify(ignore)]
    deserialized: bool,
}

impl Processor for Audited {
    fn after_serialize(&self, _element: &mut dyn std::any::Any) {
        self.serialized.set(self.serialized.get() + 1);
    }

    fn after_deserialize(&mut self, _element: &dyn std::any::Any) {
        self.deserialized = true;
    }
}

#[test]
fn object_level_processors_run() {
    let audited = Audited {
        value: 5,
        ..Audited::default()
    };
    let json = classify_json::to_string(&audited).unwrap();
    assert_eq!(json, r#"{"value":5}"#);
    assert_eq!(audited.serialized.get(), 1);

    let back: Audited = classify_json::from_str(&json).unwrap();
    assert!(back.deserialized);
    assert_eq!(back.value, 5);
}

#[test]
fn type_level_processors_can_rewrite_elements() {
    use classify_json::JsonValue;

    #[derive(Classify, Debug, Default, PartialEq)]
    struct Plain {
        value: i32,
    }

    let options = Options::new()
        .add_type::<Plain>(TypeOptions::new().after_serialize(|_, element| {
            if let Some(obj) = element.downcast_mut::<JsonValue>()
                && let JsonValue::Object(fields) = obj
            {
                fields.insert("stamp".to_owned(), JsonValue::Bool(true));
            }
        }))
        .unwrap();

    let json = classify_json::to_string_with(&Plain { value: 1 }, &options).unwrap();
    assert_eq!(json, r#"{"value":1,"stamp":true}"#);
}

#[derive(Classify, Debug, Default)]
struct Tree {
    name: String,
    children: Vec<Rc<RefCell<Tree>>>,
    #[classify(parent)]
    parent: Option<Weak<RefCell<Tree>>>,
}

#[test]
fn parent_members_receive_the_enclosing_object() {
    let json = r#"{"name":"root","children":[{"name":"leaf","children":[]}]}"#;
    let root: Rc<RefCell<Tree>> = classify_json::from_str(json).unwrap();
    let leaf = root.borrow().children[0].clone();
    let up = leaf.borrow().parent.clone().unwrap().upgrade().unwrap();
    assert!(Rc::ptr_eq(&root, &up));
    assert_eq!(root.borrow().name, "root");
}

#[test]
fn parent_members_are_skipped_on_write() {
    let root = Rc::new(RefCell::new(Tree {
        name: "r".into(),
        ..Tree::default()
    }));
    let json = classify_json::to_string(&root).unwrap();
    assert_eq!(json, r#"{"name":"r","children":[]}"#);
}

#[test]
fn mandatory_members_tolerated_unless_enforced() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Strict {
        #[classify(mandatory)]
        required: i32,
    }

    // Current documented semantics: absence is tolerated by default.
    let back: Strict = classify_json::from_str("{}").unwrap();
    assert_eq!(back, Strict::default());

    let options = Options::new().enforce_mandatory(true);
    let err = classify_json::from_str_with::<Strict>("{}", &options).unwrap_err();
    assert!(err.to_string().contains("required"));
}
