//! Object-identity preservation: shared handles, cycles, forward and
//! dangling references.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use classify::Classify;
use classify_testhelpers::setup;

#[derive(Classify, Debug, Default)]
struct A {
    b: Option<Rc<RefCell<B>>>,
}

#[derive(Classify, Debug, Default)]
struct B {
    a: Option<Rc<RefCell<A>>>,
}

#[test]
fn two_object_cycle() {
    setup();
    let a1 = Rc::new(RefCell::new(A { b: None }));
    let b1 = Rc::new(RefCell::new(B {
        a: Some(Rc::clone(&a1)),
    }));
    a1.borrow_mut().b = Some(Rc::clone(&b1));

    let json = classify_json::to_string(&a1).unwrap();
    // The root is promoted to a referable and the inner back-edge becomes a
    // reference to its id.
    assert_eq!(json, r#"{"b":{"a":{":ref":1}},":refid":1}"#);

    let a2: Rc<RefCell<A>> = classify_json::from_str(&json).unwrap();
    let b2 = a2.borrow().b.clone().unwrap();
    let back = b2.borrow().a.clone().unwrap();
    assert!(Rc::ptr_eq(&a2, &back));
}

#[test]
fn self_loop() {
    #[derive(Classify, Debug, Default)]
    struct Node {
        next: Option<Rc<RefCell<Node>>>,
    }

    let node = Rc::new(RefCell::new(Node { next: None }));
    node.borrow_mut().next = Some(Rc::clone(&node));

    let json = classify_json::to_string(&node).unwrap();
    assert_eq!(json, r#"{"next":{":ref":1},":refid":1}"#);

    let back: Rc<RefCell<Node>> = classify_json::from_str(&json).unwrap();
    let next = back.borrow().next.clone().unwrap();
    assert!(Rc::ptr_eq(&back, &next));
}

#[test]
fn shared_arc_is_emitted_once() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct Settings {
        name: String,
    }

    #[derive(Classify, Debug, Default, PartialEq)]
    struct App {
        first: Arc<Settings>,
        second: Arc<Settings>,
    }

    let shared = Arc::new(Settings { name: "s".into() });
    let app = App {
        first: Arc::clone(&shared),
        second: Arc::clone(&shared),
    };

    let json = classify_json::to_string(&app).unwrap();
    assert_eq!(
        json,
        r#"{"first":{"name":"s",":refid":1},"second":{":ref":1}}"#
    );

    let back: App = classify_json::from_str(&json).unwrap();
    assert_eq!(back, app);
    assert!(Arc::ptr_eq(&back.first, &back.second));
}

#[test]
fn unshared_handles_carry_no_ids() {
    #[derive(Classify, Debug, Default, PartialEq)]
    struct One {
        only: Arc<String>,
    }

    let json = classify_json::to_string(&One {
        only: Arc::new("x".into()),
    })
    .unwrap();
    assert_eq!(json, r#"{"only":"x"}"#);
}

#[test]
fn forward_references_resolve_through_promises() {
    // Hand-built wire with the reference occurring before its referable.
    let json = r#"{"second":{":ref":4},"first":{"v":3,":refid":4}}"#;

    #[derive(Classify, Debug, Default)]
    struct V {
        v: i32,
    }

    // Members populate in declaration order, so `second` meets the
    // reference before `first` produces its referable.
    #[derive(Classify, Debug, Default)]
    struct Holder {
        second: Option<Rc<RefCell<V>>>,
        first: Option<Rc<RefCell<V>>>,
    }

    let back: Holder = classify_json::from_str(json).unwrap();
    let first = back.first.unwrap();
    let second = back.second.unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(first.borrow().v, 3);
}

#[test]
fn dangling_references_are_detected() {
    #[derive(Classify, Debug, Default)]
    struct Holder {
        node: Option<Rc<RefCell<A>>>,
    }

    let err = classify_json::from_str::<Holder>(r#"{"node":{":ref":9}}"#).unwrap_err();
    assert!(matches!(
        err.kind(),
        classify::ErrorKind::DanglingReference(9)
    ));
}

#[test]
fn referable_promotion_is_idempotent() {
    use classify::Format;
    use classify_json::JsonFormat;

    let format = JsonFormat::new();
    let element = format.format_simple(&classify::Scalar::I64(5));
    let once = format.format_referable(element, 3);
    let twice = format.format_referable(once.clone(), 3);
    assert_eq!(once, twice);
}

#[test]
fn deterministic_identity_assignment() {
    let a1 = Rc::new(RefCell::new(A { b: None }));
    let b1 = Rc::new(RefCell::new(B {
        a: Some(Rc::clone(&a1)),
    }));
    a1.borrow_mut().b = Some(Rc::clone(&b1));

    assert_eq!(
        classify_json::to_vec(&a1).unwrap(),
        classify_json::to_vec(&a1).unwrap()
    );
}
