//! Deferred external references: follow-id markers, writer and reader
//! callbacks, unresolvable access.

use std::cell::Cell;
use std::rc::Rc;

use classify::{Classify, DeferredObject, Options};
use classify_testhelpers::setup;

#[derive(Classify, Debug, Default, PartialEq, Clone)]
struct Settings {
    theme: String,
}

#[derive(Classify, Default)]
struct App {
    deferred: DeferredObject<Settings>,
}

#[test]
fn follow_id_markers_and_writer_callback() {
    setup();
    let app = App {
        deferred: DeferredObject::new("s-1", Settings { theme: "dark".into() }),
    };

    let calls = Rc::new(Cell::new(0u32));
    let seen = Rc::new(Cell::new(false));
    let options = {
        let calls = Rc::clone(&calls);
        let seen = Rc::clone(&seen);
        Options::new().follow_id_writer(move |id, inner, value| {
            calls.set(calls.get() + 1);
            assert_eq!(id, "s-1");
            assert_eq!(inner.name(), "Settings");
            let settings = value.downcast_ref::<Settings>().unwrap();
            seen.set(settings.theme == "dark");
            Ok(())
        })
    };

    let json = classify_json::to_string_with(&app, &options).unwrap();
    assert_eq!(json, r#"{"deferred":{":id":"s-1"}}"#);
    assert_eq!(calls.get(), 1);
    assert!(seen.get());
}

#[test]
fn unevaluated_members_do_not_invoke_the_writer() {
    let app = App {
        deferred: DeferredObject::from_loader("s-2", None),
    };
    let options = Options::new().follow_id_writer(|_, _, _| {
        panic!("writer must not run for unevaluated members");
    });
    let json = classify_json::to_string_with(&app, &options).unwrap();
    assert_eq!(json, r#"{"deferred":{":id":"s-2"}}"#);
}

#[test]
fn access_without_a_reader_is_unresolvable() {
    let back: App = classify_json::from_str(r#"{"deferred":{":id":"s-1"}}"#).unwrap();
    assert_eq!(back.deferred.id(), "s-1");
    assert!(back.deferred.evaluated().is_none());
    let err = back.deferred.get().unwrap_err();
    assert!(matches!(
        err.kind(),
        classify::ErrorKind::FollowIdUnresolvable(id) if id == "s-1"
    ));
}

#[test]
fn reader_resolves_on_first_access() {
    let options = Options::new().follow_id_reader(|id, inner, _parent| {
        assert_eq!(inner.name(), "Settings");
        Ok(Box::new(Settings {
            theme: format!("from {id}"),
        }) as Box<dyn std::any::Any>)
    });

    let back: App =
        classify_json::from_str_with(r#"{"deferred":{":id":"s-9"}}"#, &options).unwrap();
    assert!(back.deferred.evaluated().is_none());
    let value = back.deferred.get().unwrap();
    assert_eq!(value.theme, "from s-9");
    // Later accesses reuse the evaluated value.
    assert!(back.deferred.evaluated().is_some());
}
