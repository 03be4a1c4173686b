//! Polymorphic members: type tags, registry resolution, containers of
//! trait objects.

use classify::{Classify, ClassifyDyn, classify_polymorphic};
use classify_testhelpers::setup;

#[derive(Classify, Debug, Default, PartialEq)]
struct Dog {
    name: String,
}

#[derive(Classify, Debug, Default, PartialEq)]
struct Cat {
    name: String,
    lives: u8,
}

trait Animal: ClassifyDyn {
    fn label(&self) -> String;
}

impl Animal for Dog {
    fn label(&self) -> String {
        format!("dog {}", self.name)
    }
}

impl Animal for Cat {
    fn label(&self) -> String {
        format!("cat {}", self.name)
    }
}

classify_polymorphic!(dyn Animal => Dog, Cat);

#[derive(Classify, Default)]
struct Zoo {
    animals: Vec<Box<dyn Animal>>,
}

impl std::fmt::Debug for Zoo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zoo")
            .field("animals", &self.animals.iter().map(|a| a.label()).collect::<Vec<_>>())
            .finish()
    }
}

#[test]
fn polymorphic_list_carries_short_type_tags() {
    setup();
    let zoo = Zoo {
        animals: vec![
            Box::new(Dog { name: "rex".into() }),
            Box::new(Cat {
                name: "mia".into(),
                lives: 9,
            }),
        ],
    };

    let json = classify_json::to_string(&zoo).unwrap();
    assert_eq!(
        json,
        r#"{"animals":[{"name":"rex",":type":"Dog"},{"name":"mia","lives":9,":type":"Cat"}]}"#
    );

    let back: Zoo = classify_json::from_str(&json).unwrap();
    let labels: Vec<String> = back.animals.iter().map(|a| a.label()).collect();
    assert_eq!(labels, vec!["dog rex", "cat mia"]);
}

#[test]
fn unknown_type_tags_are_an_error() {
    let err =
        classify_json::from_str::<Zoo>(r#"{"animals":[{"name":"?",":type":"Wolf"}]}"#).unwrap_err();
    assert!(err.to_string().contains("Wolf"));
}

#[test]
fn missing_type_tags_are_an_error() {
    let err = classify_json::from_str::<Zoo>(r#"{"animals":[{"name":"?"}]}"#).unwrap_err();
    assert!(err.to_string().contains("type tag"));
}

#[test]
fn fully_qualified_tags_resolve_too() {
    let tag = std::any::type_name::<Dog>();
    let json = format!(r#"{{"animals":[{{"name":"rex",":fulltype":"{tag}"}}]}}"#);
    let back: Zoo = classify_json::from_str(&json).unwrap();
    assert_eq!(back.animals[0].label(), "dog rex");
}
