//! Wire paths: the member/index/key trail from the root to an element,
//! attached to errors so failures can be located in the document.

use std::fmt::Write;

#[derive(Debug, Clone)]
pub(crate) enum Seg {
    Field(&'static str),
    Index(usize),
    Key(String),
}

pub(crate) fn render(segments: &[Seg]) -> String {
    let mut out = String::from("root");
    for seg in segments {
        match seg {
            Seg::Field(name) => {
                let _ = write!(out, ".{name}");
            }
            Seg::Index(i) => {
                let _ = write!(out, "[{i}]");
            }
            Seg::Key(k) => {
                let _ = write!(out, "[{k:?}]");
            }
        }
    }
    out
}
