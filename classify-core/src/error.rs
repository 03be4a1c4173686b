//! The error type shared by the whole classify ecosystem.

use core::fmt::{self, Display};

/// Result alias used across the classify crates.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Error produced by serialization, deserialization or descriptor lookup.
///
/// Carries the specific [`ErrorKind`] plus, when one could be constructed,
/// the wire path from the root to the offending element (member names,
/// list indices and dictionary keys).
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    path: Option<String>,
}

/// The specific kinds of failure defined by the classify contract.
#[derive(Debug)]
pub enum ErrorKind {
    /// A dictionary key type is not a string, integer or enum.
    UnsupportedKeyType(String),
    /// A value was encountered whose type has no recognized layout.
    UnsupportedValueType(String),
    /// An object type without a parameterless constructor was asked to
    /// materialize an instance.
    ConstructorMissing(String),
    /// An exact conversion could not produce a round-trippable result.
    Conversion(String),
    /// A reference was observed with no matching referable after all
    /// elements were processed.
    DanglingReference(u64),
    /// The format driver produced or encountered an ill-formed element.
    Format(String),
    /// A follow-id member was evaluated with no external resolver configured.
    FollowIdUnresolvable(String),
    /// A substitute type equals the original, or options were registered
    /// twice for one type.
    OptionsConflict(String),
}

impl Error {
    /// Create an error without path information.
    pub fn new(kind: ErrorKind) -> Self {
        Error { kind, path: None }
    }

    /// Attach the wire path from the root, replacing any previous one.
    pub fn with_path(mut self, path: String) -> Self {
        self.path = Some(path);
        self
    }

    /// The kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The wire path from the root, if one could be constructed.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Shorthand for a [`ErrorKind::Conversion`] error.
    pub fn conversion(msg: impl Into<String>) -> Self {
        Error::new(ErrorKind::Conversion(msg.into()))
    }

    /// Shorthand for a [`ErrorKind::Format`] error.
    pub fn format(msg: impl Into<String>) -> Self {
        Error::new(ErrorKind::Format(msg.into()))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::UnsupportedKeyType(t) => {
                write!(f, "unsupported dictionary key type `{t}`")?;
            }
            ErrorKind::UnsupportedValueType(t) => {
                write!(f, "unsupported value type `{t}`")?;
            }
            ErrorKind::ConstructorMissing(t) => {
                write!(f, "type `{t}` has no parameterless constructor")?;
            }
            ErrorKind::Conversion(msg) => write!(f, "conversion failed: {msg}")?,
            ErrorKind::DanglingReference(id) => {
                write!(f, "dangling reference to id {id}")?;
            }
            ErrorKind::Format(msg) => write!(f, "malformed element: {msg}")?,
            ErrorKind::FollowIdUnresolvable(id) => {
                write!(f, "follow-id `{id}` has no resolver configured")?;
            }
            ErrorKind::OptionsConflict(msg) => write!(f, "options conflict: {msg}")?,
        }
        if let Some(path) = &self.path {
            write!(f, " (at {path})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}
