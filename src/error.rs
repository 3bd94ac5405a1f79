use thiserror::Error;

use crate::location::Location;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while tokenizing, parsing, or resolving a
/// configuration.
///
/// Tokenizer and parser errors always carry the location of the offending
/// text. Lookup-time errors carry one when the failing AST node has one.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    #[error("{location}: {message}")]
    Tokenizer { message: String, location: Location },

    #[error("{location}: {message}")]
    Parser { message: String, location: Location },

    /// A lookup string that is neither an identifier nor a parseable path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// An index or slice applied to something that cannot accept it.
    #[error("{message}")]
    BadIndex {
        message: String,
        location: Option<Location>,
    },

    /// A `$` reference chain that comes back to itself. The payload lists
    /// every reference in the cycle, sorted, with its location.
    #[error("circular reference: {0}")]
    CircularReference(String),

    #[error("not found in configuration: {0}")]
    NotFound(String),

    #[error("duplicate key {key} seen at {location} (previously at {original})")]
    DuplicateKey {
        key: String,
        location: Location,
        original: Location,
    },

    /// A back-tick string that no converter rule accepted, under the strict
    /// conversion policy.
    #[error("unable to convert string {0}")]
    Conversion(String),

    /// A bad argument to an API entry point, e.g. an unknown parse rule.
    #[error("{0}")]
    Argument(String),

    /// Any other evaluation failure: type mismatches, missing include files,
    /// unknown context variables, arithmetic overflow.
    #[error("{message}")]
    Evaluation {
        message: String,
        location: Option<Location>,
    },
}

impl Error {
    pub(crate) fn tokenizer(message: impl Into<String>, location: Location) -> Self {
        Error::Tokenizer {
            message: message.into(),
            location,
        }
    }

    pub(crate) fn parser(message: impl Into<String>, location: Location) -> Self {
        Error::Parser {
            message: message.into(),
            location,
        }
    }

    pub(crate) fn bad_index(message: impl Into<String>, location: Option<Location>) -> Self {
        Error::BadIndex {
            message: message.into(),
            location,
        }
    }

    pub(crate) fn evaluation(message: impl Into<String>, location: Option<Location>) -> Self {
        Error::Evaluation {
            message: message.into(),
            location,
        }
    }

    /// The source location attached to this error, if it has one.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::Tokenizer { location, .. } | Error::Parser { location, .. } => Some(*location),
            Error::DuplicateKey { location, .. } => Some(*location),
            Error::BadIndex { location, .. } | Error::Evaluation { location, .. } => *location,
            _ => None,
        }
    }
}
