//! Error types for session construction and misuse.

use std::fmt;

/// Result type for rex-chase operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that block a session from starting or abort a misused operation.
///
/// Frame-scoped conditions (a missing obstacle, an unknown cue handle) are
/// never reported through this type; they are logged and skipped.
#[derive(Debug)]
pub enum Error {
    /// A tuning value is out of range or a template list is empty.
    Config {
        /// The offending field.
        field: &'static str,
        /// What was wrong with it.
        detail: String,
    },
    /// An animation clip lacks a label the simulation depends on.
    MissingLabel {
        /// The clip that was searched.
        clip: &'static str,
        /// The label that was not found.
        label: String,
    },
    /// An operation was invoked in a state where it is a programming error.
    Invariant {
        /// Description of the misuse.
        detail: &'static str,
    },
    /// Tuning JSON could not be parsed.
    Json(serde_json::Error),
}

impl Error {
    pub(crate) fn config(field: &'static str, detail: impl Into<String>) -> Self {
        Error::Config {
            field,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config { field, detail } => {
                write!(f, "invalid tuning value `{field}`: {detail}")
            }
            Error::MissingLabel { clip, label } => {
                write!(f, "animation clip `{clip}` has no label `{label}`")
            }
            Error::Invariant { detail } => write!(f, "invariant violated: {detail}"),
            Error::Json(e) => write!(f, "failed to parse tuning: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}
