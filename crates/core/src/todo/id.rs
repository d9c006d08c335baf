use std::{fmt, str::FromStr};

use thiserror::Error;
use uuid::Uuid;

/// Identifier of a [`super::Todo`].
///
/// Backed by a UUID v7, so identifiers generated later sort after earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TodoId(Uuid);

impl TodoId {
    /// Generates a fresh time-ordered identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.as_hyphenated().fmt(f)
    }
}

impl FromStr for TodoId {
    type Err = ParseTodoIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|err| ParseTodoIdError {
                value: value.to_string(),
                source: err,
            })
    }
}

/// Returned when a string is not a valid todo identifier.
#[derive(Debug, Error)]
#[error("failed to parse todo id {value:?}: {source}")]
pub struct ParseTodoIdError {
    value: String,
    #[source]
    source: uuid::Error,
}
