use std::{fmt, str::FromStr};

use thiserror::Error;

/// Lifecycle state of a todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TodoStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl TodoStatus {
    pub const ALL: [TodoStatus; 3] = [Self::NotStarted, Self::InProgress, Self::Completed];

    /// Returns the canonical database representation for the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }

    /// `Completed` is terminal: nothing transitions out of it.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoStatus {
    type Err = ParseTodoStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| ParseTodoStatusError(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid todo status: {0}")]
pub struct ParseTodoStatusError(pub String);
