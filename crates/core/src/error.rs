use thiserror::Error;

use crate::todo::TodoStatus;

/// Coarse category used by outer layers to pick a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    State,
    NotFound,
    Internal,
}

/// Errors raised by the todo entity itself.
///
/// Lookups that miss are reported by the repository, see
/// [`crate::repository::RepositoryError::NotFound`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoError {
    #[error("{field}: {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: TodoStatus, to: TodoStatus },
    #[error("todo is already completed")]
    AlreadyCompleted,
}

impl TodoError {
    pub(crate) fn title_required() -> Self {
        Self::Validation {
            field: "title",
            reason: "title is required",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::InvalidStateTransition { .. } | Self::AlreadyCompleted => ErrorKind::State,
        }
    }
}
