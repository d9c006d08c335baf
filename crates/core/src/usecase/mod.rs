//! Application use cases.
//!
//! Every use case owns a repository, a transaction runner sharing the same
//! transaction type, and a clock. `execute` opens exactly one transaction;
//! validation that needs no stored state happens before it is opened.
mod create;
mod delete;
mod lifecycle;
mod query;
mod update;

#[cfg(test)]
pub(crate) mod memory;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::{ErrorKind, TodoError};
use crate::repository::{RepositoryError, TodoRepository, TransactionRunner};

pub use create::{CreateTodo, CreateTodoRequest};
pub use delete::DeleteTodo;
pub use lifecycle::{CompleteTodo, StartTodo};
pub use query::{GetTodo, GetTodos};
pub use update::{UpdateTodo, UpdateTodoRequest};

/// Source of the current time for mutating operations.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Clock backed by the system time.
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Failure of a use case, keeping the original domain or repository error.
#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error(transparent)]
    Domain(#[from] TodoError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl UseCaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(err) => err.kind(),
            Self::Repository(err) => err.kind(),
        }
    }
}

/// All todo use cases wired against one repository and runner.
#[derive(Clone)]
pub struct TodoUseCases<R, U> {
    pub create: CreateTodo<R, U>,
    pub get: GetTodo<R, U>,
    pub get_all: GetTodos<R, U>,
    pub update: UpdateTodo<R, U>,
    pub start: StartTodo<R, U>,
    pub complete: CompleteTodo<R, U>,
    pub delete: DeleteTodo<R, U>,
}

impl<R, U> TodoUseCases<R, U>
where
    R: TodoRepository,
    U: TransactionRunner<Tx = R::Tx>,
{
    pub fn new(repository: R, runner: U, clock: Clock) -> Self {
        Self {
            create: CreateTodo::new(repository.clone(), runner.clone(), clock.clone()),
            get: GetTodo::new(repository.clone(), runner.clone()),
            get_all: GetTodos::new(repository.clone(), runner.clone()),
            update: UpdateTodo::new(repository.clone(), runner.clone(), clock.clone()),
            start: StartTodo::new(repository.clone(), runner.clone(), clock.clone()),
            complete: CompleteTodo::new(repository.clone(), runner.clone(), clock.clone()),
            delete: DeleteTodo::new(repository, runner, clock),
        }
    }
}
