//! Domain and application layers of the todo service.
//!
//! `todo` and `error` hold the entity and its invariants. `repository` and
//! `usecase` describe how the application drives persistence without knowing
//! which store sits underneath.
pub mod error;
pub mod repository;
pub mod todo;
pub mod usecase;

pub use error::{ErrorKind, TodoError};
pub use repository::{RepositoryError, TodoRepository, TransactionRunner, TxFuture};
pub use todo::{ParseTodoIdError, ParseTodoStatusError, Todo, TodoId, TodoStatus};
