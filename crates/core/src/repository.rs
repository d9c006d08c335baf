//! Persistence contracts consumed by the use cases.
//!
//! The transaction handle is an associated type and is passed explicitly to
//! every repository call, so a unit of work can only touch the store through
//! the handle the runner opened for it.
use std::{error::Error as StdError, future::Future};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::todo::{Todo, TodoId};

/// Future returned by a unit of work. It may borrow the transaction handle.
pub type TxFuture<'c, T> = BoxFuture<'c, T>;

/// Errors surfaced by repositories and transaction runners.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("todo not found: {0}")]
    NotFound(TodoId),
    #[error("stored todo is corrupt: {0}")]
    Corrupt(String),
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
}

impl RepositoryError {
    pub fn backend<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Corrupt(_) | Self::Backend(_) => ErrorKind::Internal,
        }
    }
}

/// CRUD access to todos, scoped to a transaction handle.
pub trait TodoRepository: Clone + Send + Sync + 'static {
    type Tx: Send;

    fn create(
        &self,
        tx: &mut Self::Tx,
        todo: &Todo,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Overwrites the mutable fields of an existing todo.
    fn update(
        &self,
        tx: &mut Self::Tx,
        todo: &Todo,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn find_by_id(
        &self,
        tx: &mut Self::Tx,
        id: TodoId,
    ) -> impl Future<Output = Result<Todo, RepositoryError>> + Send;

    /// Returns every live todo in creation order.
    fn find_all(
        &self,
        tx: &mut Self::Tx,
    ) -> impl Future<Output = Result<Vec<Todo>, RepositoryError>> + Send;

    /// Marks a todo as deleted at `deleted_at`; it is unknown afterwards.
    fn delete(
        &self,
        tx: &mut Self::Tx,
        id: TodoId,
        deleted_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Runs a unit of work atomically.
///
/// The runner commits when `work` returns `Ok` and rolls back when it returns
/// `Err`, handing the error back unchanged. A panic inside `work` rolls the
/// transaction back before the panic continues to unwind. Failures to begin or
/// commit are converted into `E` through `From<RepositoryError>`.
pub trait TransactionRunner: Clone + Send + Sync + 'static {
    type Tx: Send;

    fn run_in_tx<T, E, F>(&self, work: F) -> impl Future<Output = Result<T, E>> + Send
    where
        T: Send,
        E: From<RepositoryError> + Send,
        F: for<'c> FnOnce(&'c mut Self::Tx) -> TxFuture<'c, Result<T, E>> + Send;
}
