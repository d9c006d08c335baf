use futures::FutureExt;
use tracing::debug;

use super::UseCaseError;
use crate::repository::{TodoRepository, TransactionRunner};
use crate::todo::{Todo, TodoId};

/// Loads a single todo by id.
#[derive(Clone)]
pub struct GetTodo<R, U> {
    repository: R,
    runner: U,
}

impl<R, U> GetTodo<R, U>
where
    R: TodoRepository,
    U: TransactionRunner<Tx = R::Tx>,
{
    pub fn new(repository: R, runner: U) -> Self {
        Self { repository, runner }
    }

    pub async fn execute(&self, id: TodoId) -> Result<Todo, UseCaseError> {
        let repository = self.repository.clone();
        let todo = self
            .runner
            .run_in_tx(move |tx| {
                async move { Ok::<_, UseCaseError>(repository.find_by_id(tx, id).await?) }.boxed()
            })
            .await?;

        debug!(stage = "usecase", todo_id = %id, "todo loaded");
        Ok(todo)
    }
}

/// Loads every live todo.
#[derive(Clone)]
pub struct GetTodos<R, U> {
    repository: R,
    runner: U,
}

impl<R, U> GetTodos<R, U>
where
    R: TodoRepository,
    U: TransactionRunner<Tx = R::Tx>,
{
    pub fn new(repository: R, runner: U) -> Self {
        Self { repository, runner }
    }

    pub async fn execute(&self) -> Result<Vec<Todo>, UseCaseError> {
        let repository = self.repository.clone();
        let todos = self
            .runner
            .run_in_tx(move |tx| {
                async move { Ok::<_, UseCaseError>(repository.find_all(tx).await?) }.boxed()
            })
            .await?;

        debug!(stage = "usecase", count = todos.len(), "todos loaded");
        Ok(todos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::repository::RepositoryError;
    use crate::usecase::memory::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn get_returns_stored_todo() {
        let store = MemoryStore::default();
        let todo = Todo::new("Test Todo", "body", Utc::now()).expect("todo");
        store.insert(todo.clone());

        let loaded = GetTodo::new(store.repository(), store.runner())
            .execute(todo.id())
            .await
            .expect("get");

        assert_eq!(loaded, todo);
        assert_eq!(store.begun(), 1);
        assert_eq!(store.committed(), 1);
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let store = MemoryStore::default();
        let missing = TodoId::generate();

        let err = GetTodo::new(store.repository(), store.runner())
            .execute(missing)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(matches!(
            err,
            UseCaseError::Repository(RepositoryError::NotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn get_all_on_empty_store_is_empty() {
        let store = MemoryStore::default();

        let todos = GetTodos::new(store.repository(), store.runner())
            .execute()
            .await
            .expect("empty list is not an error");

        assert!(todos.is_empty());
        assert_eq!(store.begun(), 1);
    }

    #[tokio::test]
    async fn get_all_returns_creation_order() {
        let store = MemoryStore::default();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Todo::new("second", "", base + Duration::minutes(1)).expect("todo");
        let earlier = Todo::new("first", "", base).expect("todo");
        store.insert(later.clone());
        store.insert(earlier.clone());

        let todos = GetTodos::new(store.repository(), store.runner())
            .execute()
            .await
            .expect("get all");

        let titles: Vec<&str> = todos.iter().map(Todo::title).collect();
        assert_eq!(titles, vec!["first", "second"]);
    }
}
