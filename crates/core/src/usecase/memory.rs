//! In-memory repository and runner with real commit/rollback semantics.
use std::{
    collections::BTreeMap,
    io,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};

use crate::repository::{RepositoryError, TodoRepository, TransactionRunner, TxFuture};
use crate::todo::{Todo, TodoId};

#[derive(Default)]
struct MemoryState {
    rows: BTreeMap<TodoId, Todo>,
    deleted: BTreeMap<TodoId, DateTime<Utc>>,
    begun: usize,
    committed: usize,
    rolled_back: usize,
    fail_commit: bool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn repository(&self) -> MemoryTodoRepository {
        MemoryTodoRepository
    }

    pub fn runner(&self) -> MemoryTransactionRunner {
        MemoryTransactionRunner {
            store: self.clone(),
        }
    }

    pub fn insert(&self, todo: Todo) {
        self.lock().rows.insert(todo.id(), todo);
    }

    pub fn get(&self, id: TodoId) -> Option<Todo> {
        self.lock().rows.get(&id).cloned()
    }

    pub fn deleted_at(&self, id: TodoId) -> Option<DateTime<Utc>> {
        self.lock().deleted.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn begun(&self) -> usize {
        self.lock().begun
    }

    pub fn committed(&self) -> usize {
        self.lock().committed
    }

    pub fn rolled_back(&self) -> usize {
        self.lock().rolled_back
    }

    pub fn fail_commits(&self) {
        self.lock().fail_commit = true;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory store poisoned")
    }
}

/// Working copy of the rows, published on commit.
pub struct MemoryTx {
    rows: BTreeMap<TodoId, Todo>,
    deleted: BTreeMap<TodoId, DateTime<Utc>>,
}

#[derive(Clone)]
pub struct MemoryTodoRepository;

impl TodoRepository for MemoryTodoRepository {
    type Tx = MemoryTx;

    async fn create(&self, tx: &mut MemoryTx, todo: &Todo) -> Result<(), RepositoryError> {
        tx.rows.insert(todo.id(), todo.clone());
        Ok(())
    }

    async fn update(&self, tx: &mut MemoryTx, todo: &Todo) -> Result<(), RepositoryError> {
        let slot = tx
            .rows
            .get_mut(&todo.id())
            .ok_or(RepositoryError::NotFound(todo.id()))?;
        *slot = todo.clone();
        Ok(())
    }

    async fn find_by_id(&self, tx: &mut MemoryTx, id: TodoId) -> Result<Todo, RepositoryError> {
        tx.rows.get(&id).cloned().ok_or(RepositoryError::NotFound(id))
    }

    async fn find_all(&self, tx: &mut MemoryTx) -> Result<Vec<Todo>, RepositoryError> {
        let mut todos: Vec<Todo> = tx.rows.values().cloned().collect();
        todos.sort_by_key(|todo| (todo.created_at(), todo.id()));
        Ok(todos)
    }

    async fn delete(
        &self,
        tx: &mut MemoryTx,
        id: TodoId,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        tx.rows.remove(&id).ok_or(RepositoryError::NotFound(id))?;
        tx.deleted.insert(id, deleted_at);
        Ok(())
    }
}

#[derive(Clone)]
pub struct MemoryTransactionRunner {
    store: MemoryStore,
}

impl TransactionRunner for MemoryTransactionRunner {
    type Tx = MemoryTx;

    async fn run_in_tx<T, E, F>(&self, work: F) -> Result<T, E>
    where
        T: Send,
        E: From<RepositoryError> + Send,
        F: for<'c> FnOnce(&'c mut MemoryTx) -> TxFuture<'c, Result<T, E>> + Send,
    {
        let mut tx = {
            let mut state = self.store.lock();
            state.begun += 1;
            MemoryTx {
                rows: state.rows.clone(),
                deleted: state.deleted.clone(),
            }
        };

        let outcome = work(&mut tx).await;

        let mut state = self.store.lock();
        match outcome {
            Ok(_) if state.fail_commit => {
                state.rolled_back += 1;
                Err(E::from(RepositoryError::backend(io::Error::other(
                    "commit failed",
                ))))
            }
            Ok(value) => {
                state.rows = tx.rows;
                state.deleted = tx.deleted;
                state.committed += 1;
                Ok(value)
            }
            Err(err) => {
                state.rolled_back += 1;
                Err(err)
            }
        }
    }
}
