use std::{panic::AssertUnwindSafe, str::FromStr, sync::Arc, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use futures::FutureExt;
use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Sqlite, SqlitePool, Transaction,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use oniontodo_core::{
    RepositoryError, Todo, TodoId, TodoRepository, TodoStatus, TransactionRunner, TxFuture,
};

/// Transaction handle threaded through every repository call.
pub type SqliteTx = Transaction<'static, Sqlite>;

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    tx_gate: Arc<Mutex<()>>,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    ///
    /// Every pooled connection gets foreign keys, WAL journaling, `NORMAL`
    /// synchronous mode and a 5s busy timeout. An in-memory database lives in a
    /// single connection, so its pool is capped at one connection that is never
    /// recycled.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StorageError::Connect)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_millis(5000));

        let mut pool_options = SqlitePoolOptions::new().max_connections(5);
        if is_in_memory(database_url) {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        info!(stage = "storage", in_memory = is_in_memory(database_url), "sqlite pool ready");
        Ok(Self {
            pool,
            tx_gate: Arc::new(Mutex::new(())),
        })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle to the todo repository.
    pub fn todos(&self) -> SqliteTodoRepository {
        SqliteTodoRepository
    }

    /// Returns a runner that opens transactions on this pool.
    ///
    /// Runners from the same `Database` share one gate, so at most one of
    /// their transactions is open at a time.
    pub fn transactions(&self) -> SqliteTransactionRunner {
        SqliteTransactionRunner {
            pool: self.pool.clone(),
            gate: Arc::clone(&self.tx_gate),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
}

/// Repository responsible for the `todo` table.
///
/// Rows are soft deleted: `deleted_at` is stamped and every statement ignores
/// rows where it is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTodoRepository;

impl TodoRepository for SqliteTodoRepository {
    type Tx = SqliteTx;

    async fn create(&self, tx: &mut SqliteTx, todo: &Todo) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO todo \
             (id, title, body, status, created_at, updated_at, completed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(todo.id().to_string())
        .bind(todo.title())
        .bind(todo.body())
        .bind(todo.status().as_str())
        .bind(to_rfc3339(todo.created_at()))
        .bind(to_rfc3339(todo.updated_at()))
        .bind(todo.completed_at().map(to_rfc3339))
        .execute(&mut **tx)
        .await
        .map_err(RepositoryError::backend)?;

        Ok(())
    }

    async fn update(&self, tx: &mut SqliteTx, todo: &Todo) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE todo \
             SET title = ?, body = ?, status = ?, updated_at = ?, completed_at = ? \
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(todo.title())
        .bind(todo.body())
        .bind(todo.status().as_str())
        .bind(to_rfc3339(todo.updated_at()))
        .bind(todo.completed_at().map(to_rfc3339))
        .bind(todo.id().to_string())
        .execute(&mut **tx)
        .await
        .map_err(RepositoryError::backend)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(todo.id()));
        }
        Ok(())
    }

    async fn find_by_id(&self, tx: &mut SqliteTx, id: TodoId) -> Result<Todo, RepositoryError> {
        let row = sqlx::query_as::<_, TodoRow>(
            "SELECT id, title, body, status, created_at, updated_at, completed_at \
             FROM todo WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(id.to_string())
        .fetch_optional(&mut **tx)
        .await
        .map_err(RepositoryError::backend)?
        .ok_or(RepositoryError::NotFound(id))?;

        row.into_domain()
    }

    async fn find_all(&self, tx: &mut SqliteTx) -> Result<Vec<Todo>, RepositoryError> {
        let rows = sqlx::query_as::<_, TodoRow>(
            "SELECT id, title, body, status, created_at, updated_at, completed_at \
             FROM todo WHERE deleted_at IS NULL ORDER BY created_at, id",
        )
        .fetch_all(&mut **tx)
        .await
        .map_err(RepositoryError::backend)?;

        rows.into_iter().map(TodoRow::into_domain).collect()
    }

    async fn delete(
        &self,
        tx: &mut SqliteTx,
        id: TodoId,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE todo SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(to_rfc3339(deleted_at))
                .bind(id.to_string())
                .execute(&mut **tx)
                .await
                .map_err(RepositoryError::backend)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }
}

/// Persisted shape of a todo.
#[derive(Debug, sqlx::FromRow)]
struct TodoRow {
    id: String,
    title: String,
    body: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TodoRow {
    /// Converts the database row into a domain todo.
    fn into_domain(self) -> Result<Todo, RepositoryError> {
        let id: TodoId = self
            .id
            .parse()
            .map_err(|err| RepositoryError::Corrupt(format!("{err}")))?;
        let status: TodoStatus = self
            .status
            .parse()
            .map_err(|err| RepositoryError::Corrupt(format!("todo {id}: {err}")))?;

        Ok(Todo::reconstruct(
            id,
            self.title,
            self.body,
            status,
            self.created_at,
            self.updated_at,
            self.completed_at,
        ))
    }
}

/// Runs units of work inside SQLite transactions opened on the pool.
///
/// SQLite opens `BEGIN` transactions deferred: a unit of work that reads
/// before it writes must upgrade its lock, and under WAL that upgrade fails
/// with `SQLITE_BUSY` without waiting once another connection has committed.
/// Transactions are therefore serialized through `gate`.
#[derive(Clone)]
pub struct SqliteTransactionRunner {
    pool: SqlitePool,
    gate: Arc<Mutex<()>>,
}

impl TransactionRunner for SqliteTransactionRunner {
    type Tx = SqliteTx;

    async fn run_in_tx<T, E, F>(&self, work: F) -> Result<T, E>
    where
        T: Send,
        E: From<RepositoryError> + Send,
        F: for<'c> FnOnce(&'c mut SqliteTx) -> TxFuture<'c, Result<T, E>> + Send,
    {
        let _turn = self.gate.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| E::from(RepositoryError::backend(err)))?;

        match AssertUnwindSafe(work(&mut tx)).catch_unwind().await {
            Ok(Ok(value)) => {
                tx.commit()
                    .await
                    .map_err(|err| E::from(RepositoryError::backend(err)))?;
                Ok(value)
            }
            Ok(Err(err)) => {
                rollback(tx).await;
                Err(err)
            }
            Err(panic) => {
                rollback(tx).await;
                std::panic::resume_unwind(panic)
            }
        }
    }
}

// The caller's error wins over a failed rollback; SQLite discards the
// transaction when the connection is reset either way.
async fn rollback(tx: SqliteTx) {
    if let Err(err) = tx.rollback().await {
        warn!(stage = "storage", error = %err, "transaction rollback failed");
    }
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
