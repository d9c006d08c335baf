use futures::FutureExt;
use tracing::info;

use super::{Clock, UseCaseError};
use crate::repository::{TodoRepository, TransactionRunner};
use crate::todo::Todo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTodoRequest {
    pub title: String,
    pub body: String,
}

/// Creates and persists a new todo.
#[derive(Clone)]
pub struct CreateTodo<R, U> {
    repository: R,
    runner: U,
    clock: Clock,
}

impl<R, U> CreateTodo<R, U>
where
    R: TodoRepository,
    U: TransactionRunner<Tx = R::Tx>,
{
    pub fn new(repository: R, runner: U, clock: Clock) -> Self {
        Self {
            repository,
            runner,
            clock,
        }
    }

    /// Validates the request through [`Todo::new`] before any transaction is
    /// opened, then stores the todo and returns it.
    pub async fn execute(&self, request: CreateTodoRequest) -> Result<Todo, UseCaseError> {
        let todo = Todo::new(request.title, request.body, (self.clock)())?;

        let repository = self.repository.clone();
        let record = todo.clone();
        self.runner
            .run_in_tx(move |tx| {
                async move {
                    repository.create(tx, &record).await?;
                    Ok::<_, UseCaseError>(())
                }
                .boxed()
            })
            .await?;

        info!(stage = "usecase", todo_id = %todo.id(), "todo created");
        Ok(todo)
    }
}
