use futures::FutureExt;
use tracing::info;

use super::{Clock, UseCaseError};
use crate::repository::{TodoRepository, TransactionRunner};
use crate::todo::TodoId;

/// Moves a todo into `InProgress`.
#[derive(Clone)]
pub struct StartTodo<R, U> {
    repository: R,
    runner: U,
    clock: Clock,
}

impl<R, U> StartTodo<R, U>
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

    pub async fn execute(&self, id: TodoId) -> Result<(), UseCaseError> {
        let repository = self.repository.clone();
        let now = (self.clock)();

        self.runner
            .run_in_tx(move |tx| {
                async move {
                    let mut todo = repository.find_by_id(tx, id).await?;
                    todo.start(now)?;
                    repository.update(tx, &todo).await?;
                    Ok::<_, UseCaseError>(())
                }
                .boxed()
            })
            .await?;

        info!(stage = "usecase", todo_id = %id, "todo started");
        Ok(())
    }
}

/// Moves a todo into `Completed`.
#[derive(Clone)]
pub struct CompleteTodo<R, U> {
    repository: R,
    runner: U,
    clock: Clock,
}

impl<R, U> CompleteTodo<R, U>
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

    pub async fn execute(&self, id: TodoId) -> Result<(), UseCaseError> {
        let repository = self.repository.clone();
        let now = (self.clock)();

        self.runner
            .run_in_tx(move |tx| {
                async move {
                    let mut todo = repository.find_by_id(tx, id).await?;
                    todo.complete(now)?;
                    repository.update(tx, &todo).await?;
                    Ok::<_, UseCaseError>(())
                }
                .boxed()
            })
            .await?;

        info!(stage = "usecase", todo_id = %id, "todo completed");
        Ok(())
    }
}
