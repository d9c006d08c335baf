use futures::FutureExt;
use tracing::info;

use super::{Clock, UseCaseError};
use crate::repository::{TodoRepository, TransactionRunner};
use crate::todo::TodoId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTodoRequest {
    pub id: TodoId,
    pub title: String,
    pub body: String,
}

/// Replaces the title and body of an existing todo.
#[derive(Clone)]
pub struct UpdateTodo<R, U> {
    repository: R,
    runner: U,
    clock: Clock,
}

impl<R, U> UpdateTodo<R, U>
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

    /// An empty title aborts the transaction, so neither field changes.
    pub async fn execute(&self, request: UpdateTodoRequest) -> Result<(), UseCaseError> {
        let repository = self.repository.clone();
        let now = (self.clock)();
        let UpdateTodoRequest { id, title, body } = request;

        self.runner
            .run_in_tx(move |tx| {
                async move {
                    let mut todo = repository.find_by_id(tx, id).await?;
                    todo.set_title(title, now)?;
                    todo.set_body(body, now);
                    repository.update(tx, &todo).await?;
                    Ok::<_, UseCaseError>(())
                }
                .boxed()
            })
            .await?;

        info!(stage = "usecase", todo_id = %id, "todo updated");
        Ok(())
    }
}
