use futures::FutureExt;
use tracing::info;

use super::{Clock, UseCaseError};
use crate::repository::{TodoRepository, TransactionRunner};
use crate::todo::TodoId;

/// Removes a todo. Deleting an unknown id is reported as not found.
#[derive(Clone)]
pub struct DeleteTodo<R, U> {
    repository: R,
    runner: U,
    clock: Clock,
}

impl<R, U> DeleteTodo<R, U>
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
                async move { Ok::<_, UseCaseError>(repository.delete(tx, id, now).await?) }
                    .boxed()
            })
            .await?;

        info!(stage = "usecase", todo_id = %id, "todo deleted");
        Ok(())
    }
}
