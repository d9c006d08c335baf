mod id;
mod status;

use chrono::{DateTime, Utc};

use crate::error::TodoError;

pub use id::{ParseTodoIdError, TodoId};
pub use status::{ParseTodoStatusError, TodoStatus};

/// Aggregate root of the todo domain.
///
/// Fields are private so that every mutation goes through a method that keeps
/// the invariants: the title is never empty, `completed_at` is set exactly when
/// the status is [`TodoStatus::Completed`], and `updated_at` never falls behind
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    id: TodoId,
    title: String,
    body: String,
    status: TodoStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Todo {
    /// Creates a new todo in the `NotStarted` state.
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, TodoError> {
        let title = title.into();
        if title.is_empty() {
            return Err(TodoError::title_required());
        }

        Ok(Self {
            id: TodoId::generate(),
            title,
            body: body.into(),
            status: TodoStatus::NotStarted,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    /// Rebuilds a todo from persisted fields without re-running validation.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: TodoId,
        title: String,
        body: String,
        status: TodoStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            title,
            body,
            status,
            created_at,
            updated_at,
            completed_at,
        }
    }

    pub fn id(&self) -> TodoId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn status(&self) -> TodoStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == TodoStatus::InProgress
    }

    pub fn is_completed(&self) -> bool {
        self.status == TodoStatus::Completed
    }

    /// Replaces the title. An empty title is rejected and leaves the todo untouched.
    pub fn set_title(
        &mut self,
        title: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TodoError> {
        let title = title.into();
        if title.is_empty() {
            return Err(TodoError::title_required());
        }
        self.title = title;
        self.touch(now);
        Ok(())
    }

    pub fn set_body(&mut self, body: impl Into<String>, now: DateTime<Utc>) {
        self.body = body.into();
        self.touch(now);
    }

    /// Moves the todo to `InProgress`. Starting an in-progress todo is allowed.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TodoError> {
        if self.status.is_terminal() {
            return Err(TodoError::InvalidStateTransition {
                from: self.status,
                to: TodoStatus::InProgress,
            });
        }
        self.status = TodoStatus::InProgress;
        self.touch(now);
        Ok(())
    }

    /// Moves the todo to `Completed` and records when that happened.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), TodoError> {
        if self.status.is_terminal() {
            return Err(TodoError::AlreadyCompleted);
        }
        self.status = TodoStatus::Completed;
        self.completed_at = Some(self.touch(now));
        Ok(())
    }

    // A skewed clock must not move updated_at backwards.
    fn touch(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let stamped = now.max(self.updated_at);
        self.updated_at = stamped;
        stamped
    }
}
