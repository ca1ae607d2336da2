use async_trait::async_trait;
use uuid::Uuid;

use crate::db::{Page, SortOrder};
use crate::models::task::{NewTask, Task, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSortBy {
    CreatedAt,
    UpdatedAt,
    Status,
}

#[derive(Debug, Clone, Copy)]
pub struct TaskListOptions {
    pub page: Page,
    pub sort_by: TaskSortBy,
    pub sort_order: SortOrder,
    pub status: Option<TaskStatus>,
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create_task(&self, new_task: NewTask) -> Result<Task, sqlx::Error>;

    /// Scoped lookup: returns `None` for tasks belonging to any other
    /// organization, indistinguishable from a missing id.
    async fn find_task_in_organization(
        &self,
        task_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Task>, sqlx::Error>;

    /// Compare-and-swap on the previously read status. Returns the number of
    /// rows affected; zero means a concurrent writer got there first.
    async fn update_task_status(
        &self,
        task_id: Uuid,
        organization_id: Uuid,
        expected: TaskStatus,
        next: TaskStatus,
    ) -> Result<u64, sqlx::Error>;

    /// Conditional reassignment that excludes DONE tasks at the write, so a
    /// racing completion cannot be clobbered. Zero rows affected means the
    /// task finished (or vanished) in the meantime.
    async fn reassign_task(
        &self,
        task_id: Uuid,
        organization_id: Uuid,
        assigned_to: Uuid,
    ) -> Result<u64, sqlx::Error>;

    async fn list_tasks_for_organization(
        &self,
        organization_id: Uuid,
        options: &TaskListOptions,
    ) -> Result<Vec<Task>, sqlx::Error>;

    async fn list_tasks_for_assignee(
        &self,
        organization_id: Uuid,
        assigned_to: Uuid,
        options: &TaskListOptions,
    ) -> Result<Vec<Task>, sqlx::Error>;
}
