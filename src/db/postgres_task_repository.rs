use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::task::{NewTask, Task, TaskStatus};

use super::task_repository::{TaskListOptions, TaskRepository, TaskSortBy};

const TASK_COLUMNS: &str =
    "id, organization_id, title, description, assigned_to, created_by, status, \
     created_at, updated_at";

pub struct PostgresTaskRepository {
    pub pool: PgPool,
}

fn sort_column(sort_by: TaskSortBy) -> &'static str {
    match sort_by {
        TaskSortBy::CreatedAt => "created_at",
        TaskSortBy::UpdatedAt => "updated_at",
        TaskSortBy::Status => "status",
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn create_task(&self, new_task: NewTask) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks \
             (organization_id, title, description, assigned_to, created_by, status, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, now(), now()) \
             RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(new_task.organization_id)
            .bind(&new_task.title)
            .bind(&new_task.description)
            .bind(new_task.assigned_to)
            .bind(new_task.created_by)
            .bind(new_task.status)
            .fetch_one(&self.pool)
            .await
    }

    async fn find_task_in_organization(
        &self,
        task_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND organization_id = $2"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(task_id)
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_task_status(
        &self,
        task_id: Uuid,
        organization_id: Uuid,
        expected: TaskStatus,
        next: TaskStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = $4, updated_at = now()
            WHERE id = $1 AND organization_id = $2 AND status = $3
            "#,
        )
        .bind(task_id)
        .bind(organization_id)
        .bind(expected)
        .bind(next)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn reassign_task(
        &self,
        task_id: Uuid,
        organization_id: Uuid,
        assigned_to: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET assigned_to = $3, updated_at = now()
            WHERE id = $1 AND organization_id = $2 AND status <> $4
            "#,
        )
        .bind(task_id)
        .bind(organization_id)
        .bind(assigned_to)
        .bind(TaskStatus::Done)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn list_tasks_for_organization(
        &self,
        organization_id: Uuid,
        options: &TaskListOptions,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE organization_id = $1 AND ($2::task_status IS NULL OR status = $2) \
             ORDER BY {} {}, id ASC OFFSET $3 LIMIT $4",
            sort_column(options.sort_by),
            options.sort_order.as_sql()
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(organization_id)
            .bind(options.status)
            .bind(options.page.offset)
            .bind(options.page.limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn list_tasks_for_assignee(
        &self,
        organization_id: Uuid,
        assigned_to: Uuid,
        options: &TaskListOptions,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE organization_id = $1 AND assigned_to = $2 \
               AND ($3::task_status IS NULL OR status = $3) \
             ORDER BY {} {}, id ASC OFFSET $4 LIMIT $5",
            sort_column(options.sort_by),
            options.sort_order.as_sql()
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(organization_id)
            .bind(assigned_to)
            .bind(options.status)
            .bind(options.page.offset)
            .bind(options.page.limit)
            .fetch_all(&self.pool)
            .await
    }
}
