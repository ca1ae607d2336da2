use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::db::organization_repository::OrganizationRepository;
use crate::db::task_repository::{TaskListOptions, TaskRepository, TaskSortBy};
use crate::db::SortOrder;
use crate::errors::DomainError;
use crate::models::organization::Role;
use crate::models::task::{NewTask, Task, TaskStatus};
use crate::policies::{require_auth, require_membership, require_owner_or_admin, SessionUser};

use super::clamp_page;
use super::task_status_rules::{can_transition, can_update_task};

const MAX_TITLE_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 5_000;

const TASK_NOT_FOUND_MESSAGE: &str = "Task not found.";
const TASK_CHANGED_MESSAGE: &str = "The task changed concurrently. Reload and try again.";
const TASK_COMPLETED_MESSAGE: &str = "A completed task cannot be reassigned.";
const ASSIGNEE_NOT_MEMBER_MESSAGE: &str = "The assignee is not in your organization.";
const ASSIGNEE_NOT_EMPLOYEE_MESSAGE: &str = "Tasks can only be assigned to employees.";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskInput {
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Uuid,
    pub status: Option<TaskStatus>,
}

impl CreateTaskInput {
    fn validate(&self) -> Result<(String, Option<String>, TaskStatus), DomainError> {
        let title = self.title.trim().to_string();
        let title_length = title.chars().count();
        if title_length == 0 || title_length > MAX_TITLE_LENGTH {
            return Err(DomainError::Validation(format!(
                "Title must be between 1 and {MAX_TITLE_LENGTH} characters."
            )));
        }

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        if let Some(description) = &description {
            if description.chars().count() > MAX_DESCRIPTION_LENGTH {
                return Err(DomainError::Validation(format!(
                    "Description must be at most {MAX_DESCRIPTION_LENGTH} characters."
                )));
            }
        }

        let status = self.status.unwrap_or(TaskStatus::Todo);
        if status == TaskStatus::Done {
            return Err(DomainError::Validation(
                "A task cannot be created as DONE.".to_string(),
            ));
        }

        Ok((title, description, status))
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<TaskSortBy>,
    pub sort_order: Option<SortOrder>,
}

pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    organizations: Arc<dyn OrganizationRepository>,
}

impl TaskService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        organizations: Arc<dyn OrganizationRepository>,
    ) -> Self {
        Self {
            tasks,
            organizations,
        }
    }

    /// Tasks are only ever assigned to EMPLOYEE members of the actor's own
    /// organization. A non-member is indistinguishable from a missing user.
    async fn ensure_assignee_is_employee(
        &self,
        assigned_to: Uuid,
        organization_id: Uuid,
    ) -> Result<(), DomainError> {
        let membership = self
            .organizations
            .find_membership_in_organization(assigned_to, organization_id)
            .await
            .map_err(|err| DomainError::internal("Could not verify assignee", err))?
            .ok_or_else(|| DomainError::NotFound(ASSIGNEE_NOT_MEMBER_MESSAGE.to_string()))?;

        if membership.role != Role::Employee {
            return Err(DomainError::PreconditionFailed(
                ASSIGNEE_NOT_EMPLOYEE_MESSAGE.to_string(),
            ));
        }

        Ok(())
    }

    pub async fn create_task(
        &self,
        actor: Option<&SessionUser>,
        input: CreateTaskInput,
    ) -> Result<Task, DomainError> {
        let actor = require_auth(actor)?;
        let member = require_owner_or_admin(actor)?;

        let (title, description, status) = input.validate()?;
        self.ensure_assignee_is_employee(input.assigned_to, member.organization_id)
            .await?;

        let task = self
            .tasks
            .create_task(NewTask {
                organization_id: member.organization_id,
                title,
                description,
                assigned_to: input.assigned_to,
                created_by: member.id,
                status,
            })
            .await
            .map_err(|err| DomainError::internal("Could not create task", err))?;

        tracing::info!(task_id = %task.id, organization_id = %task.organization_id, "task created");
        Ok(task)
    }

    /// Owners and admins see every task in the organization; employees only
    /// the tasks assigned to them.
    pub async fn list_tasks(
        &self,
        actor: Option<&SessionUser>,
        query: TaskListQuery,
    ) -> Result<Vec<Task>, DomainError> {
        let actor = require_auth(actor)?;
        let member = require_membership(actor)?;

        let options = TaskListOptions {
            page: clamp_page(query.offset, query.limit),
            sort_by: query.sort_by.unwrap_or(TaskSortBy::CreatedAt),
            sort_order: query.sort_order.unwrap_or(SortOrder::Desc),
            status: query.status,
        };

        let tasks = match member.role {
            Role::Owner | Role::Admin => {
                self.tasks
                    .list_tasks_for_organization(member.organization_id, &options)
                    .await
            }
            Role::Employee => {
                self.tasks
                    .list_tasks_for_assignee(member.organization_id, member.id, &options)
                    .await
            }
        };

        tasks.map_err(|err| DomainError::internal("Could not list tasks", err))
    }

    pub async fn update_task_status(
        &self,
        actor: Option<&SessionUser>,
        task_id: Uuid,
        next: TaskStatus,
    ) -> Result<Task, DomainError> {
        let actor = require_auth(actor)?;
        let member = require_membership(actor)?;

        let task = self
            .tasks
            .find_task_in_organization(task_id, member.organization_id)
            .await
            .map_err(|err| DomainError::internal("Could not load task", err))?
            .ok_or_else(|| DomainError::NotFound(TASK_NOT_FOUND_MESSAGE.to_string()))?;

        can_update_task(member.role, member.id, &task)?;
        can_transition(task.status, next)?;

        // Conditional on the status just read; zero rows means a concurrent
        // writer moved the task first.
        let rows = self
            .tasks
            .update_task_status(task_id, member.organization_id, task.status, next)
            .await
            .map_err(|err| DomainError::internal("Could not update task", err))?;
        if rows == 0 {
            return Err(DomainError::PreconditionFailed(
                TASK_CHANGED_MESSAGE.to_string(),
            ));
        }

        tracing::info!(
            task_id = %task_id,
            from = task.status.as_str(),
            to = next.as_str(),
            "task status updated"
        );

        self.tasks
            .find_task_in_organization(task_id, member.organization_id)
            .await
            .map_err(|err| DomainError::internal("Could not load task", err))?
            .ok_or_else(|| DomainError::NotFound(TASK_NOT_FOUND_MESSAGE.to_string()))
    }

    pub async fn reassign_task(
        &self,
        actor: Option<&SessionUser>,
        task_id: Uuid,
        assigned_to: Uuid,
    ) -> Result<Task, DomainError> {
        let actor = require_auth(actor)?;
        let member = require_owner_or_admin(actor)?;

        let task = self
            .tasks
            .find_task_in_organization(task_id, member.organization_id)
            .await
            .map_err(|err| DomainError::internal("Could not load task", err))?
            .ok_or_else(|| DomainError::NotFound(TASK_NOT_FOUND_MESSAGE.to_string()))?;

        if task.status == TaskStatus::Done {
            return Err(DomainError::PreconditionFailed(
                TASK_COMPLETED_MESSAGE.to_string(),
            ));
        }

        self.ensure_assignee_is_employee(assigned_to, member.organization_id)
            .await?;

        // The write itself excludes DONE, so a completion racing this
        // reassignment wins.
        let rows = self
            .tasks
            .reassign_task(task_id, member.organization_id, assigned_to)
            .await
            .map_err(|err| DomainError::internal("Could not reassign task", err))?;
        if rows == 0 {
            return Err(DomainError::PreconditionFailed(
                TASK_COMPLETED_MESSAGE.to_string(),
            ));
        }

        tracing::info!(task_id = %task_id, assigned_to = %assigned_to, "task reassigned");

        self.tasks
            .find_task_in_organization(task_id, member.organization_id)
            .await
            .map_err(|err| DomainError::internal("Could not load task", err))?
            .ok_or_else(|| DomainError::NotFound(TASK_NOT_FOUND_MESSAGE.to_string()))
    }
}
