//! The task workflow state machine. Transitions are strictly linear:
//! TODO moves to IN_PROGRESS, IN_PROGRESS moves to DONE, and DONE is
//! terminal. Everything else, including restating the current status,
//! is rejected.

use crate::errors::DomainError;
use crate::models::organization::Role;
use crate::models::task::{Task, TaskStatus};
use uuid::Uuid;

/// The single status a task may move to next, if any.
pub fn next_status(from: TaskStatus) -> Option<TaskStatus> {
    match from {
        TaskStatus::Todo => Some(TaskStatus::InProgress),
        TaskStatus::InProgress => Some(TaskStatus::Done),
        TaskStatus::Done => None,
    }
}

pub fn can_transition(from: TaskStatus, to: TaskStatus) -> Result<(), DomainError> {
    if from == to {
        return Err(DomainError::InvalidTransition(format!(
            "The task is already {}.",
            from.as_str()
        )));
    }

    if next_status(from) != Some(to) {
        return Err(DomainError::InvalidTransition(format!(
            "A task cannot move from {} to {}.",
            from.as_str(),
            to.as_str()
        )));
    }

    Ok(())
}

/// Owners and admins may update any task in their organization; employees
/// only the tasks assigned to them.
pub fn can_update_task(role: Role, actor_id: Uuid, task: &Task) -> Result<(), DomainError> {
    match role {
        Role::Owner | Role::Admin => Ok(()),
        Role::Employee if task.assigned_to == actor_id => Ok(()),
        Role::Employee => Err(DomainError::Forbidden(
            "You can only update tasks assigned to you.".to_string(),
        )),
    }
}
