use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::errors::DomainError;
use crate::models::task::TaskStatus;
use crate::services::task_service::{CreateTaskInput, TaskListQuery};
use crate::session::AuthSession;
use crate::state::AppState;

pub async fn create_task(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(payload): Json<CreateTaskInput>,
) -> Result<Response, DomainError> {
    let task = state
        .task_service
        .create_task(session.as_ref(), payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "task": task })),
    )
        .into_response())
}

pub async fn list_tasks(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Query(query): Query<TaskListQuery>,
) -> Result<Response, DomainError> {
    let tasks = state.task_service.list_tasks(session.as_ref(), query).await?;
    Ok(Json(json!({ "success": true, "tasks": tasks })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: TaskStatus,
}

pub async fn update_task_status(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<Response, DomainError> {
    let task = state
        .task_service
        .update_task_status(session.as_ref(), task_id, payload.status)
        .await?;

    Ok(Json(json!({ "success": true, "task": task })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ReassignPayload {
    pub assigned_to: Uuid,
}

pub async fn reassign_task(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<ReassignPayload>,
) -> Result<Response, DomainError> {
    let task = state
        .task_service
        .reassign_task(session.as_ref(), task_id, payload.assigned_to)
        .await?;

    Ok(Json(json!({ "success": true, "task": task })).into_response())
}
