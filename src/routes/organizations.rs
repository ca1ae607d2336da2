use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::errors::DomainError;
use crate::models::organization::Role;
use crate::services::organization_service::{
    CreateOrganizationInput, JoinOrganizationInput, JoinRequestListQuery, MemberListQuery,
    OrganizationListQuery,
};
use crate::session::AuthSession;
use crate::state::AppState;

pub async fn create_organization(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(payload): Json<CreateOrganizationInput>,
) -> Result<Response, DomainError> {
    let (organization, membership) = state
        .organization_service
        .create_organization(session.as_ref(), payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "organization": organization,
            "membership": membership
        })),
    )
        .into_response())
}

/// Discovery is open to anonymous callers; the summaries carry no
/// tenant-internal data.
pub async fn list_organizations(
    State(state): State<AppState>,
    Query(query): Query<OrganizationListQuery>,
) -> Result<Response, DomainError> {
    let organizations = state.organization_service.list_organizations(query).await?;

    Ok(Json(json!({ "success": true, "organizations": organizations })).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinRequestPayload {
    pub role: Option<Role>,
}

pub async fn request_to_join(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(organization_id): Path<Uuid>,
    payload: Option<Json<JoinRequestPayload>>,
) -> Result<Response, DomainError> {
    let role = payload.map(|Json(body)| body.role).unwrap_or_default();
    let request = state
        .organization_service
        .request_to_join(
            session.as_ref(),
            JoinOrganizationInput {
                organization_id,
                role,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "join_request": request })),
    )
        .into_response())
}

pub async fn list_join_requests(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Query(query): Query<JoinRequestListQuery>,
) -> Result<Response, DomainError> {
    let requests = state
        .organization_service
        .list_pending_join_requests(session.as_ref(), query)
        .await?;

    Ok(Json(json!({ "success": true, "join_requests": requests })).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveJoinRequestPayload {
    pub role: Option<Role>,
}

pub async fn approve_join_request(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(join_request_id): Path<Uuid>,
    payload: Option<Json<ApproveJoinRequestPayload>>,
) -> Result<Response, DomainError> {
    let role = payload.map(|Json(body)| body.role).unwrap_or_default();
    let review = state
        .organization_service
        .approve_join_request(session.as_ref(), join_request_id, role)
        .await?;

    Ok(Json(json!({
        "success": true,
        "join_request": review.request,
        "membership": review.membership
    }))
    .into_response())
}

pub async fn reject_join_request(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(join_request_id): Path<Uuid>,
) -> Result<Response, DomainError> {
    let review = state
        .organization_service
        .reject_join_request(session.as_ref(), join_request_id)
        .await?;

    Ok(Json(json!({ "success": true, "join_request": review.request })).into_response())
}

pub async fn list_members(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Query(query): Query<MemberListQuery>,
) -> Result<Response, DomainError> {
    let members = state
        .organization_service
        .list_members(session.as_ref(), query)
        .await?;

    Ok(Json(json!({ "success": true, "members": members })).into_response())
}
