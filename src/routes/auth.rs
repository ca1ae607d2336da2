use axum::{
    extract::{Json, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::errors::DomainError;
use crate::policies::require_auth;
use crate::responses::JsonResponse;
use crate::services::auth_service::RegisterInput;
use crate::session::{clear_session_cookie, create_session_token, session_cookie, AuthSession};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

pub async fn handle_signup(
    State(state): State<AppState>,
    Json(payload): Json<RegisterInput>,
) -> Result<Response, DomainError> {
    let user = state.auth_service.register(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "user": user })),
    )
        .into_response())
}

pub async fn handle_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, DomainError> {
    let user = state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;

    let token = create_session_token(user.id, &user.email, &user.name, &state.jwt_keys)
        .map_err(|err| {
            tracing::error!(error = %err, "token generation failed");
            DomainError::Internal("Could not create session".to_string())
        })?;

    let cookie = session_cookie(token, state.config.auth_cookie_secure);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie.to_string())
            .map_err(|_| DomainError::Internal("Could not create session".to_string()))?,
    );

    Ok((
        StatusCode::OK,
        headers,
        Json(json!({ "success": true, "user": crate::models::user::PublicUser::from(user) })),
    )
        .into_response())
}

pub async fn handle_logout(State(state): State<AppState>) -> Result<Response, DomainError> {
    let cookie = clear_session_cookie(state.config.auth_cookie_secure);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie.to_string())
            .map_err(|_| DomainError::Internal("Could not clear session".to_string()))?,
    );

    Ok((headers, JsonResponse::success("Logged out.")).into_response())
}

/// Returns the caller's identity plus the membership context the session
/// extractor resolved.
pub async fn handle_me(AuthSession(session): AuthSession) -> Result<Response, DomainError> {
    let user = require_auth(session.as_ref())?;
    Ok(Json(json!({ "success": true, "user": user })).into_response())
}
