use axum::{http::StatusCode, response::IntoResponse, response::Response};
use thiserror::Error;

use crate::responses::JsonResponse;

/// Closed set of failure kinds the domain layer is allowed to surface.
/// Every policy or workflow failure maps into exactly one of these; routes
/// never see `sqlx::Error` directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PreconditionFailed(String),
    #[error("{0}")]
    InvalidTransition(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    Internal(String),
}

impl DomainError {
    pub fn unauthorized() -> Self {
        DomainError::Unauthorized("Authentication is required.".to_string())
    }

    pub fn forbidden() -> Self {
        DomainError::Forbidden("You do not have permission for this action.".to_string())
    }

    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Unauthorized(_) => "UNAUTHORIZED",
            DomainError::Forbidden(_) => "FORBIDDEN",
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::Conflict(_) => "CONFLICT",
            DomainError::PreconditionFailed(_) => "PRECONDITION_FAILED",
            DomainError::InvalidTransition(_) => "INVALID_TRANSITION",
            DomainError::Validation(_) => "VALIDATION",
            DomainError::RateLimited(_) => "RATE_LIMITED",
            DomainError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            DomainError::InvalidTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wraps an unexpected persistence failure. The underlying error is
    /// logged here and never crosses the transport boundary.
    pub fn internal(context: &str, err: sqlx::Error) -> Self {
        tracing::error!(context, error = %err, "persistence failure");
        DomainError::Internal(context.to_string())
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        JsonResponse::error_with_code(self.status(), &self.to_string(), self.code())
            .into_response()
    }
}

/// Returns the name of the unique constraint that fired, if the error is a
/// uniqueness violation. The workflow services use this to disambiguate
/// duplicate-slug conflicts from membership races.
pub fn unique_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => db_err.constraint(),
        _ => None,
    }
}
