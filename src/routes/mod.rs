pub mod auth;
pub mod organizations;
pub mod tasks;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

/// Credential routes. `main` wraps these in a stricter rate limiter than
/// the rest of the API.
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::handle_signup))
        .route("/login", post(auth::handle_login))
        .route("/logout", post(auth::handle_logout))
        .route("/me", get(auth::handle_me))
}

pub fn core_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/organizations",
            post(organizations::create_organization).get(organizations::list_organizations),
        )
        .route(
            "/api/organizations/{organization_id}/join-requests",
            post(organizations::request_to_join),
        )
        .route("/api/join-requests", get(organizations::list_join_requests))
        .route(
            "/api/join-requests/{join_request_id}/approve",
            post(organizations::approve_join_request),
        )
        .route(
            "/api/join-requests/{join_request_id}/reject",
            post(organizations::reject_join_request),
        )
        .route("/api/members", get(organizations::list_members))
        .route("/api/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route("/api/tasks/{task_id}/status", put(tasks::update_task_status))
        .route("/api/tasks/{task_id}/assignee", put(tasks::reassign_task))
}

/// The full API route table, without the middleware `main` layers on top.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_router())
        .merge(core_router())
}
