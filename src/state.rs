use std::sync::Arc;

use crate::config::Config;
use crate::db::organization_repository::OrganizationRepository;
use crate::db::task_repository::TaskRepository;
use crate::db::user_repository::UserRepository;
use crate::services::auth_service::AuthService;
use crate::services::organization_service::OrganizationService;
use crate::services::task_service::TaskService;
use crate::session::JwtKeys;

#[derive(Clone)]
pub struct AppState {
    /// Shared with the session extractor, which resolves the membership
    /// context on every request.
    pub organizations: Arc<dyn OrganizationRepository>,
    pub auth_service: Arc<AuthService>,
    pub organization_service: Arc<OrganizationService>,
    pub task_service: Arc<TaskService>,
    pub jwt_keys: Arc<JwtKeys>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        organizations: Arc<dyn OrganizationRepository>,
        tasks: Arc<dyn TaskRepository>,
        jwt_keys: Arc<JwtKeys>,
        config: Arc<Config>,
    ) -> Self {
        AppState {
            organizations: organizations.clone(),
            auth_service: Arc::new(AuthService::new(users)),
            organization_service: Arc::new(OrganizationService::new(organizations.clone())),
            task_service: Arc::new(TaskService::new(tasks, organizations)),
            jwt_keys,
            config,
        }
    }
}

#[cfg(test)]
pub fn test_state(db: Arc<crate::db::mock_db::MockDb>) -> AppState {
    let config = Arc::new(Config {
        database_url: String::new(),
        frontend_origin: "http://localhost".into(),
        jwt_secret: "0123456789abcdef0123456789abcdef".into(),
        auth_cookie_secure: false,
    });
    let jwt_keys = Arc::new(
        JwtKeys::from_secret(&config.jwt_secret).expect("test JWT secret should be valid"),
    );

    AppState::new(db.clone(), db.clone(), db, jwt_keys, config)
}
