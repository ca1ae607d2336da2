use async_trait::async_trait;
use uuid::Uuid;

use crate::models::user::User;

/// Unique constraint name surfaced by the users table. The auth service
/// matches on this when remapping uniqueness violations.
pub const USERS_EMAIL_KEY: &str = "users_email_key";

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Raises a uniqueness violation on `users_email_key` when the email is
    /// already registered.
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error>;
}
