use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHasher};
use serde::Deserialize;

use crate::db::user_repository::{UserRepository, USERS_EMAIL_KEY};
use crate::errors::{unique_constraint, DomainError};
use crate::models::user::{PublicUser, User};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_NAME_LENGTH: usize = 120;
const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password.";

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    Ok(argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl RegisterInput {
    /// Normalizes and validates the payload; returns the canonical email
    /// and display name.
    fn validate(&self) -> Result<(String, String), DomainError> {
        let email = self.email.trim().to_lowercase();
        let (local, domain) = email
            .split_once('@')
            .ok_or_else(|| DomainError::Validation("A valid email is required.".to_string()))?;
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(DomainError::Validation(
                "A valid email is required.".to_string(),
            ));
        }

        let name = self.name.trim().to_string();
        if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
            return Err(DomainError::Validation(format!(
                "Name must be between 1 and {MAX_NAME_LENGTH} characters."
            )));
        }

        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(DomainError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters."
            )));
        }

        Ok((email, name))
    }
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn register(&self, input: RegisterInput) -> Result<PublicUser, DomainError> {
        let (email, name) = input.validate()?;

        let password_hash = hash_password(&input.password).map_err(|err| {
            tracing::error!(error = %err, "password hashing failed");
            DomainError::Internal("Could not create account".to_string())
        })?;

        let user = match self.users.create_user(&email, &name, &password_hash).await {
            Ok(user) => user,
            Err(err) if unique_constraint(&err) == Some(USERS_EMAIL_KEY) => {
                return Err(DomainError::Conflict(
                    "An account with this email already exists.".to_string(),
                ));
            }
            Err(err) => return Err(DomainError::internal("Could not create account", err)),
        };

        tracing::info!(user_id = %user.id, "user registered");
        Ok(PublicUser::from(user))
    }

    /// Verifies credentials without revealing which half was wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, DomainError> {
        let email = email.trim().to_lowercase();
        let user = self
            .users
            .find_user_by_email(&email)
            .await
            .map_err(|err| DomainError::internal("Could not load account", err))?
            .ok_or_else(|| DomainError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string()))?;

        let verified = verify_password(password, &user.password_hash).map_err(|err| {
            tracing::error!(error = %err, "password verification failed");
            DomainError::Internal("Could not verify credentials".to_string())
        })?;

        if !verified {
            return Err(DomainError::Unauthorized(
                INVALID_CREDENTIALS_MESSAGE.to_string(),
            ));
        }

        Ok(user)
    }
}
