//! Cookie-based JWT sessions. The token carries identity only; the
//! membership context is loaded fresh on every request so a role change or
//! a new membership takes effect immediately.

use std::collections::HashSet;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::errors::DomainError;
use crate::policies::SessionUser;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "td_session";
pub const SESSION_TTL_HOURS: i64 = 24 * 7;

/// Minimum acceptable size for the JWT secret in bytes.
pub const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_UNIQUE_JWT_BYTES: usize = 8;

#[derive(Debug, Error)]
pub enum JwtSecretError {
    #[error("JWT_SECRET must be set")]
    Missing,
    #[error("JWT_SECRET must be at least {required} bytes, but {actual} bytes were provided")]
    TooShort { actual: usize, required: usize },
    #[error("JWT_SECRET must contain at least {required} unique bytes; only {actual} found")]
    LowEntropy { actual: usize, required: usize },
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys").finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn from_secret(secret: impl AsRef<[u8]>) -> Result<Self, JwtSecretError> {
        let bytes = secret.as_ref();
        validate_secret(bytes)?;

        Ok(Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        })
    }
}

fn validate_secret(secret: &[u8]) -> Result<(), JwtSecretError> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        return Err(JwtSecretError::TooShort {
            actual: secret.len(),
            required: MIN_JWT_SECRET_LENGTH,
        });
    }

    let unique = secret.iter().copied().collect::<HashSet<_>>().len();
    if unique < MIN_UNIQUE_JWT_BYTES {
        return Err(JwtSecretError::LowEntropy {
            actual: unique,
            required: MIN_UNIQUE_JWT_BYTES,
        });
    }

    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub exp: usize,
}

pub fn create_session_token(
    user_id: Uuid,
    email: &str,
    name: &str,
    keys: &JwtKeys,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expires_at = OffsetDateTime::now_utc() + Duration::hours(SESSION_TTL_HOURS);
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        name: name.to_string(),
        exp: expires_at.unix_timestamp() as usize,
    };
    encode(&Header::default(), &claims, &keys.encoding)
}

pub fn decode_session_token(
    token: &str,
    keys: &JwtKeys,
) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &keys.decoding, &validation)
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::hours(SESSION_TTL_HOURS))
        .build()
}

pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Extracts the optional session identity. A missing or invalid cookie
/// yields `None` rather than rejecting; the policy guards decide whether
/// anonymous access is acceptable for the route.
#[derive(Debug)]
pub struct AuthSession(pub Option<SessionUser>);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = DomainError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(AuthSession(None));
        };

        let Ok(token) = decode_session_token(cookie.value(), &state.jwt_keys) else {
            return Ok(AuthSession(None));
        };
        let claims = token.claims;

        let membership = state
            .organizations
            .find_membership_by_user(claims.sub)
            .await
            .map_err(|err| DomainError::internal("Could not load session context", err))?;

        Ok(AuthSession(Some(SessionUser {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
            organization_id: membership.as_ref().map(|m| m.organization_id),
            role: membership.map(|m| m.role),
        })))
    }
}
