//! Pure authorization guards. Every mutating operation funnels its actor
//! through these before touching a repository; they narrow the loosely
//! typed session identity into a proven organization member.

use serde::Serialize;
use uuid::Uuid;

use crate::errors::DomainError;
use crate::models::organization::Role;

/// The actor identity attached to a request. `organization_id` and `role`
/// are `None` until the user belongs to an organization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub organization_id: Option<Uuid>,
    pub role: Option<Role>,
}

/// A session user proven to hold a membership. Obtained only through the
/// guards below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberUser {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub role: Role,
}

pub fn require_auth(actor: Option<&SessionUser>) -> Result<&SessionUser, DomainError> {
    actor.ok_or_else(DomainError::unauthorized)
}

pub fn require_membership(user: &SessionUser) -> Result<MemberUser, DomainError> {
    match (user.organization_id, user.role) {
        (Some(organization_id), Some(role)) => Ok(MemberUser {
            id: user.id,
            organization_id,
            role,
        }),
        _ => Err(DomainError::Forbidden(
            "Organization membership is required.".to_string(),
        )),
    }
}

pub fn require_role(user: &SessionUser, allowed: &[Role]) -> Result<MemberUser, DomainError> {
    let member = require_membership(user)?;

    if !allowed.contains(&member.role) {
        return Err(DomainError::forbidden());
    }

    Ok(member)
}

pub fn require_owner_or_admin(user: &SessionUser) -> Result<MemberUser, DomainError> {
    require_role(user, &[Role::Owner, Role::Admin])
}

/// Proves that a record fetched by id belongs to the actor's tenant.
pub fn ensure_same_organization(
    actor_organization_id: Uuid,
    target_organization_id: Uuid,
) -> Result<(), DomainError> {
    if actor_organization_id != target_organization_id {
        return Err(DomainError::forbidden());
    }

    Ok(())
}
