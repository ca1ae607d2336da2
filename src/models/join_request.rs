use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::organization::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "join_request_status")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinRequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// The resolution an owner/admin applies to a pending request. Approval
/// carries the role the new member receives, so an approve without a role
/// is unrepresentable past the service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRequestDecision {
    Approve { role: Role },
    Reject,
}

impl JoinRequestDecision {
    pub fn status(self) -> JoinRequestStatus {
        match self {
            JoinRequestDecision::Approve { .. } => JoinRequestStatus::Approved,
            JoinRequestDecision::Reject => JoinRequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JoinRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub status: JoinRequestStatus,
    pub requested_role: Role,
    pub decided_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub decided_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A pending request joined with the requester's public profile, as shown
/// to the reviewing owner/admin.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingJoinRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub requested_role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub email: String,
    pub name: String,
}
