use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::db::organization_repository::{
    CreateOrganizationOutcome, DecideJoinRequestOutcome, JoinRequestOutcome,
    OrganizationListOptions, OrganizationRepository, OrganizationSortBy,
    JOIN_REQUESTS_USER_ORG_KEY, MEMBERSHIPS_USER_KEY, ORGANIZATIONS_SLUG_KEY,
};
use crate::db::SortOrder;
use crate::errors::{unique_constraint, DomainError};
use crate::models::join_request::{
    JoinRequest, JoinRequestDecision, JoinRequestStatus, PendingJoinRequest,
};
use crate::models::organization::{
    MemberSummary, Membership, Organization, OrganizationSummary, Role,
};
use crate::policies::{require_auth, require_owner_or_admin, SessionUser};

use super::clamp_page;

const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 120;
const MIN_SLUG_LENGTH: usize = 3;
const MAX_SLUG_LENGTH: usize = 64;

const ALREADY_MEMBER_MESSAGE: &str = "You already belong to an organization.";
const ALREADY_DECIDED_MESSAGE: &str = "This join request has already been decided.";
const TARGET_ALREADY_MEMBER_MESSAGE: &str = "The requester already belongs to an organization.";
const PENDING_EXISTS_MESSAGE: &str = "A join request for this organization is already pending.";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganizationInput {
    pub name: String,
    pub slug: String,
}

/// Slugs are lowercase alphanumeric segments separated by single dashes.
fn valid_slug(slug: &str) -> bool {
    let length = slug.chars().count();
    if !(MIN_SLUG_LENGTH..=MAX_SLUG_LENGTH).contains(&length) {
        return false;
    }

    slug.split('-').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    })
}

impl CreateOrganizationInput {
    fn validate(&self) -> Result<(String, String), DomainError> {
        let name = self.name.trim().to_string();
        let name_length = name.chars().count();
        if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&name_length) {
            return Err(DomainError::Validation(format!(
                "Organization name must be between {MIN_NAME_LENGTH} and {MAX_NAME_LENGTH} characters."
            )));
        }

        let slug = self.slug.trim().to_string();
        if !valid_slug(&slug) {
            return Err(DomainError::Validation(
                "Slug must be lowercase letters, digits and single dashes.".to_string(),
            ));
        }

        Ok((name, slug))
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OrganizationListQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<OrganizationSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MemberListQuery {
    pub role: Option<Role>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct JoinRequestListQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinOrganizationInput {
    pub organization_id: Uuid,
    pub role: Option<Role>,
}

/// The applied outcome of a decision: the resolved request, plus the
/// membership an approval created.
#[derive(Debug)]
pub struct JoinRequestReview {
    pub request: JoinRequest,
    pub membership: Option<Membership>,
}

/// Reviewer intent before the role to assign has been resolved.
#[derive(Debug, Clone, Copy)]
enum Decision {
    Approve { role: Option<Role> },
    Reject,
}

pub struct OrganizationService {
    organizations: Arc<dyn OrganizationRepository>,
}

impl OrganizationService {
    pub fn new(organizations: Arc<dyn OrganizationRepository>) -> Self {
        Self { organizations }
    }

    pub async fn create_organization(
        &self,
        actor: Option<&SessionUser>,
        input: CreateOrganizationInput,
    ) -> Result<(Organization, Membership), DomainError> {
        let actor = require_auth(actor)?;
        if actor.organization_id.is_some() {
            return Err(DomainError::PreconditionFailed(
                ALREADY_MEMBER_MESSAGE.to_string(),
            ));
        }

        let (name, slug) = input.validate()?;

        let outcome = match self
            .organizations
            .create_organization_with_owner(&name, &slug, actor.id)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) if unique_constraint(&err) == Some(ORGANIZATIONS_SLUG_KEY) => {
                return Err(DomainError::Conflict(
                    "An organization with this slug already exists.".to_string(),
                ));
            }
            Err(err) if unique_constraint(&err) == Some(MEMBERSHIPS_USER_KEY) => {
                return Err(DomainError::PreconditionFailed(
                    ALREADY_MEMBER_MESSAGE.to_string(),
                ));
            }
            Err(err) => return Err(DomainError::internal("Could not create organization", err)),
        };

        match outcome {
            CreateOrganizationOutcome::Created {
                organization,
                membership,
            } => {
                tracing::info!(
                    organization_id = %organization.id,
                    created_by = %actor.id,
                    "organization created"
                );
                Ok((organization, membership))
            }
            CreateOrganizationOutcome::CreatorAlreadyMember => Err(
                DomainError::PreconditionFailed(ALREADY_MEMBER_MESSAGE.to_string()),
            ),
        }
    }

    /// Public discovery listing; no session required. Only id, name and
    /// slug leave this method.
    pub async fn list_organizations(
        &self,
        query: OrganizationListQuery,
    ) -> Result<Vec<OrganizationSummary>, DomainError> {
        let options = OrganizationListOptions {
            page: clamp_page(query.offset, query.limit),
            sort_by: query.sort_by.unwrap_or(OrganizationSortBy::Name),
            sort_order: query.sort_order.unwrap_or(SortOrder::Asc),
        };

        self.organizations
            .list_discoverable_organizations(&options)
            .await
            .map_err(|err| DomainError::internal("Could not list organizations", err))
    }

    pub async fn request_to_join(
        &self,
        actor: Option<&SessionUser>,
        input: JoinOrganizationInput,
    ) -> Result<JoinRequest, DomainError> {
        let actor = require_auth(actor)?;
        if actor.organization_id.is_some() {
            return Err(DomainError::PreconditionFailed(
                ALREADY_MEMBER_MESSAGE.to_string(),
            ));
        }

        let requested_role = input.role.unwrap_or(Role::Employee);
        if requested_role == Role::Owner {
            return Err(DomainError::Validation(
                "The OWNER role cannot be requested.".to_string(),
            ));
        }

        self.organizations
            .find_organization_by_id(input.organization_id)
            .await
            .map_err(|err| DomainError::internal("Could not load organization", err))?
            .ok_or_else(|| DomainError::NotFound("Organization not found.".to_string()))?;

        let outcome = match self
            .organizations
            .create_or_reopen_join_request(actor.id, input.organization_id, requested_role)
            .await
        {
            Ok(outcome) => outcome,
            // Two first-time requests racing past the repository's read both
            // try the insert; the loser's violation means a request exists.
            Err(err) if unique_constraint(&err) == Some(JOIN_REQUESTS_USER_ORG_KEY) => {
                return Err(DomainError::Conflict(PENDING_EXISTS_MESSAGE.to_string()));
            }
            Err(err) => return Err(DomainError::internal("Could not create join request", err)),
        };

        match outcome {
            JoinRequestOutcome::Created(request) | JoinRequestOutcome::Reopened(request) => {
                tracing::info!(
                    join_request_id = %request.id,
                    organization_id = %request.organization_id,
                    "join request submitted"
                );
                Ok(request)
            }
            JoinRequestOutcome::PendingExists => {
                Err(DomainError::Conflict(PENDING_EXISTS_MESSAGE.to_string()))
            }
        }
    }

    pub async fn list_pending_join_requests(
        &self,
        actor: Option<&SessionUser>,
        query: JoinRequestListQuery,
    ) -> Result<Vec<PendingJoinRequest>, DomainError> {
        let actor = require_auth(actor)?;
        let member = require_owner_or_admin(actor)?;

        self.organizations
            .list_pending_join_requests(
                member.organization_id,
                clamp_page(query.offset, query.limit),
                query.sort_order.unwrap_or(SortOrder::Asc),
            )
            .await
            .map_err(|err| DomainError::internal("Could not list join requests", err))
    }

    /// Approves a request, assigning `role` to the new member. When the
    /// reviewer leaves the role out, the role captured on the request is
    /// assigned.
    pub async fn approve_join_request(
        &self,
        actor: Option<&SessionUser>,
        join_request_id: Uuid,
        role: Option<Role>,
    ) -> Result<JoinRequestReview, DomainError> {
        self.review_join_request(actor, join_request_id, Decision::Approve { role })
            .await
    }

    pub async fn reject_join_request(
        &self,
        actor: Option<&SessionUser>,
        join_request_id: Uuid,
    ) -> Result<JoinRequestReview, DomainError> {
        self.review_join_request(actor, join_request_id, Decision::Reject)
            .await
    }

    async fn review_join_request(
        &self,
        actor: Option<&SessionUser>,
        join_request_id: Uuid,
        decision: Decision,
    ) -> Result<JoinRequestReview, DomainError> {
        let actor = require_auth(actor)?;
        let member = require_owner_or_admin(actor)?;

        // Requests from other organizations are invisible here.
        let request = self
            .organizations
            .find_join_request_in_organization(join_request_id, member.organization_id)
            .await
            .map_err(|err| DomainError::internal("Could not load join request", err))?
            .ok_or_else(|| DomainError::NotFound("Join request not found.".to_string()))?;

        if request.status != JoinRequestStatus::Pending {
            return Err(DomainError::PreconditionFailed(
                ALREADY_DECIDED_MESSAGE.to_string(),
            ));
        }

        let decision = match decision {
            Decision::Approve { role } => {
                let role = role.unwrap_or(request.requested_role);
                if role == Role::Owner {
                    return Err(DomainError::Validation(
                        "The OWNER role cannot be assigned.".to_string(),
                    ));
                }
                JoinRequestDecision::Approve { role }
            }
            Decision::Reject => JoinRequestDecision::Reject,
        };

        let outcome = match self
            .organizations
            .decide_join_request(join_request_id, member.organization_id, decision, member.id)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) if unique_constraint(&err) == Some(MEMBERSHIPS_USER_KEY) => {
                return Err(DomainError::PreconditionFailed(
                    TARGET_ALREADY_MEMBER_MESSAGE.to_string(),
                ));
            }
            Err(err) => return Err(DomainError::internal("Could not decide join request", err)),
        };

        match outcome {
            DecideJoinRequestOutcome::Applied {
                request,
                membership,
            } => {
                tracing::info!(
                    join_request_id = %request.id,
                    status = ?request.status,
                    decided_by = %member.id,
                    "join request decided"
                );
                Ok(JoinRequestReview {
                    request,
                    membership,
                })
            }
            DecideJoinRequestOutcome::NoLongerPending => Err(DomainError::PreconditionFailed(
                ALREADY_DECIDED_MESSAGE.to_string(),
            )),
            DecideJoinRequestOutcome::TargetAlreadyMember => Err(
                DomainError::PreconditionFailed(TARGET_ALREADY_MEMBER_MESSAGE.to_string()),
            ),
        }
    }

    pub async fn list_members(
        &self,
        actor: Option<&SessionUser>,
        query: MemberListQuery,
    ) -> Result<Vec<MemberSummary>, DomainError> {
        let actor = require_auth(actor)?;
        let member = require_owner_or_admin(actor)?;

        self.organizations
            .list_members(
                member.organization_id,
                query.role,
                clamp_page(query.offset, query.limit),
                query.sort_order.unwrap_or(SortOrder::Asc),
            )
            .await
            .map_err(|err| DomainError::internal("Could not list members", err))
    }
}
