use async_trait::async_trait;
use uuid::Uuid;

use crate::db::{Page, SortOrder};
use crate::models::join_request::{JoinRequest, JoinRequestDecision, PendingJoinRequest};
use crate::models::organization::{
    MemberSummary, Membership, Organization, OrganizationSummary, Role,
};

/// Unique constraint names the organization workflow remaps. `SLUG` fires
/// on duplicate slugs, `MEMBER` on a second membership for the same user,
/// `JOIN_REQUESTS` when two first-time requests for the same pair race past
/// the read in `create_or_reopen_join_request`.
pub const ORGANIZATIONS_SLUG_KEY: &str = "organizations_slug_key";
pub const MEMBERSHIPS_USER_KEY: &str = "memberships_user_id_key";
pub const JOIN_REQUESTS_USER_ORG_KEY: &str = "join_requests_user_id_organization_id_key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationSortBy {
    Name,
    CreatedAt,
}

#[derive(Debug, Clone, Copy)]
pub struct OrganizationListOptions {
    pub page: Page,
    pub sort_by: OrganizationSortBy,
    pub sort_order: SortOrder,
}

/// Result of the transactional organization-creation path. The in-transaction
/// membership re-check closes the race against a concurrent join-request
/// approval for the same creator.
#[derive(Debug)]
pub enum CreateOrganizationOutcome {
    Created {
        organization: Organization,
        membership: Membership,
    },
    CreatorAlreadyMember,
}

/// Result of creating (or reopening) a join request. A previously resolved
/// request for the same pair is flipped back to PENDING in place rather than
/// duplicated.
#[derive(Debug)]
pub enum JoinRequestOutcome {
    Created(JoinRequest),
    Reopened(JoinRequest),
    PendingExists,
}

/// Result of the transactional decision path. `NoLongerPending` means the
/// conditional PENDING-to-decision update affected zero rows, i.e. this
/// caller lost the race against another decision.
#[derive(Debug)]
pub enum DecideJoinRequestOutcome {
    Applied {
        request: JoinRequest,
        membership: Option<Membership>,
    },
    NoLongerPending,
    TargetAlreadyMember,
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn find_membership_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Membership>, sqlx::Error>;

    async fn find_membership_in_organization(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Membership>, sqlx::Error>;

    async fn find_organization_by_id(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<Organization>, sqlx::Error>;

    /// Atomically re-checks that the creator has no membership, inserts the
    /// organization, and inserts the OWNER membership. Duplicate slugs and
    /// concurrent membership inserts surface as uniqueness violations.
    async fn create_organization_with_owner(
        &self,
        name: &str,
        slug: &str,
        created_by: Uuid,
    ) -> Result<CreateOrganizationOutcome, sqlx::Error>;

    async fn list_discoverable_organizations(
        &self,
        options: &OrganizationListOptions,
    ) -> Result<Vec<OrganizationSummary>, sqlx::Error>;

    async fn list_members(
        &self,
        organization_id: Uuid,
        role: Option<Role>,
        page: Page,
        sort_order: SortOrder,
    ) -> Result<Vec<MemberSummary>, sqlx::Error>;

    /// Scoped lookup: returns `None` for requests belonging to any other
    /// organization, indistinguishable from a missing id.
    async fn find_join_request_in_organization(
        &self,
        join_request_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<JoinRequest>, sqlx::Error>;

    async fn create_or_reopen_join_request(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        requested_role: Role,
    ) -> Result<JoinRequestOutcome, sqlx::Error>;

    async fn list_pending_join_requests(
        &self,
        organization_id: Uuid,
        page: Page,
        sort_order: SortOrder,
    ) -> Result<Vec<PendingJoinRequest>, sqlx::Error>;

    /// Applies a decision as one transaction: a conditional update moves the
    /// request out of PENDING (zero rows affected means the race was lost),
    /// and an approval additionally re-checks and inserts the membership.
    async fn decide_join_request(
        &self,
        join_request_id: Uuid,
        organization_id: Uuid,
        decision: JoinRequestDecision,
        decided_by: Uuid,
    ) -> Result<DecideJoinRequestOutcome, sqlx::Error>;
}
