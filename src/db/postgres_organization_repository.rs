use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db::{Page, SortOrder};
use crate::models::join_request::{
    JoinRequest, JoinRequestDecision, JoinRequestStatus, PendingJoinRequest,
};
use crate::models::organization::{
    MemberSummary, Membership, Organization, OrganizationSummary, Role,
};

use super::organization_repository::{
    CreateOrganizationOutcome, DecideJoinRequestOutcome, JoinRequestOutcome,
    OrganizationListOptions, OrganizationRepository, OrganizationSortBy,
};

const JOIN_REQUEST_COLUMNS: &str = "id, user_id, organization_id, status, requested_role, \
     decided_by, decided_at, created_at, updated_at";

pub struct PostgresOrganizationRepository {
    pub pool: PgPool,
}

async fn find_membership(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Option<Membership>, sqlx::Error> {
    sqlx::query_as::<_, Membership>(
        r#"
        SELECT user_id, organization_id, role, created_at
        FROM memberships
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await
}

async fn insert_membership(
    conn: &mut PgConnection,
    user_id: Uuid,
    organization_id: Uuid,
    role: Role,
) -> Result<Membership, sqlx::Error> {
    sqlx::query_as::<_, Membership>(
        r#"
        INSERT INTO memberships (user_id, organization_id, role, created_at)
        VALUES ($1, $2, $3, now())
        RETURNING user_id, organization_id, role, created_at
        "#,
    )
    .bind(user_id)
    .bind(organization_id)
    .bind(role)
    .fetch_one(conn)
    .await
}

#[async_trait]
impl OrganizationRepository for PostgresOrganizationRepository {
    async fn find_membership_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Membership>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        find_membership(&mut conn, user_id).await
    }

    async fn find_membership_in_organization(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Membership>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            SELECT user_id, organization_id, role, created_at
            FROM memberships
            WHERE user_id = $1 AND organization_id = $2
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_organization_by_id(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<Organization>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, slug, created_by, created_at, updated_at
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_organization_with_owner(
        &self,
        name: &str,
        slug: &str,
        created_by: Uuid,
    ) -> Result<CreateOrganizationOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Re-check inside the transaction; the pre-check in the service is
        // only advisory.
        if find_membership(&mut tx, created_by).await?.is_some() {
            return Ok(CreateOrganizationOutcome::CreatorAlreadyMember);
        }

        let organization = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, slug, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, now(), now())
            RETURNING id, name, slug, created_by, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        let membership =
            insert_membership(&mut tx, created_by, organization.id, Role::Owner).await?;

        tx.commit().await?;

        Ok(CreateOrganizationOutcome::Created {
            organization,
            membership,
        })
    }

    async fn list_discoverable_organizations(
        &self,
        options: &OrganizationListOptions,
    ) -> Result<Vec<OrganizationSummary>, sqlx::Error> {
        let sort_column = match options.sort_by {
            OrganizationSortBy::Name => "name",
            OrganizationSortBy::CreatedAt => "created_at",
        };

        let query = format!(
            "SELECT id, name, slug FROM organizations \
             ORDER BY {} {}, id ASC OFFSET $1 LIMIT $2",
            sort_column,
            options.sort_order.as_sql()
        );

        sqlx::query_as::<_, OrganizationSummary>(&query)
            .bind(options.page.offset)
            .bind(options.page.limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn list_members(
        &self,
        organization_id: Uuid,
        role: Option<Role>,
        page: Page,
        sort_order: SortOrder,
    ) -> Result<Vec<MemberSummary>, sqlx::Error> {
        let query = format!(
            "SELECT m.user_id, m.organization_id, m.role, m.created_at, u.email, u.name \
             FROM memberships m \
             JOIN users u ON u.id = m.user_id \
             WHERE m.organization_id = $1 AND ($2::org_role IS NULL OR m.role = $2) \
             ORDER BY m.created_at {}, m.user_id ASC OFFSET $3 LIMIT $4",
            sort_order.as_sql()
        );

        sqlx::query_as::<_, MemberSummary>(&query)
            .bind(organization_id)
            .bind(role)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn find_join_request_in_organization(
        &self,
        join_request_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<JoinRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {JOIN_REQUEST_COLUMNS} FROM join_requests \
             WHERE id = $1 AND organization_id = $2"
        );

        sqlx::query_as::<_, JoinRequest>(&query)
            .bind(join_request_id)
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_or_reopen_join_request(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        requested_role: Role,
    ) -> Result<JoinRequestOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "SELECT {JOIN_REQUEST_COLUMNS} FROM join_requests \
             WHERE user_id = $1 AND organization_id = $2"
        );
        let existing = sqlx::query_as::<_, JoinRequest>(&query)
            .bind(user_id)
            .bind(organization_id)
            .fetch_optional(&mut *tx)
            .await?;

        let outcome = match existing {
            Some(request) if request.status == JoinRequestStatus::Pending => {
                JoinRequestOutcome::PendingExists
            }
            Some(request) => {
                // Resolved earlier; flip the same row back to PENDING so the
                // (user, organization) uniqueness stays a plain constraint.
                let query = format!(
                    "UPDATE join_requests \
                     SET status = $2, requested_role = $3, decided_by = NULL, \
                         decided_at = NULL, updated_at = now() \
                     WHERE id = $1 \
                     RETURNING {JOIN_REQUEST_COLUMNS}"
                );
                let reopened = sqlx::query_as::<_, JoinRequest>(&query)
                    .bind(request.id)
                    .bind(JoinRequestStatus::Pending)
                    .bind(requested_role)
                    .fetch_one(&mut *tx)
                    .await?;
                JoinRequestOutcome::Reopened(reopened)
            }
            None => {
                let query = format!(
                    "INSERT INTO join_requests \
                     (user_id, organization_id, status, requested_role, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, now(), now()) \
                     RETURNING {JOIN_REQUEST_COLUMNS}"
                );
                let created = sqlx::query_as::<_, JoinRequest>(&query)
                    .bind(user_id)
                    .bind(organization_id)
                    .bind(JoinRequestStatus::Pending)
                    .bind(requested_role)
                    .fetch_one(&mut *tx)
                    .await?;
                JoinRequestOutcome::Created(created)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn list_pending_join_requests(
        &self,
        organization_id: Uuid,
        page: Page,
        sort_order: SortOrder,
    ) -> Result<Vec<PendingJoinRequest>, sqlx::Error> {
        let query = format!(
            "SELECT r.id, r.user_id, r.organization_id, r.requested_role, r.created_at, \
                    u.email, u.name \
             FROM join_requests r \
             JOIN users u ON u.id = r.user_id \
             WHERE r.organization_id = $1 AND r.status = $2 \
             ORDER BY r.created_at {}, r.id ASC OFFSET $3 LIMIT $4",
            sort_order.as_sql()
        );

        sqlx::query_as::<_, PendingJoinRequest>(&query)
            .bind(organization_id)
            .bind(JoinRequestStatus::Pending)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn decide_join_request(
        &self,
        join_request_id: Uuid,
        organization_id: Uuid,
        decision: JoinRequestDecision,
        decided_by: Uuid,
    ) -> Result<DecideJoinRequestOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // The conditional update is the race-closing step: exactly one
        // concurrent decision observes one affected row.
        let query = format!(
            "UPDATE join_requests \
             SET status = $3, decided_by = $4, decided_at = now(), updated_at = now() \
             WHERE id = $1 AND organization_id = $2 AND status = $5 \
             RETURNING {JOIN_REQUEST_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, JoinRequest>(&query)
            .bind(join_request_id)
            .bind(organization_id)
            .bind(decision.status())
            .bind(decided_by)
            .bind(JoinRequestStatus::Pending)
            .fetch_optional(&mut *tx)
            .await?;

        let request = match updated {
            Some(request) => request,
            None => return Ok(DecideJoinRequestOutcome::NoLongerPending),
        };

        let membership = match decision {
            JoinRequestDecision::Approve { role } => {
                if find_membership(&mut tx, request.user_id).await?.is_some() {
                    return Ok(DecideJoinRequestOutcome::TargetAlreadyMember);
                }

                Some(insert_membership(&mut tx, request.user_id, organization_id, role).await?)
            }
            JoinRequestDecision::Reject => None,
        };

        tx.commit().await?;

        Ok(DecideJoinRequestOutcome::Applied {
            request,
            membership,
        })
    }
}
