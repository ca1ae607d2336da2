//! In-memory repositories for tests. One `Mutex` guards the whole state, so
//! the composite operations are atomic exactly like their transactional
//! Postgres counterparts.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::organization_repository::{
    CreateOrganizationOutcome, DecideJoinRequestOutcome, JoinRequestOutcome,
    OrganizationListOptions, OrganizationRepository, OrganizationSortBy, ORGANIZATIONS_SLUG_KEY,
};
use crate::db::task_repository::{TaskListOptions, TaskRepository, TaskSortBy};
use crate::db::user_repository::{UserRepository, USERS_EMAIL_KEY};
use crate::db::{Page, SortOrder};
use crate::models::join_request::{
    JoinRequest, JoinRequestDecision, JoinRequestStatus, PendingJoinRequest,
};
use crate::models::organization::{
    MemberSummary, Membership, Organization, OrganizationSummary, Role,
};
use crate::models::task::{NewTask, Task, TaskStatus};
use crate::models::user::User;

#[derive(Debug, thiserror::Error)]
#[error("duplicate key value violates unique constraint \"{constraint}\"")]
struct MockUniqueViolation {
    constraint: &'static str,
}

impl sqlx::error::DatabaseError for MockUniqueViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint"
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        sqlx::error::ErrorKind::UniqueViolation
    }

    fn constraint(&self) -> Option<&str> {
        Some(self.constraint)
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }
}

pub fn unique_violation(constraint: &'static str) -> sqlx::Error {
    sqlx::Error::Database(Box::new(MockUniqueViolation { constraint }))
}

#[derive(Default)]
struct MockState {
    users: Vec<User>,
    organizations: Vec<Organization>,
    memberships: Vec<Membership>,
    join_requests: Vec<JoinRequest>,
    tasks: Vec<Task>,
}

#[derive(Default)]
pub struct MockDb {
    state: Mutex<MockState>,
}

impl MockDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_user(&self, email: &str, name: &str) -> User {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: "x".to_string(),
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().users.push(user.clone());
        user
    }

    pub fn seed_organization(&self, name: &str, slug: &str, owner: Uuid) -> Organization {
        let now = OffsetDateTime::now_utc();
        let organization = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            created_by: owner,
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.lock().unwrap();
        state.organizations.push(organization.clone());
        state.memberships.push(Membership {
            user_id: owner,
            organization_id: organization.id,
            role: Role::Owner,
            created_at: now,
        });
        organization
    }

    pub fn seed_member(&self, user_id: Uuid, organization_id: Uuid, role: Role) -> Membership {
        let membership = Membership {
            user_id,
            organization_id,
            role,
            created_at: OffsetDateTime::now_utc(),
        };
        self.state.lock().unwrap().memberships.push(membership.clone());
        membership
    }

    pub fn seed_task(
        &self,
        organization_id: Uuid,
        assigned_to: Uuid,
        created_by: Uuid,
        status: TaskStatus,
    ) -> Task {
        let now = OffsetDateTime::now_utc();
        let task = Task {
            id: Uuid::new_v4(),
            organization_id,
            title: "seeded task".to_string(),
            description: None,
            assigned_to,
            created_by,
            status,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().tasks.push(task.clone());
        task
    }

    pub fn task(&self, task_id: Uuid) -> Option<Task> {
        self.state
            .lock()
            .unwrap()
            .tasks
            .iter()
            .find(|task| task.id == task_id)
            .cloned()
    }

    pub fn membership_of(&self, user_id: Uuid) -> Option<Membership> {
        self.state
            .lock()
            .unwrap()
            .memberships
            .iter()
            .find(|membership| membership.user_id == user_id)
            .cloned()
    }

    pub fn join_request(&self, join_request_id: Uuid) -> Option<JoinRequest> {
        self.state
            .lock()
            .unwrap()
            .join_requests
            .iter()
            .find(|request| request.id == join_request_id)
            .cloned()
    }
}

fn page_slice<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .collect()
}

fn ordered<T, K: Ord>(
    mut items: Vec<T>,
    sort_order: SortOrder,
    key: impl Fn(&T) -> K,
    id: impl Fn(&T) -> Uuid,
) -> Vec<T> {
    items.sort_by(|a, b| {
        let primary = match sort_order {
            SortOrder::Asc => key(a).cmp(&key(b)),
            SortOrder::Desc => key(b).cmp(&key(a)),
        };
        primary.then_with(|| id(a).cmp(&id(b)))
    });
    items
}

fn status_rank(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::Todo => 0,
        TaskStatus::InProgress => 1,
        TaskStatus::Done => 2,
    }
}

#[async_trait]
impl UserRepository for MockDb {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|user| user.email == email) {
            return Err(unique_violation(USERS_EMAIL_KEY));
        }

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|user| user.email == email).cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|user| user.id == user_id).cloned())
    }
}

#[async_trait]
impl OrganizationRepository for MockDb {
    async fn find_membership_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Membership>, sqlx::Error> {
        Ok(self.membership_of(user_id))
    }

    async fn find_membership_in_organization(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Membership>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .memberships
            .iter()
            .find(|m| m.user_id == user_id && m.organization_id == organization_id)
            .cloned())
    }

    async fn find_organization_by_id(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<Organization>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .organizations
            .iter()
            .find(|org| org.id == organization_id)
            .cloned())
    }

    async fn create_organization_with_owner(
        &self,
        name: &str,
        slug: &str,
        created_by: Uuid,
    ) -> Result<CreateOrganizationOutcome, sqlx::Error> {
        let mut state = self.state.lock().unwrap();

        if state.memberships.iter().any(|m| m.user_id == created_by) {
            return Ok(CreateOrganizationOutcome::CreatorAlreadyMember);
        }

        if state.organizations.iter().any(|org| org.slug == slug) {
            return Err(unique_violation(ORGANIZATIONS_SLUG_KEY));
        }

        let now = OffsetDateTime::now_utc();
        let organization = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            created_by,
            created_at: now,
            updated_at: now,
        };
        let membership = Membership {
            user_id: created_by,
            organization_id: organization.id,
            role: Role::Owner,
            created_at: now,
        };
        state.organizations.push(organization.clone());
        state.memberships.push(membership.clone());

        Ok(CreateOrganizationOutcome::Created {
            organization,
            membership,
        })
    }

    async fn list_discoverable_organizations(
        &self,
        options: &OrganizationListOptions,
    ) -> Result<Vec<OrganizationSummary>, sqlx::Error> {
        let organizations = self.state.lock().unwrap().organizations.clone();
        let sorted = match options.sort_by {
            OrganizationSortBy::Name => ordered(
                organizations,
                options.sort_order,
                |org| org.name.clone(),
                |org| org.id,
            ),
            OrganizationSortBy::CreatedAt => ordered(
                organizations,
                options.sort_order,
                |org| org.created_at,
                |org| org.id,
            ),
        };

        Ok(page_slice(sorted, options.page)
            .into_iter()
            .map(|org| OrganizationSummary {
                id: org.id,
                name: org.name,
                slug: org.slug,
            })
            .collect())
    }

    async fn list_members(
        &self,
        organization_id: Uuid,
        role: Option<Role>,
        page: Page,
        sort_order: SortOrder,
    ) -> Result<Vec<MemberSummary>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        let members: Vec<MemberSummary> = state
            .memberships
            .iter()
            .filter(|m| m.organization_id == organization_id)
            .filter(|m| role.map_or(true, |wanted| m.role == wanted))
            .filter_map(|m| {
                let user = state.users.iter().find(|user| user.id == m.user_id)?;
                Some(MemberSummary {
                    user_id: m.user_id,
                    organization_id: m.organization_id,
                    role: m.role,
                    created_at: m.created_at,
                    email: user.email.clone(),
                    name: user.name.clone(),
                })
            })
            .collect();
        drop(state);

        let sorted = ordered(members, sort_order, |m| m.created_at, |m| m.user_id);
        Ok(page_slice(sorted, page))
    }

    async fn find_join_request_in_organization(
        &self,
        join_request_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<JoinRequest>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .join_requests
            .iter()
            .find(|r| r.id == join_request_id && r.organization_id == organization_id)
            .cloned())
    }

    async fn create_or_reopen_join_request(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        requested_role: Role,
    ) -> Result<JoinRequestOutcome, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let now = OffsetDateTime::now_utc();

        if let Some(existing) = state
            .join_requests
            .iter_mut()
            .find(|r| r.user_id == user_id && r.organization_id == organization_id)
        {
            if existing.status == JoinRequestStatus::Pending {
                return Ok(JoinRequestOutcome::PendingExists);
            }

            existing.status = JoinRequestStatus::Pending;
            existing.requested_role = requested_role;
            existing.decided_by = None;
            existing.decided_at = None;
            existing.updated_at = now;
            return Ok(JoinRequestOutcome::Reopened(existing.clone()));
        }

        let request = JoinRequest {
            id: Uuid::new_v4(),
            user_id,
            organization_id,
            status: JoinRequestStatus::Pending,
            requested_role,
            decided_by: None,
            decided_at: None,
            created_at: now,
            updated_at: now,
        };
        state.join_requests.push(request.clone());
        Ok(JoinRequestOutcome::Created(request))
    }

    async fn list_pending_join_requests(
        &self,
        organization_id: Uuid,
        page: Page,
        sort_order: SortOrder,
    ) -> Result<Vec<PendingJoinRequest>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        let pending: Vec<PendingJoinRequest> = state
            .join_requests
            .iter()
            .filter(|r| {
                r.organization_id == organization_id && r.status == JoinRequestStatus::Pending
            })
            .filter_map(|r| {
                let user = state.users.iter().find(|user| user.id == r.user_id)?;
                Some(PendingJoinRequest {
                    id: r.id,
                    user_id: r.user_id,
                    organization_id: r.organization_id,
                    requested_role: r.requested_role,
                    created_at: r.created_at,
                    email: user.email.clone(),
                    name: user.name.clone(),
                })
            })
            .collect();
        drop(state);

        let sorted = ordered(pending, sort_order, |r| r.created_at, |r| r.id);
        Ok(page_slice(sorted, page))
    }

    async fn decide_join_request(
        &self,
        join_request_id: Uuid,
        organization_id: Uuid,
        decision: JoinRequestDecision,
        decided_by: Uuid,
    ) -> Result<DecideJoinRequestOutcome, sqlx::Error> {
        let mut state = self.state.lock().unwrap();

        let Some(index) = state
            .join_requests
            .iter()
            .position(|r| r.id == join_request_id && r.organization_id == organization_id)
        else {
            return Ok(DecideJoinRequestOutcome::NoLongerPending);
        };

        if state.join_requests[index].status != JoinRequestStatus::Pending {
            return Ok(DecideJoinRequestOutcome::NoLongerPending);
        }

        let target_user = state.join_requests[index].user_id;
        if matches!(decision, JoinRequestDecision::Approve { .. })
            && state.memberships.iter().any(|m| m.user_id == target_user)
        {
            // The whole operation rolls back; the request stays pending.
            return Ok(DecideJoinRequestOutcome::TargetAlreadyMember);
        }

        let now = OffsetDateTime::now_utc();
        let request = &mut state.join_requests[index];
        request.status = decision.status();
        request.decided_by = Some(decided_by);
        request.decided_at = Some(now);
        request.updated_at = now;
        let request = request.clone();

        let membership = match decision {
            JoinRequestDecision::Approve { role } => {
                let membership = Membership {
                    user_id: target_user,
                    organization_id,
                    role,
                    created_at: now,
                };
                state.memberships.push(membership.clone());
                Some(membership)
            }
            JoinRequestDecision::Reject => None,
        };

        Ok(DecideJoinRequestOutcome::Applied {
            request,
            membership,
        })
    }
}

#[async_trait]
impl TaskRepository for MockDb {
    async fn create_task(&self, new_task: NewTask) -> Result<Task, sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        let task = Task {
            id: Uuid::new_v4(),
            organization_id: new_task.organization_id,
            title: new_task.title,
            description: new_task.description,
            assigned_to: new_task.assigned_to,
            created_by: new_task.created_by,
            status: new_task.status,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().tasks.push(task.clone());
        Ok(task)
    }

    async fn find_task_in_organization(
        &self,
        task_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Task>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tasks
            .iter()
            .find(|t| t.id == task_id && t.organization_id == organization_id)
            .cloned())
    }

    async fn update_task_status(
        &self,
        task_id: Uuid,
        organization_id: Uuid,
        expected: TaskStatus,
        next: TaskStatus,
    ) -> Result<u64, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let Some(task) = state.tasks.iter_mut().find(|t| {
            t.id == task_id && t.organization_id == organization_id && t.status == expected
        }) else {
            return Ok(0);
        };

        task.status = next;
        task.updated_at = OffsetDateTime::now_utc();
        Ok(1)
    }

    async fn reassign_task(
        &self,
        task_id: Uuid,
        organization_id: Uuid,
        assigned_to: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let Some(task) = state.tasks.iter_mut().find(|t| {
            t.id == task_id
                && t.organization_id == organization_id
                && t.status != TaskStatus::Done
        }) else {
            return Ok(0);
        };

        task.assigned_to = assigned_to;
        task.updated_at = OffsetDateTime::now_utc();
        Ok(1)
    }

    async fn list_tasks_for_organization(
        &self,
        organization_id: Uuid,
        options: &TaskListOptions,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let tasks: Vec<Task> = self
            .state
            .lock()
            .unwrap()
            .tasks
            .iter()
            .filter(|t| t.organization_id == organization_id)
            .filter(|t| options.status.map_or(true, |wanted| t.status == wanted))
            .cloned()
            .collect();

        Ok(page_slice(sort_tasks(tasks, options), options.page))
    }

    async fn list_tasks_for_assignee(
        &self,
        organization_id: Uuid,
        assigned_to: Uuid,
        options: &TaskListOptions,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let tasks: Vec<Task> = self
            .state
            .lock()
            .unwrap()
            .tasks
            .iter()
            .filter(|t| t.organization_id == organization_id && t.assigned_to == assigned_to)
            .filter(|t| options.status.map_or(true, |wanted| t.status == wanted))
            .cloned()
            .collect();

        Ok(page_slice(sort_tasks(tasks, options), options.page))
    }
}

fn sort_tasks(tasks: Vec<Task>, options: &TaskListOptions) -> Vec<Task> {
    match options.sort_by {
        TaskSortBy::CreatedAt => ordered(tasks, options.sort_order, |t| t.created_at, |t| t.id),
        TaskSortBy::UpdatedAt => ordered(tasks, options.sort_order, |t| t.updated_at, |t| t.id),
        TaskSortBy::Status => ordered(
            tasks,
            options.sort_order,
            |t| status_rank(t.status),
            |t| t.id,
        ),
    }
}
