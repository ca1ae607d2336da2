pub mod auth_service;
pub mod organization_service;
pub mod task_service;
pub mod task_status_rules;

use crate::db::Page;

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Clamps caller-supplied paging into the window repositories accept.
/// Out-of-range values are coerced rather than rejected.
pub fn clamp_page(offset: Option<i64>, limit: Option<i64>) -> Page {
    Page {
        offset: offset.unwrap_or(0).max(0),
        limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
    }
}
