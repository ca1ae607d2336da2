#[cfg(test)]
pub mod mock_db;
pub mod organization_repository;
pub mod postgres_organization_repository;
pub mod postgres_task_repository;
pub mod postgres_user_repository;
pub mod task_repository;
pub mod user_repository;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Offset/limit window shared by every listing query. Services clamp the
/// values before they reach a repository.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}
