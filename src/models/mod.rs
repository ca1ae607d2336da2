pub mod join_request;
pub mod organization;
pub mod task;
pub mod user;
