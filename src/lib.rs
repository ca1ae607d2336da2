pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod policies;
pub mod responses;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
