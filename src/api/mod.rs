//! HTTP API

pub mod models;
pub mod routes;

pub use routes::{router, AppState};
