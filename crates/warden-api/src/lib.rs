//! Warden REST API
//!
//! This crate provides the Axum-based HTTP API for Warden: account
//! signup, login and token re-issue, and role-gated user reads.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
