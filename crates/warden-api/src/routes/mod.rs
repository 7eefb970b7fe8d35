//! API routes

mod auth;
mod health;
pub mod metrics;
mod types;
mod users;


use axum::Router;
use std::sync::Arc;

use crate::state::{AppState, MetricsHandle};

pub use types::{DataResponse, ListUsersQuery, UserListResponse};

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let mut router = Router::new()
        // Health check
        .merge(health::routes())
        // Signup, login, refresh
        .merge(auth::routes())
        // Protected user reads
        .merge(users::routes(&state))
        .with_state(state);

    // Add metrics endpoint if handle is provided
    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router
}
