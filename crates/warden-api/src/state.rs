//! Application state

use std::sync::Arc;

use warden_auth::{AuthService, JwtManager};
use warden_db::UserStore;

/// Prometheus exporter handle used by the `/metrics` route
pub type MetricsHandle = metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(store: Arc<dyn UserStore>, jwt: Arc<JwtManager>) -> Self {
        Self {
            auth: AuthService::new(store, jwt.clone()),
            jwt,
        }
    }
}
