//! Signup, login and token refresh routes

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use tracing::debug;
use warden_auth::{LoginRequest, RefreshRequest, SignupRequest};
use warden_db::User;

use crate::error::ApiError;
use crate::state::AppState;

use super::types::DataResponse;

/// POST /auth/signup
async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<User>>), ApiError> {
    let Json(request) = body?;
    let user = state.auth.signup(request).await?;

    Ok((StatusCode::CREATED, Json(DataResponse::new(user))))
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<DataResponse<User>>, ApiError> {
    let Json(request) = body?;
    let user = state.auth.login(request).await?;

    Ok(Json(DataResponse::new(user)))
}

/// POST /auth/refresh
async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<DataResponse<User>>, ApiError> {
    let Json(request) = body?;
    debug!("Token refresh requested");
    let user = state.auth.refresh(&request.refresh_token).await?;

    Ok(Json(DataResponse::new(user)))
}

/// Create auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}
