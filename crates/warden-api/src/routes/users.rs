//! User read routes
//!
//! Both routes sit behind [`auth_middleware`]; listing additionally
//! requires the ADMIN role, while single reads allow the owner too.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    middleware,
    routing::get,
};
use tracing::debug;
use warden_auth::{AuthUser, auth_middleware, require_admin, require_self_or_role};
use warden_db::{User, UserRole};

use crate::error::ApiError;
use crate::state::AppState;

use super::types::{DataResponse, ListUsersQuery, UserListResponse};

/// GET /users (Admin only)
async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<UserListResponse>, ApiError> {
    let Query(query) = query?;
    let page = query.page_request();
    debug!("Listing users: page {} ({} per page)", page.page(), page.per_page());

    let data = state.auth.list_users(page).await?;

    Ok(Json(UserListResponse {
        data,
        next_page: page.next_page(),
    }))
}

/// GET /users/{userId} (self or Admin)
async fn get_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DataResponse<User>>, ApiError> {
    require_self_or_role(&user, &user_id, &UserRole::Admin)?;

    let found = state.auth.get_user(&user_id).await?;
    Ok(Json(DataResponse::new(found)))
}

/// Create user routes
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(list_users).route_layer(middleware::from_fn(require_admin)),
        )
        .route("/users/{user_id}", get(get_user))
        .route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            auth_middleware,
        ))
}
