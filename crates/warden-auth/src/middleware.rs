//! Authentication middleware for Axum
//!
//! Every protected request is re-authenticated from its bearer token:
//! the header is extracted, the access token validated, and the resolved
//! [`AuthUser`] attached to the request extensions. Role and ownership
//! gates then run against that identity.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use warden_db::UserRole;

use crate::error::AuthError;
use crate::jwt::{Claims, JwtManager, TokenKind};

/// Authenticated user information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    /// Create from JWT claims
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            id: claims.sub.clone(),
            email: claims.email.clone(),
            role: claims.role(),
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuthHeader)
    }
}

/// Extract bearer token from authorization header
fn extract_bearer_token(header: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

fn denied(reason: &'static str, err: AuthError) -> AuthError {
    metrics::counter!("warden_access_denied_total", "reason" => reason).increment(1);
    err
}

/// Resolve the caller's identity from request headers
pub fn authenticate(jwt_manager: &JwtManager, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| denied("missing_token", AuthError::MissingAuthHeader))?
        .to_str()
        .map_err(|_| denied("malformed_header", AuthError::InvalidAuthHeader))?;

    let token = extract_bearer_token(header).map_err(|e| denied("malformed_header", e))?;

    let claims = jwt_manager
        .validate_kind(token, TokenKind::Access)
        .map_err(|e| match e {
            AuthError::TokenExpired => denied("expired_token", e),
            other => denied("invalid_token", other),
        })?;

    Ok(AuthUser::from_claims(&claims))
}

/// Role-gate: the caller's role must equal `required`
pub fn require_role(user: &AuthUser, required: &UserRole) -> Result<(), AuthError> {
    if !user.role.satisfies(required) {
        warn!(
            "User {} ({}) denied: {} role required",
            user.id, user.role, required
        );
        return Err(denied("role", AuthError::InsufficientPermissions));
    }
    Ok(())
}

/// Self-or-role-gate: the caller must be `target_id` or hold `required`
pub fn require_self_or_role(
    user: &AuthUser,
    target_id: &str,
    required: &UserRole,
) -> Result<(), AuthError> {
    if user.role.is_known() && user.id == target_id {
        return Ok(());
    }
    if user.role.satisfies(required) {
        return Ok(());
    }
    warn!(
        "User {} ({}) denied access to user {}",
        user.id, user.role, target_id
    );
    Err(denied("ownership", AuthError::InsufficientPermissions))
}

/// Authentication middleware
///
/// Rejects the request unless it carries a valid access token, then adds
/// the AuthUser to request extensions.
pub async fn auth_middleware(
    State(jwt_manager): State<Arc<JwtManager>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate(&jwt_manager, request.headers())?;

    debug!("Authenticated user: {} ({})", user.id, user.role);

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Middleware to require admin role
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuthHeader)?;

    require_role(user, &UserRole::Admin)?;

    Ok(next.run(request).await)
}
