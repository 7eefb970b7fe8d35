//! Warden Authentication and Authorization
//!
//! This crate provides password hashing, JWT token-pair issuance,
//! the account service (signup, login, token re-issue) and the
//! request-time access-control checks for Warden.

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;
pub mod validation;

pub use error::AuthError;
pub use jwt::{Claims, JwtManager, MAX_TOKEN_TTL_HOURS, TokenKind, TokenPair};
pub use middleware::{
    AuthUser, auth_middleware, authenticate, require_admin, require_role, require_self_or_role,
};
pub use password::{hash_password, verify_password};
pub use service::{AuthService, LoginRequest, RefreshRequest, SignupRequest};
