//! JWT token management

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use warden_db::{User, UserRole};

use crate::error::AuthError;

/// Which half of a token pair a token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// User role
    pub role: String,
    pub kind: TokenKind,
    /// Unique token ID
    pub jti: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    pub fn role(&self) -> UserRole {
        UserRole::parse_lenient(&self.role)
    }
}

/// An access token and a refresh token issued together
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Longest lifetime either token may be configured with (ten years)
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

/// JWT manager for token generation and validation
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtManager {
    /// Create a new JWT manager
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Configuration("JWT signing secret is empty".to_string()));
        }
        if access_ttl <= Duration::zero() || refresh_ttl <= Duration::zero() {
            return Err(AuthError::Configuration(
                "token lifetimes must be positive".to_string(),
            ));
        }
        if access_ttl > Duration::hours(MAX_TOKEN_TTL_HOURS)
            || refresh_ttl > Duration::hours(MAX_TOKEN_TTL_HOURS)
        {
            return Err(AuthError::Configuration(format!(
                "token lifetimes must not exceed {} hours",
                MAX_TOKEN_TTL_HOURS
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        })
    }

    /// Generate an access/refresh token pair for a user identity
    pub fn issue(
        &self,
        user_id: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        role: &UserRole,
    ) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let expiry = |ttl: Duration| {
            now.checked_add_signed(ttl).ok_or_else(|| {
                AuthError::Configuration("token expiry is out of range".to_string())
            })
        };
        let access_expires_at = expiry(self.access_ttl)?;
        let refresh_expires_at = expiry(self.refresh_ttl)?;

        let claims = |kind: TokenKind, exp: DateTime<Utc>| Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role: role.as_str().to_string(),
            kind,
            jti: Uuid::new_v4().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        debug!("Generating token pair for user: {}", user_id);

        Ok(TokenPair {
            access_token: self.sign(&claims(TokenKind::Access, access_expires_at))?,
            refresh_token: self.sign(&claims(TokenKind::Refresh, refresh_expires_at))?,
        })
    }

    /// Generate a token pair from a stored user record
    pub fn issue_for(&self, user: &User) -> Result<TokenPair, AuthError> {
        self.issue(
            &user.id,
            &user.email,
            &user.first_name,
            &user.last_name,
            &user.role,
        )
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(AuthError::TokenIssuance)
    }

    /// Validate a JWT token and return claims
    ///
    /// Fails with [`AuthError::TokenExpired`] once `exp` has passed and with
    /// [`AuthError::InvalidToken`] for anything malformed or badly signed.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(AuthError::TokenExpired),
                _ => {
                    debug!("Rejected token: {}", e);
                    Err(AuthError::InvalidToken)
                }
            },
        }
    }

    /// Validate a token and require it to be of the given kind
    pub fn validate_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.kind != kind {
            debug!("Rejected {:?} token where {:?} was expected", claims.kind, kind);
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}
