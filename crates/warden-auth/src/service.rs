//! Account service: signup, login and token re-issue

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use warden_db::{DbError, PageRequest, User, UserStore};

use crate::error::AuthError;
use crate::jwt::{JwtManager, TokenKind};
use crate::password::{DUMMY_HASH, hash_password_blocking, verify_password_blocking};
use crate::validation::{
    MAX_PASSWORD_LENGTH, normalize_email, parse_role, validate_email, validate_name,
    validate_password, validate_phone,
};

// ==================== Requests ====================

/// Signup request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Token re-issue request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

// ==================== Service ====================

/// Orchestrates account creation, credential checks and token rotation
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    jwt: Arc<JwtManager>,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, jwt: Arc<JwtManager>) -> Self {
        Self { store, jwt }
    }

    /// Register a new account and issue its first token pair
    pub async fn signup(&self, request: SignupRequest) -> Result<User, AuthError> {
        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();
        let email = normalize_email(&request.email);
        let phone = request.phone.trim().to_string();

        validate_name("first name", &first_name)?;
        validate_name("last name", &last_name)?;
        validate_email(&email)?;
        validate_phone(&phone)?;
        validate_password(&request.password)?;
        let role = parse_role(request.role.as_deref())?;

        debug!("Signup attempt for {}", email);

        if self.store.exists_by_email(&email).await? || self.store.exists_by_phone(&phone).await? {
            debug!("Signup rejected for {}: email or phone already registered", email);
            metrics::counter!("warden_signups_total", "outcome" => "conflict").increment(1);
            return Err(AuthError::Conflict);
        }

        let password_hash = hash_password_blocking(request.password).await?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let tokens = self
            .jwt
            .issue(&id, &email, &first_name, &last_name, &role)?;

        let user = User {
            id,
            first_name,
            last_name,
            email,
            phone,
            role,
            password_hash,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            created_at: now,
            updated_at: now,
        };

        match self.store.insert(&user).await {
            Ok(()) => {}
            Err(DbError::Duplicate(_)) => {
                debug!("Signup for {} lost a uniqueness race", user.email);
                metrics::counter!("warden_signups_total", "outcome" => "conflict").increment(1);
                return Err(AuthError::Conflict);
            }
            Err(e) => {
                error!("Failed to persist new user {}: {}", user.email, e);
                metrics::counter!("warden_signups_total", "outcome" => "error").increment(1);
                return Err(AuthError::AccountNotCreated(e));
            }
        }

        info!("Created user {} ({})", user.id, user.role);
        metrics::counter!("warden_signups_total", "outcome" => "created").increment(1);
        Ok(user)
    }

    /// Check credentials and rotate the user's token pair
    pub async fn login(&self, request: LoginRequest) -> Result<User, AuthError> {
        let email = normalize_email(&request.email);
        if email.is_empty() || request.password.is_empty() {
            return Err(AuthError::Validation(
                "email and password are required".to_string(),
            ));
        }
        if request.password.len() > MAX_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "password exceeds maximum length of {} characters",
                MAX_PASSWORD_LENGTH
            )));
        }

        debug!("Login attempt for {}", email);

        let found = match self.store.find_by_email(&email).await {
            Ok(user) => Some(user),
            Err(DbError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        // Verify even when the user is missing so both failures cost the same
        let hash = found
            .as_ref()
            .map(|u| u.password_hash.clone())
            .unwrap_or_else(|| DUMMY_HASH.to_string());
        let password_valid = verify_password_blocking(request.password, hash).await;

        let mut user = match (found, password_valid) {
            (Some(user), true) => user,
            _ => {
                warn!("Failed login for {}", email);
                metrics::counter!("warden_logins_total", "outcome" => "rejected").increment(1);
                return Err(AuthError::InvalidCredentials);
            }
        };

        self.rotate_tokens(&mut user).await?;

        info!("User {} logged in", user.id);
        metrics::counter!("warden_logins_total", "outcome" => "success").increment(1);
        Ok(user)
    }

    /// Exchange a valid refresh token for a fresh pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<User, AuthError> {
        let claims = self.jwt.validate_kind(refresh_token, TokenKind::Refresh)?;

        let mut user = match self.store.find_by_id(&claims.sub).await {
            Ok(user) => user,
            Err(DbError::NotFound(_)) => {
                warn!("Refresh token names unknown user {}", claims.sub);
                return Err(AuthError::InvalidToken);
            }
            Err(e) => return Err(e.into()),
        };

        self.rotate_tokens(&mut user).await?;

        info!("Re-issued tokens for user {}", user.id);
        Ok(user)
    }

    /// Issue a new pair into `user` and persist it.
    ///
    /// A failed write is logged and otherwise ignored: the caller still
    /// receives the new tokens, which validate on their own signature.
    async fn rotate_tokens(&self, user: &mut User) -> Result<(), AuthError> {
        let tokens = self.jwt.issue_for(user)?;
        let updated_at = Utc::now().max(user.updated_at);

        user.access_token = tokens.access_token;
        user.refresh_token = tokens.refresh_token;
        user.updated_at = updated_at;

        if let Err(e) = self
            .store
            .update_tokens(&user.id, &user.access_token, &user.refresh_token, updated_at)
            .await
        {
            error!("Failed to persist rotated tokens for user {}: {}", user.id, e);
        }
        Ok(())
    }

    /// Fetch a single user
    pub async fn get_user(&self, id: &str) -> Result<User, AuthError> {
        match self.store.find_by_id(id).await {
            Ok(user) => Ok(user),
            Err(DbError::NotFound(_)) => Err(AuthError::UserNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// List one page of users
    pub async fn list_users(&self, page: PageRequest) -> Result<Vec<User>, AuthError> {
        Ok(self.store.list_paged(page).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use warden_db::{Database, StoreTimeouts, UserRole};

    use crate::password::verify_password;

    async fn service() -> (AuthService, Arc<Database>) {
        let db = Arc::new(Database::in_memory(StoreTimeouts::default()).await.unwrap());
        let jwt = Arc::new(
            JwtManager::new("service-test-secret", Duration::hours(24), Duration::hours(168))
                .unwrap(),
        );
        (AuthService::new(db.clone(), jwt), db)
    }

    fn signup_request(email: &str, phone: &str) -> SignupRequest {
        SignupRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            password: "analytical-engine".to_string(),
            role: None,
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_creates_user() {
        let (service, db) = service().await;

        let user = service
            .signup(signup_request("Ada@Example.com", "555-0100"))
            .await
            .unwrap();

        assert!(!user.id.is_empty());
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, UserRole::User);
        assert!(!user.access_token.is_empty());
        assert!(!user.refresh_token.is_empty());
        assert_ne!(user.password_hash, "analytical-engine");
        assert!(verify_password("analytical-engine", &user.password_hash));
        assert_eq!(user.created_at, user.updated_at);

        let stored = db.find_by_id(&user.id).await.unwrap();
        assert_eq!(stored.access_token, user.access_token);

        let claims = service.jwt.validate_token(&user.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role(), UserRole::User);
    }

    #[tokio::test]
    async fn test_signup_conflicts_leave_count_unchanged() {
        let (service, db) = service().await;
        service
            .signup(signup_request("ada@example.com", "555-0100"))
            .await
            .unwrap();

        let same_email = service
            .signup(signup_request("ada@example.com", "555-0199"))
            .await
            .unwrap_err();
        let same_phone = service
            .signup(signup_request("grace@example.com", "555-0100"))
            .await
            .unwrap_err();

        assert!(matches!(same_email, AuthError::Conflict));
        assert!(matches!(same_phone, AuthError::Conflict));
        assert_eq!(same_email.to_string(), same_phone.to_string());
        assert_eq!(db.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let (service, db) = service().await;

        let mut bad_email = signup_request("not-an-email", "555-0100");
        bad_email.role = Some("ADMIN".to_string());
        assert!(matches!(
            service.signup(bad_email).await,
            Err(AuthError::Validation(_))
        ));

        let mut bad_role = signup_request("ada@example.com", "555-0100");
        bad_role.role = Some("SUPERUSER".to_string());
        assert!(matches!(
            service.signup(bad_role).await,
            Err(AuthError::Validation(_))
        ));

        let mut short_password = signup_request("ada@example.com", "555-0100");
        short_password.password = "123".to_string();
        assert!(matches!(
            service.signup(short_password).await,
            Err(AuthError::Validation(_))
        ));

        assert_eq!(db.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_signups_one_wins() {
        let (service, db) = service().await;

        let (a, b) = futures::join!(
            service.signup(signup_request("race@example.com", "555-0001")),
            service.signup(signup_request("race@example.com", "555-0002")),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(AuthError::Conflict))));
        assert_eq!(db.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_login_rotates_tokens() {
        let (service, db) = service().await;
        let created = service
            .signup(signup_request("ada@example.com", "555-0100"))
            .await
            .unwrap();

        let user = service
            .login(login_request(" ADA@example.com", "analytical-engine"))
            .await
            .unwrap();

        assert_eq!(user.id, created.id);
        assert_ne!(user.access_token, created.access_token);
        assert_ne!(user.refresh_token, created.refresh_token);
        assert!(user.updated_at >= created.updated_at);

        let stored = db.find_by_id(&user.id).await.unwrap();
        assert_eq!(stored.access_token, user.access_token);
        assert_eq!(stored.refresh_token, user.refresh_token);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (service, _db) = service().await;
        service
            .signup(signup_request("ada@example.com", "555-0100"))
            .await
            .unwrap();

        let unknown = service
            .login(login_request("nobody@example.com", "analytical-engine"))
            .await
            .unwrap_err();
        let wrong = service
            .login(login_request("ada@example.com", "difference-engine"))
            .await
            .unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.public_message(), wrong.public_message());
        assert_eq!(unknown.status_code(), wrong.status_code());
    }

    #[tokio::test]
    async fn test_refresh_reissues_pair() {
        let (service, _db) = service().await;
        let created = service
            .signup(signup_request("ada@example.com", "555-0100"))
            .await
            .unwrap();

        let refreshed = service.refresh(&created.refresh_token).await.unwrap();
        assert_eq!(refreshed.id, created.id);
        assert_ne!(refreshed.access_token, created.access_token);

        assert!(matches!(
            service.refresh(&created.access_token).await,
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            service.refresh("garbage").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_get_and_list_users() {
        let (service, _db) = service().await;
        let created = service
            .signup(signup_request("ada@example.com", "555-0100"))
            .await
            .unwrap();

        assert_eq!(service.get_user(&created.id).await.unwrap().email, created.email);
        assert!(matches!(
            service.get_user("missing").await,
            Err(AuthError::UserNotFound)
        ));

        let page = service.list_users(PageRequest::default()).await.unwrap();
        assert_eq!(page.len(), 1);
        let empty = service
            .list_users(PageRequest::new(Some(2), None))
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    /// Store whose uniqueness pre-checks always miss, so duplicates reach the insert
    struct BlindPrecheckStore(Database);

    #[async_trait]
    impl UserStore for BlindPrecheckStore {
        async fn exists_by_email(&self, _email: &str) -> Result<bool, DbError> {
            Ok(false)
        }
        async fn exists_by_phone(&self, _phone: &str) -> Result<bool, DbError> {
            Ok(false)
        }
        async fn insert(&self, user: &User) -> Result<(), DbError> {
            self.0.insert(user).await
        }
        async fn find_by_email(&self, email: &str) -> Result<User, DbError> {
            self.0.find_by_email(email).await
        }
        async fn find_by_id(&self, id: &str) -> Result<User, DbError> {
            self.0.find_by_id(id).await
        }
        async fn list_paged(&self, page: PageRequest) -> Result<Vec<User>, DbError> {
            self.0.list_paged(page).await
        }
        async fn update_tokens(
            &self,
            id: &str,
            access_token: &str,
            refresh_token: &str,
            updated_at: DateTime<Utc>,
        ) -> Result<(), DbError> {
            self.0
                .update_tokens(id, access_token, refresh_token, updated_at)
                .await
        }
        async fn count(&self) -> Result<i64, DbError> {
            self.0.count().await
        }
    }

    #[tokio::test]
    async fn test_duplicate_insert_maps_to_conflict() {
        let db = Database::in_memory(StoreTimeouts::default()).await.unwrap();
        let jwt = Arc::new(
            JwtManager::new("service-test-secret", Duration::hours(1), Duration::hours(2)).unwrap(),
        );
        let service = AuthService::new(Arc::new(BlindPrecheckStore(db.clone())), jwt);

        service
            .signup(signup_request("ada@example.com", "555-0100"))
            .await
            .unwrap();

        let same_email = service
            .signup(signup_request("ada@example.com", "555-0199"))
            .await
            .unwrap_err();
        assert!(matches!(same_email, AuthError::Conflict));

        let same_phone = service
            .signup(signup_request("bob@example.com", "555-0100"))
            .await
            .unwrap_err();
        assert!(matches!(same_phone, AuthError::Conflict));

        assert_eq!(db.count().await.unwrap(), 1);
    }

    /// Store whose token writes always fail
    struct StaleTokenStore(Database);

    #[async_trait]
    impl UserStore for StaleTokenStore {
        async fn exists_by_email(&self, email: &str) -> Result<bool, DbError> {
            self.0.exists_by_email(email).await
        }
        async fn exists_by_phone(&self, phone: &str) -> Result<bool, DbError> {
            self.0.exists_by_phone(phone).await
        }
        async fn insert(&self, user: &User) -> Result<(), DbError> {
            self.0.insert(user).await
        }
        async fn find_by_email(&self, email: &str) -> Result<User, DbError> {
            self.0.find_by_email(email).await
        }
        async fn find_by_id(&self, id: &str) -> Result<User, DbError> {
            self.0.find_by_id(id).await
        }
        async fn list_paged(&self, page: PageRequest) -> Result<Vec<User>, DbError> {
            self.0.list_paged(page).await
        }
        async fn update_tokens(
            &self,
            _id: &str,
            _access_token: &str,
            _refresh_token: &str,
            _updated_at: DateTime<Utc>,
        ) -> Result<(), DbError> {
            Err(DbError::Timeout {
                operation: "update_tokens",
                after: std::time::Duration::from_secs(10),
            })
        }
        async fn count(&self) -> Result<i64, DbError> {
            self.0.count().await
        }
    }

    #[tokio::test]
    async fn test_login_survives_token_write_failure() {
        let db = Database::in_memory(StoreTimeouts::default()).await.unwrap();
        let jwt = Arc::new(
            JwtManager::new("service-test-secret", Duration::hours(1), Duration::hours(2)).unwrap(),
        );
        let service = AuthService::new(Arc::new(StaleTokenStore(db.clone())), jwt.clone());

        let created = service
            .signup(signup_request("ada@example.com", "555-0100"))
            .await
            .unwrap();
        let user = service
            .login(login_request("ada@example.com", "analytical-engine"))
            .await
            .unwrap();

        assert_ne!(user.access_token, created.access_token);
        assert!(jwt.validate_token(&user.access_token).is_ok());

        let stored = db.find_by_id(&user.id).await.unwrap();
        assert_eq!(stored.access_token, created.access_token);
    }
}
