//! User store trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DbError;
use crate::models::User;

/// Default number of records per page
pub const DEFAULT_PAGE_SIZE: i64 = 20;
/// Default (first) page number
pub const DEFAULT_PAGE: i64 = 1;

/// A one-indexed page request.
///
/// Values below 1 are clamped to the defaults when constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    per_page: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE),
            per_page: per_page.filter(|n| *n >= 1).unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    /// Number of records to skip
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn next_page(&self) -> i64 {
        self.page.saturating_add(1)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// User store trait
///
/// Implementations persist [`User`] records and must enforce uniqueness of
/// `id`, `email` and `phone` themselves, reporting a violation as
/// [`DbError::Duplicate`]. Every call is expected to be time-bounded.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Check if a user with this email exists
    async fn exists_by_email(&self, email: &str) -> Result<bool, DbError>;

    /// Check if a user with this phone number exists
    async fn exists_by_phone(&self, phone: &str) -> Result<bool, DbError>;

    /// Insert a new user
    async fn insert(&self, user: &User) -> Result<(), DbError>;

    /// Get a user by email, failing with [`DbError::NotFound`] when absent
    async fn find_by_email(&self, email: &str) -> Result<User, DbError>;

    /// Get a user by ID, failing with [`DbError::NotFound`] when absent
    async fn find_by_id(&self, id: &str) -> Result<User, DbError>;

    /// List one page of users, oldest first
    async fn list_paged(&self, page: PageRequest) -> Result<Vec<User>, DbError>;

    /// Replace a user's token pair. `updated_at` never moves backwards.
    async fn update_tokens(
        &self,
        id: &str,
        access_token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DbError>;

    /// Count all users
    async fn count(&self) -> Result<i64, DbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let page = PageRequest::new(None, None);
        assert_eq!(page.page(), 1);
        assert_eq!(page.per_page(), 20);
        assert_eq!(page.offset(), 0);
        assert_eq!(page.next_page(), 2);
    }

    #[test]
    fn test_page_request_clamps_below_one() {
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest::default());
        assert_eq!(PageRequest::new(Some(-3), Some(-1)), PageRequest::default());
    }

    #[test]
    fn test_page_request_offset() {
        let page = PageRequest::new(Some(3), Some(10));
        assert_eq!(page.offset(), 20);
        assert_eq!(page.next_page(), 4);
    }
}
