//! Request/Response DTOs

use serde::{Deserialize, Serialize};
use warden_db::{PageRequest, User};

/// Single-record envelope
#[derive(Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Paginated user listing
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub data: Vec<User>,
    pub next_page: i64,
}

/// `GET /users` query parameters
///
/// Both are taken as raw strings: anything that is not a positive integer
/// falls back to the default page or page size.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub page: Option<String>,
    pub record_per_page: Option<String>,
}

impl ListUsersQuery {
    pub fn page_request(&self) -> PageRequest {
        let parse = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        PageRequest::new(parse(&self.page), parse(&self.record_per_page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, per_page: Option<&str>) -> ListUsersQuery {
        ListUsersQuery {
            page: page.map(str::to_string),
            record_per_page: per_page.map(str::to_string),
        }
    }

    #[test]
    fn test_page_request_from_query() {
        let defaults = query(None, None).page_request();
        assert_eq!((defaults.page(), defaults.per_page()), (1, 20));

        let zeros = query(Some("0"), Some("0")).page_request();
        assert_eq!((zeros.page(), zeros.per_page()), (1, 20));

        let junk = query(Some("two"), Some("-5")).page_request();
        assert_eq!((junk.page(), junk.per_page()), (1, 20));

        let explicit = query(Some("3"), Some("5")).page_request();
        assert_eq!((explicit.page(), explicit.per_page()), (3, 5));
        assert_eq!(explicit.offset(), 10);
    }
}
