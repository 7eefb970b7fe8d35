//! User operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::error::DbError;
use crate::models::User;
use crate::repository::Database;
use crate::store::{PageRequest, UserStore};
use crate::utils::format_timestamp;

const USER_COLUMNS: &str = "id, first_name, last_name, email, phone, role, password_hash, \
     access_token, refresh_token, created_at, updated_at";

impl Database {
    async fn count_where(&self, column: &'static str, value: &str) -> Result<bool, DbError> {
        let sql = format!("SELECT COUNT(*) as count FROM users WHERE {} = ?", column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn fetch_one_where(&self, column: &'static str, value: &str) -> Result<User, DbError> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("user with {} '{}'", column, value)))?;

        Ok(User::try_from(&row)?)
    }
}

#[async_trait]
impl UserStore for Database {
    async fn exists_by_email(&self, email: &str) -> Result<bool, DbError> {
        self.bounded(
            "exists_by_email",
            self.timeouts.write,
            self.count_where("email", email),
        )
        .await
    }

    async fn exists_by_phone(&self, phone: &str) -> Result<bool, DbError> {
        self.bounded(
            "exists_by_phone",
            self.timeouts.write,
            self.count_where("phone", phone),
        )
        .await
    }

    async fn insert(&self, user: &User) -> Result<(), DbError> {
        let query = sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, email, phone, role, password_hash,
                               access_token, refresh_token, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(&user.access_token)
        .bind(&user.refresh_token)
        .bind(format_timestamp(&user.created_at))
        .bind(format_timestamp(&user.updated_at));

        self.bounded("insert", self.timeouts.write, async {
            query
                .execute(&self.pool)
                .await
                .map_err(|e| DbError::from_write(e, "user with this email or phone"))?;
            Ok::<(), DbError>(())
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<User, DbError> {
        self.bounded(
            "find_by_email",
            self.timeouts.read,
            self.fetch_one_where("email", email),
        )
        .await
    }

    async fn find_by_id(&self, id: &str) -> Result<User, DbError> {
        self.bounded("find_by_id", self.timeouts.read, self.fetch_one_where("id", id))
            .await
    }

    async fn list_paged(&self, page: PageRequest) -> Result<Vec<User>, DbError> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at, id LIMIT ? OFFSET ?",
            USER_COLUMNS
        );

        self.bounded("list_paged", self.timeouts.read, async {
            let rows = sqlx::query(&sql)
                .bind(page.per_page())
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await?;

            rows.iter()
                .map(|row| User::try_from(row).map_err(DbError::from))
                .collect::<Result<Vec<User>, DbError>>()
        })
        .await
    }

    async fn update_tokens(
        &self,
        id: &str,
        access_token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let updated_at = format_timestamp(&updated_at);

        self.bounded("update_tokens", self.timeouts.write, async {
            let result = sqlx::query(
                r#"
                UPDATE users
                SET access_token = ?,
                    refresh_token = ?,
                    updated_at = MAX(updated_at, ?)
                WHERE id = ?
                "#,
            )
            .bind(access_token)
            .bind(refresh_token)
            .bind(&updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::NotFound(format!("user with id '{}'", id)));
            }
            Ok::<(), DbError>(())
        })
        .await
    }

    async fn count(&self) -> Result<i64, DbError> {
        self.bounded("count", self.timeouts.read, async {
            let row = sqlx::query("SELECT COUNT(*) as count FROM users")
                .fetch_one(&self.pool)
                .await?;
            Ok::<i64, DbError>(row.get("count"))
        })
        .await
    }
}
