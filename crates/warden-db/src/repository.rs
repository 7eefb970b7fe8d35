//! Database repository implementation

use std::future::Future;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};

use crate::error::DbError;

// Submodules
mod users;

const MEMORY_URL: &str = "sqlite::memory:";

/// Wall-clock bounds applied to every store call
#[derive(Debug, Clone, Copy)]
pub struct StoreTimeouts {
    /// Uniqueness checks, inserts and token updates
    pub write: Duration,
    /// Lookups and paginated listing
    pub read: Duration,
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self {
            write: Duration::from_secs(10),
            read: Duration::from_secs(20),
        }
    }
}

/// Database connection and operations
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    timeouts: StoreTimeouts,
}

impl Database {
    /// Create a new database connection
    pub async fn new(database_url: &str, timeouts: StoreTimeouts) -> Result<Self, DbError> {
        info!("Connecting to database: {}", database_url);

        let pool = if database_url == MEMORY_URL {
            // Every in-memory connection is its own database, so pin one.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(database_url)
                .await?
        } else {
            SqlitePool::connect(database_url).await?
        };

        let db = Self { pool, timeouts };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Create a private in-memory database
    pub async fn in_memory(timeouts: StoreTimeouts) -> Result<Self, DbError> {
        Self::new(MEMORY_URL, timeouts).await
    }

    /// Run `fut` under `limit`, dropping it (and whatever connection it
    /// holds) if the deadline passes.
    pub(crate) async fn bounded<T, F>(
        &self,
        operation: &'static str,
        limit: Duration,
        fut: F,
    ) -> Result<T, DbError>
    where
        F: Future<Output = Result<T, DbError>>,
    {
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Store operation {} timed out after {:?}", operation, limit);
                Err(DbError::Timeout {
                    operation,
                    after: limit,
                })
            }
        }
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<(), DbError> {
        info!("Running database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                phone TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                access_token TEXT NOT NULL,
                refresh_token TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

        info!("Database migrations completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_times_out() {
        let db = Database::in_memory(StoreTimeouts::default()).await.unwrap();

        let result: Result<(), DbError> = db
            .bounded("slow", Duration::from_millis(10), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<(), DbError>(())
            })
            .await;

        assert!(matches!(
            result,
            Err(DbError::Timeout {
                operation: "slow",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::in_memory(StoreTimeouts::default()).await.unwrap();
        db.run_migrations().await.unwrap();
    }
}
