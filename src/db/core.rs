use sqlx::error::DatabaseError as _;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, Sqlite,
};
use std::str::FromStr;
use tokio::time::Duration;
use tracing::{info, instrument};

use super::schema::REQUIRED_TABLES;
use crate::{MigrationError, MigrationResult, TARGET_DB};

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Get access to the database pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

// Helper trait to recognise constraint failures that signal a broken precondition
pub trait DbConstraintErrorExt {
    fn is_foreign_key_violation(&self) -> bool;
}

impl DbConstraintErrorExt for sqlx::Error {
    fn is_foreign_key_violation(&self) -> bool {
        match self {
            sqlx::Error::Database(err) => err.is_foreign_key_violation(),
            _ => false,
        }
    }
}

impl MigrationError {
    /// Maps a failed insert for `company_id` to `MissingRecord` when the owning company
    /// does not exist.
    pub(crate) fn for_company(err: sqlx::Error, company_id: i64) -> Self {
        if err.is_foreign_key_violation() {
            MigrationError::MissingRecord(company_id)
        } else {
            MigrationError::Database(err)
        }
    }
}

impl Database {
    #[instrument(target = "db", level = "info")]
    pub async fn new(database_path: &str) -> Result<Self, sqlx::Error> {
        info!(target: TARGET_DB, "Creating database pool for: {}", database_path);

        let connect_options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", database_path))?
                .create_if_missing(true)
                .foreign_keys(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5))
                .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;

        info!(target: TARGET_DB, "Database pool created");

        Ok(Database { pool })
    }

    /// Private in-memory database on a single long-lived connection.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await?;

        Ok(Database { pool })
    }

    /// Fails with `SchemaNotBootstrapped` naming the first missing table.
    pub async fn ensure_schema(&self) -> MigrationResult<()> {
        for table in REQUIRED_TABLES {
            if !self.table_exists(table).await? {
                return Err(MigrationError::SchemaNotBootstrapped(table.to_string()));
            }
        }
        Ok(())
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool, sqlx::Error> {
        let found = sqlx::query("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .bind(table)
            .fetch_optional(self.pool())
            .await?;
        Ok(found.is_some())
    }

    /// Row counts for every existing table the migration touches.
    pub async fn collect_stats(&self) -> Result<Vec<(&'static str, i64)>, sqlx::Error> {
        let mut results = Vec::new();
        for table in REQUIRED_TABLES {
            if !self.table_exists(table).await? {
                continue;
            }
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(self.pool())
                .await?;
            results.push((*table, count));
        }
        Ok(results)
    }

    pub async fn count_rows(&self, table: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.pool())
            .await
    }
}
