use tracing::info;

use super::core::Database;
use crate::TARGET_DB;

pub const STAGING_TABLE: &str = "raw_companies";

/// Every table a migration run reads or writes, staging table first.
pub const REQUIRED_TABLES: &[&str] = &[
    STAGING_TABLE,
    "companies",
    "specialities",
    "company_types",
    "industries",
    "company_specialities",
    "company_company_types",
    "company_industries",
    "company_locations",
    "company_updates",
    "affiliated_companies",
    "similar_companies",
    "company_similar_companies",
];

impl Database {
    pub async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        sqlx::query(
            r#"
            -- Wide staging table filled by the loader
            CREATE TABLE IF NOT EXISTS raw_companies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                tagline TEXT,
                description TEXT,
                website TEXT,
                founded_year INTEGER,
                follower_count INTEGER,
                company_size TEXT, -- JSON [min, max]
                specialities TEXT, -- JSON array of strings
                company_type TEXT,
                industry TEXT,
                locations TEXT, -- JSON array of objects
                updates TEXT,
                affiliated_companies TEXT,
                similar_companies TEXT
            );

            CREATE TABLE IF NOT EXISTS companies (
                id INTEGER PRIMARY KEY,
                name TEXT,
                tagline TEXT,
                description TEXT,
                website TEXT,
                founded_year INTEGER,
                follower_count INTEGER,
                size_min INTEGER,
                size_max INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_companies_name ON companies (name);

            -- Dimension tables
            CREATE TABLE IF NOT EXISTS specialities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS company_types (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS industries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            -- Company-dimension relationships
            CREATE TABLE IF NOT EXISTS company_specialities (
                company_id INTEGER NOT NULL,
                speciality_id INTEGER NOT NULL,
                PRIMARY KEY (company_id, speciality_id),
                FOREIGN KEY (company_id) REFERENCES companies (id) ON DELETE CASCADE,
                FOREIGN KEY (speciality_id) REFERENCES specialities (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_company_specialities_speciality_id ON company_specialities (speciality_id);

            CREATE TABLE IF NOT EXISTS company_company_types (
                company_id INTEGER NOT NULL,
                company_type_id INTEGER NOT NULL,
                PRIMARY KEY (company_id, company_type_id),
                FOREIGN KEY (company_id) REFERENCES companies (id) ON DELETE CASCADE,
                FOREIGN KEY (company_type_id) REFERENCES company_types (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_company_company_types_company_type_id ON company_company_types (company_type_id);

            CREATE TABLE IF NOT EXISTS company_industries (
                company_id INTEGER NOT NULL,
                industry_id INTEGER NOT NULL,
                PRIMARY KEY (company_id, industry_id),
                FOREIGN KEY (company_id) REFERENCES companies (id) ON DELETE CASCADE,
                FOREIGN KEY (industry_id) REFERENCES industries (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_company_industries_industry_id ON company_industries (industry_id);

            -- One-to-many detail tables
            CREATE TABLE IF NOT EXISTS company_locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company_id INTEGER NOT NULL,
                country TEXT NOT NULL,
                city TEXT NOT NULL,
                postal_code TEXT NOT NULL,
                line_1 TEXT NOT NULL,
                state TEXT NOT NULL,
                is_hq BOOLEAN NOT NULL,
                FOREIGN KEY (company_id) REFERENCES companies (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_company_locations_company_id ON company_locations (company_id);

            CREATE TABLE IF NOT EXISTS company_updates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company_id INTEGER NOT NULL,
                article_link TEXT NOT NULL,
                image TEXT NOT NULL,
                posted_on TEXT NOT NULL, -- YYYY-MM-DD
                text TEXT NOT NULL,
                total_likes INTEGER NOT NULL,
                FOREIGN KEY (company_id) REFERENCES companies (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_company_updates_company_id ON company_updates (company_id);
            CREATE INDEX IF NOT EXISTS idx_company_updates_posted_on ON company_updates (posted_on);

            CREATE TABLE IF NOT EXISTS affiliated_companies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                link TEXT NOT NULL,
                industry TEXT NOT NULL,
                location TEXT NOT NULL,
                FOREIGN KEY (company_id) REFERENCES companies (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_affiliated_companies_company_id ON affiliated_companies (company_id);

            -- Similar companies are shared across companies
            CREATE TABLE IF NOT EXISTS similar_companies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                link TEXT NOT NULL,
                industry TEXT NOT NULL,
                location TEXT NOT NULL,
                UNIQUE (name, link, industry, location)
            );

            CREATE TABLE IF NOT EXISTS company_similar_companies (
                company_id INTEGER NOT NULL,
                similar_company_id INTEGER NOT NULL,
                PRIMARY KEY (company_id, similar_company_id),
                FOREIGN KEY (company_id) REFERENCES companies (id) ON DELETE CASCADE,
                FOREIGN KEY (similar_company_id) REFERENCES similar_companies (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_company_similar_companies_similar_company_id ON company_similar_companies (similar_company_id);
            "#,
        )
        .execute(&mut *conn)
        .await?;

        info!(target: TARGET_DB, "Schema initialized");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        assert!(matches!(
            db.ensure_schema().await,
            Err(crate::MigrationError::SchemaNotBootstrapped(table)) if table == STAGING_TABLE
        ));

        db.initialize_schema().await.unwrap();
        db.initialize_schema().await.unwrap();
        db.ensure_schema().await.unwrap();

        let stats = db.collect_stats().await.unwrap();
        assert_eq!(stats.len(), REQUIRED_TABLES.len());
        assert!(stats.iter().all(|(_, count)| *count == 0));
    }
}
