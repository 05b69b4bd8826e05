use serde::Serialize;
use sqlx::SqliteConnection;

use crate::db::core::Database;

/// Scalar columns of a normalized company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CompanyRecord {
    pub id: i64,
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub founded_year: Option<i64>,
    pub follower_count: Option<i64>,
    pub size_min: Option<i64>,
    pub size_max: Option<i64>,
}

/// Create the company or refresh its scalar columns; the id never changes.
pub(crate) async fn upsert_company(
    conn: &mut SqliteConnection,
    company: &CompanyRecord,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO companies (
            id, name, tagline, description, website, founded_year, follower_count,
            size_min, size_max
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            tagline = excluded.tagline,
            description = excluded.description,
            website = excluded.website,
            founded_year = excluded.founded_year,
            follower_count = excluded.follower_count,
            size_min = excluded.size_min,
            size_max = excluded.size_max
        "#,
    )
    .bind(company.id)
    .bind(&company.name)
    .bind(&company.tagline)
    .bind(&company.description)
    .bind(&company.website)
    .bind(company.founded_year)
    .bind(company.follower_count)
    .bind(company.size_min)
    .bind(company.size_max)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

impl Database {
    /// Get the scalar columns of a specific company
    pub async fn get_company(&self, company_id: i64) -> Result<Option<CompanyRecord>, sqlx::Error> {
        sqlx::query_as::<_, CompanyRecord>(
            r#"
            SELECT id, name, tagline, description, website, founded_year, follower_count,
                   size_min, size_max
            FROM companies
            WHERE id = ?1
            "#,
        )
        .bind(company_id)
        .fetch_optional(self.pool())
        .await
    }
}
