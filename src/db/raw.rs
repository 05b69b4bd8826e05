use sqlx::{SqliteConnection, Row};
use tracing::{info, instrument};

use super::core::Database;
use super::schema::STAGING_TABLE;
use crate::normalize::fields::RawField;
use crate::TARGET_DB;

/// Every staging column except the id, as delivered by the loader.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct RawFields {
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub founded_year: Option<i64>,
    pub follower_count: Option<i64>,
    pub company_size: Option<String>,
    pub specialities: Option<String>,
    pub company_type: Option<String>,
    pub industry: Option<String>,
    pub locations: Option<String>,
    pub updates: Option<String>,
    pub affiliated_companies: Option<String>,
    pub similar_companies: Option<String>,
}

/// One row of the staging table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RawCompany {
    pub id: i64,
    #[sqlx(flatten)]
    pub fields: RawFields,
}

impl RawCompany {
    /// Raw text of a semi-structured column.
    pub fn field(&self, field: RawField) -> Option<&str> {
        let value = match field {
            RawField::CompanySize => &self.fields.company_size,
            RawField::Specialities => &self.fields.specialities,
            RawField::CompanyType => &self.fields.company_type,
            RawField::Industry => &self.fields.industry,
            RawField::Locations => &self.fields.locations,
            RawField::Updates => &self.fields.updates,
            RawField::AffiliatedCompanies => &self.fields.affiliated_companies,
            RawField::SimilarCompanies => &self.fields.similar_companies,
        };
        value.as_deref()
    }
}

/// Inserts or replaces a staging row. Rows without an id get one from SQLite.
pub(crate) async fn upsert_raw_company(
    conn: &mut SqliteConnection,
    id: Option<i64>,
    fields: &RawFields,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO raw_companies (
            id, name, tagline, description, website, founded_year, follower_count,
            company_size, specialities, company_type, industry, locations, updates,
            affiliated_companies, similar_companies
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            tagline = excluded.tagline,
            description = excluded.description,
            website = excluded.website,
            founded_year = excluded.founded_year,
            follower_count = excluded.follower_count,
            company_size = excluded.company_size,
            specialities = excluded.specialities,
            company_type = excluded.company_type,
            industry = excluded.industry,
            locations = excluded.locations,
            updates = excluded.updates,
            affiliated_companies = excluded.affiliated_companies,
            similar_companies = excluded.similar_companies
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(&fields.name)
    .bind(&fields.tagline)
    .bind(&fields.description)
    .bind(&fields.website)
    .bind(fields.founded_year)
    .bind(fields.follower_count)
    .bind(&fields.company_size)
    .bind(&fields.specialities)
    .bind(&fields.company_type)
    .bind(&fields.industry)
    .bind(&fields.locations)
    .bind(&fields.updates)
    .bind(&fields.affiliated_companies)
    .bind(&fields.similar_companies)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.get("id"))
}

impl Database {
    /// Every staging row, ordered by id.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn fetch_raw_companies(&self) -> Result<Vec<RawCompany>, sqlx::Error> {
        let rows = sqlx::query_as::<_, RawCompany>(
            r#"
            SELECT id, name, tagline, description, website, founded_year, follower_count,
                   company_size, specialities, company_type, industry, locations, updates,
                   affiliated_companies, similar_companies
            FROM raw_companies
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        info!(target: TARGET_DB, "Fetched {} raw companies", rows.len());
        Ok(rows)
    }

    /// Staging rows that have no counterpart in `companies` yet.
    pub async fn count_unmigrated(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM raw_companies r
            LEFT JOIN companies c ON c.id = r.id
            WHERE c.id IS NULL
            "#,
        )
        .fetch_one(self.pool())
        .await
    }

    /// Lowest staging id without a company row, if any.
    pub async fn first_unmigrated_id(&self) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT r.id
            FROM raw_companies r
            LEFT JOIN companies c ON c.id = r.id
            WHERE c.id IS NULL
            ORDER BY r.id
            LIMIT 1
            "#,
        )
        .fetch_optional(self.pool())
        .await
    }

    pub(crate) async fn drop_staging_table(&self) -> Result<(), sqlx::Error> {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", STAGING_TABLE))
            .execute(self.pool())
            .await?;
        info!(target: TARGET_DB, "Dropped staging table {}", STAGING_TABLE);
        Ok(())
    }
}
