use sqlx::SqliteConnection;

use crate::db::core::Database;
use crate::normalize::detail::{CompanyLink, Location, Update};

/// Remove the detail rows a company already owns in `table`, ahead of a reload.
pub(crate) async fn delete_company_rows(
    conn: &mut SqliteConnection,
    table: &str,
    company_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE company_id = ?1", table))
        .bind(company_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn insert_location(
    conn: &mut SqliteConnection,
    company_id: i64,
    location: &Location,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO company_locations (company_id, country, city, postal_code, line_1, state, is_hq)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(company_id)
    .bind(&location.country)
    .bind(&location.city)
    .bind(&location.postal_code)
    .bind(&location.line_1)
    .bind(&location.state)
    .bind(location.is_hq)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_update(
    conn: &mut SqliteConnection,
    company_id: i64,
    update: &Update,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO company_updates (company_id, article_link, image, posted_on, text, total_likes)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(company_id)
    .bind(&update.article_link)
    .bind(&update.image)
    .bind(update.posted_on.format("%Y-%m-%d").to_string())
    .bind(&update.text)
    .bind(update.total_likes)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_affiliated_company(
    conn: &mut SqliteConnection,
    company_id: i64,
    affiliated: &CompanyLink,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO affiliated_companies (company_id, name, link, industry, location)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(company_id)
    .bind(&affiliated.name)
    .bind(&affiliated.link)
    .bind(&affiliated.industry)
    .bind(&affiliated.location)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

impl Database {
    /// Locations of a company as (country, city, is_hq), in insertion order
    pub async fn get_company_locations(
        &self,
        company_id: i64,
    ) -> Result<Vec<(String, String, bool)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT country, city, is_hq FROM company_locations WHERE company_id = ?1 ORDER BY id",
        )
        .bind(company_id)
        .fetch_all(self.pool())
        .await
    }

    /// Updates of a company as (article_link, posted_on, total_likes), in insertion order
    pub async fn get_company_updates(
        &self,
        company_id: i64,
    ) -> Result<Vec<(String, String, i64)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT article_link, posted_on, total_likes FROM company_updates WHERE company_id = ?1 ORDER BY id",
        )
        .bind(company_id)
        .fetch_all(self.pool())
        .await
    }

    pub async fn get_affiliated_companies(
        &self,
        company_id: i64,
    ) -> Result<Vec<CompanyLink>, sqlx::Error> {
        sqlx::query_as::<_, CompanyLink>(
            "SELECT name, link, industry, location FROM affiliated_companies WHERE company_id = ?1 ORDER BY id",
        )
        .bind(company_id)
        .fetch_all(self.pool())
        .await
    }
}
