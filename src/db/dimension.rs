use sqlx::{Row, SqliteConnection};

use crate::db::core::Database;
use crate::normalize::types::Dimension;

/// Add a dimension value or return the id of the existing row with the same text.
pub(crate) async fn upsert_dimension_value(
    conn: &mut SqliteConnection,
    dimension: Dimension,
    name: &str,
) -> Result<i64, sqlx::Error> {
    // DO UPDATE rather than DO NOTHING so RETURNING yields the existing id
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO {} (name)
        VALUES (?1)
        ON CONFLICT(name) DO UPDATE SET name = excluded.name
        RETURNING id
        "#,
        dimension.table()
    ))
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.get("id"))
}

pub(crate) async fn upsert_similar_company(
    conn: &mut SqliteConnection,
    name: &str,
    link: &str,
    industry: &str,
    location: &str,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO similar_companies (name, link, industry, location)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(name, link, industry, location) DO UPDATE SET name = excluded.name
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(link)
    .bind(industry)
    .bind(location)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.get("id"))
}

impl Database {
    /// All values of a dimension as (id, name), in id order
    pub async fn dimension_values(
        &self,
        dimension: Dimension,
    ) -> Result<Vec<(i64, String)>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT id, name FROM {} ORDER BY id",
            dimension.table()
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("id"), row.get("name")))
            .collect())
    }
}
