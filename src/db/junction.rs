use sqlx::SqliteConnection;

use crate::db::core::Database;
use crate::normalize::types::Junction;

/// Link a company to a target row. Returns 1 when a row was added, 0 when the pair
/// already existed.
pub(crate) async fn insert_link(
    conn: &mut SqliteConnection,
    junction: Junction,
    company_id: i64,
    target_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(&format!(
        r#"
        INSERT INTO {} (company_id, {})
        VALUES (?1, ?2)
        ON CONFLICT DO NOTHING
        "#,
        junction.table(),
        junction.target_column()
    ))
    .bind(company_id)
    .bind(target_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

impl Database {
    /// Target ids linked to a company, ascending
    pub async fn linked_ids(
        &self,
        junction: Junction,
        company_id: i64,
    ) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(&format!(
            "SELECT {} FROM {} WHERE company_id = ?1 ORDER BY 1",
            junction.target_column(),
            junction.table()
        ))
        .bind(company_id)
        .fetch_all(self.pool())
        .await
    }
}
