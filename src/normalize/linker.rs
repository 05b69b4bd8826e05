use sqlx::SqliteConnection;
use std::collections::BTreeSet;

use super::types::Junction;
use crate::db::junction::insert_link;
use crate::{MigrationError, MigrationResult};

/// Link a company to each target once. Repeated targets collapse and pairs that
/// already exist are left alone, so the call is safe to repeat. Returns the number
/// of rows added.
pub async fn link<I>(
    conn: &mut SqliteConnection,
    junction: Junction,
    company_id: i64,
    target_ids: I,
) -> MigrationResult<u64>
where
    I: IntoIterator<Item = i64>,
{
    let targets: BTreeSet<i64> = target_ids.into_iter().collect();

    let mut inserted = 0;
    for target_id in targets {
        inserted += insert_link(conn, junction, company_id, target_id)
            .await
            .map_err(|e| MigrationError::for_company(e, company_id))?;
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::company::{upsert_company, CompanyRecord};
    use crate::db::Database;
    use crate::normalize::dimension::{resolve, DimensionValue};
    use crate::normalize::types::Dimension;

    async fn setup() -> Database {
        let db = Database::in_memory().await.unwrap();
        db.initialize_schema().await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        for id in [1, 2] {
            let company = CompanyRecord {
                id,
                ..Default::default()
            };
            upsert_company(&mut conn, &company).await.unwrap();
        }
        drop(conn);
        db
    }

    #[tokio::test]
    async fn test_link_suppresses_duplicates() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let values = ["Cloud", "Cloud", "AI"]
            .iter()
            .filter_map(|v| DimensionValue::new(Dimension::Speciality, v));
        let ids = resolve(&mut conn, values).await.unwrap();
        let targets: Vec<i64> = ids.values().chain(ids.values()).copied().collect();

        let added = link(&mut conn, Junction::Speciality, 1, targets.clone()).await.unwrap();
        assert_eq!(added, 2);

        // Repeating the link adds nothing and does not fail
        let added = link(&mut conn, Junction::Speciality, 1, targets).await.unwrap();
        assert_eq!(added, 0);
        drop(conn);

        assert_eq!(db.linked_ids(Junction::Speciality, 1).await.unwrap().len(), 2);
        assert_eq!(db.count_rows("company_specialities").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_link_empty_targets() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let added = link(&mut conn, Junction::Industry, 2, Vec::new()).await.unwrap();
        assert_eq!(added, 0);
    }

    #[tokio::test]
    async fn test_link_missing_company_is_fatal() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let ids = resolve(
            &mut conn,
            DimensionValue::new(Dimension::Industry, "Software"),
        )
        .await
        .unwrap();

        let result = link(&mut conn, Junction::Industry, 99, ids.into_values()).await;
        assert!(matches!(result, Err(MigrationError::MissingRecord(99))));
    }
}
