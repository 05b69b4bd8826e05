//! Deduplicates extracted values into lookup tables.
//!
//! The distinct set of keys is built over the whole batch before any id is
//! assigned; each distinct key is then upserted through the table's uniqueness
//! constraint, which resolves collisions to the existing row.

use async_trait::async_trait;
use sqlx::SqliteConnection;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

use super::types::Dimension;
use crate::db::dimension::upsert_dimension_value;
use crate::{MigrationResult, TARGET_MIGRATION};

/// Identity of a row in a deduplicated table.
#[async_trait]
pub trait DimensionKey: Ord + Clone + Send + Sync + fmt::Debug {
    /// Insert the key, or find the existing row, and return its id.
    async fn upsert(&self, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error>;
}

/// Trim surrounding whitespace; blank values are rejected. Case is preserved.
pub fn normalize_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DimensionValue {
    pub dimension: Dimension,
    pub name: String,
}

impl DimensionValue {
    pub fn new(dimension: Dimension, raw: &str) -> Option<Self> {
        normalize_value(raw).map(|name| Self { dimension, name })
    }
}

#[async_trait]
impl DimensionKey for DimensionValue {
    async fn upsert(&self, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
        upsert_dimension_value(conn, self.dimension, &self.name).await
    }
}

/// Resolve every key to a stable id.
pub async fn resolve<K, I>(conn: &mut SqliteConnection, keys: I) -> MigrationResult<BTreeMap<K, i64>>
where
    K: DimensionKey,
    I: IntoIterator<Item = K>,
{
    let distinct: BTreeSet<K> = keys.into_iter().collect();

    let mut resolved = BTreeMap::new();
    for key in distinct {
        let id = key.upsert(conn).await?;
        debug!(target: TARGET_MIGRATION, "Resolved {:?} to id {}", key, id);
        resolved.insert(key, id);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup() -> Database {
        let db = Database::in_memory().await.unwrap();
        db.initialize_schema().await.unwrap();
        db
    }

    fn specialities(values: &[&str]) -> Vec<DimensionValue> {
        values
            .iter()
            .filter_map(|value| DimensionValue::new(Dimension::Speciality, value))
            .collect()
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value(" Cloud Computing "), Some("Cloud Computing".into()));
        assert_eq!(normalize_value("AI"), Some("AI".into()));
        assert_eq!(normalize_value("   "), None);
        assert_eq!(normalize_value(""), None);
        // Case is not folded
        assert_ne!(normalize_value("ai"), normalize_value("AI"));
    }

    #[tokio::test]
    async fn test_resolve_dedups_whole_batch() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let resolved = resolve(
            &mut conn,
            specialities(&["Cloud Computing", " Cloud Computing ", "AI", "ai", "  "]),
        )
        .await
        .unwrap();
        drop(conn);

        assert_eq!(resolved.len(), 3);
        let rows = db.dimension_values(Dimension::Speciality).await.unwrap();
        let names: BTreeSet<String> = rows.into_iter().map(|(_, name)| name).collect();
        assert_eq!(
            names,
            BTreeSet::from(["AI".to_string(), "Cloud Computing".into(), "ai".into()])
        );
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let first = resolve(&mut conn, specialities(&["AI", "Cloud"])).await.unwrap();
        let second = resolve(&mut conn, specialities(&["Cloud", "AI", " AI"])).await.unwrap();
        assert_eq!(first, second);

        // A new value grows the table without disturbing existing ids
        let third = resolve(&mut conn, specialities(&["AI", "Robotics"])).await.unwrap();
        drop(conn);

        let ai = DimensionValue::new(Dimension::Speciality, "AI").unwrap();
        assert_eq!(third.get(&ai), first.get(&ai));
        assert_eq!(db.count_rows("specialities").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_dimensions_are_separate() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let keys = vec![
            DimensionValue::new(Dimension::Industry, "Software").unwrap(),
            DimensionValue::new(Dimension::Speciality, "Software").unwrap(),
        ];
        let resolved = resolve(&mut conn, keys).await.unwrap();
        drop(conn);

        assert_eq!(resolved.len(), 2);
        assert_eq!(db.count_rows("industries").await.unwrap(), 1);
        assert_eq!(db.count_rows("specialities").await.unwrap(), 1);
        assert_eq!(db.count_rows("company_types").await.unwrap(), 0);
    }
}
