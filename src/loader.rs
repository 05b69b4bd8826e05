//! Fills the staging table from a JSON Lines dump of provider profiles.

use serde_json::{Map, Value};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, instrument};

use crate::db::raw::upsert_raw_company;
use crate::db::{Database, RawFields};
use crate::{MigrationError, MigrationResult, TARGET_DB};

/// Staging fields built from one profile object. The `id` is kept when the
/// profile carries an integer one.
pub fn raw_fields_from_profile(profile: &Map<String, Value>) -> (Option<i64>, RawFields) {
    let fields = RawFields {
        name: text_field(profile, "name"),
        tagline: text_field(profile, "tagline"),
        description: text_field(profile, "description"),
        website: text_field(profile, "website"),
        founded_year: integer_field(profile, "founded_year"),
        follower_count: integer_field(profile, "follower_count"),
        company_size: text_field(profile, "company_size"),
        specialities: text_field(profile, "specialities"),
        company_type: text_field(profile, "company_type"),
        industry: text_field(profile, "industry"),
        locations: text_field(profile, "locations"),
        updates: text_field(profile, "updates"),
        affiliated_companies: text_field(profile, "affiliated_companies"),
        similar_companies: text_field(profile, "similar_companies"),
    };
    (integer_field(profile, "id"), fields)
}

/// Strings are stored as-is; arrays, objects, numbers and booleans as JSON text.
fn text_field(profile: &Map<String, Value>, key: &str) -> Option<String> {
    match profile.get(key)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn integer_field(profile: &Map<String, Value>, key: &str) -> Option<i64> {
    match profile.get(key)? {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

impl Database {
    /// Load every profile in a JSON Lines file into the staging table, in one
    /// transaction. Returns the number of profiles loaded.
    #[instrument(target = "db", level = "info", skip(self, path))]
    pub async fn load_profiles<P: AsRef<Path>>(&self, path: P) -> MigrationResult<usize> {
        let file = File::open(path.as_ref()).await?;
        let mut lines = BufReader::new(file).lines();

        let mut tx = self.pool().begin().await?;
        let mut line_number = 0;
        let mut loaded = 0;

        while let Some(line) = lines.next_line().await? {
            line_number += 1;
            if line.trim().is_empty() {
                continue;
            }

            let profile = serde_json::from_str::<Map<String, Value>>(&line).map_err(|source| {
                MigrationError::InvalidRawRecord {
                    line: line_number,
                    source,
                }
            })?;
            let (id, fields) = raw_fields_from_profile(&profile);
            upsert_raw_company(&mut tx, id, &fields).await?;
            loaded += 1;
        }

        tx.commit().await?;
        info!(target: TARGET_DB, "Loaded {} profiles into the staging table", loaded);

        Ok(loaded)
    }

    /// Drop the staging table once every row has been migrated.
    pub async fn cleanup_staging(&self) -> MigrationResult<()> {
        self.ensure_schema().await?;
        let unmigrated = self.count_unmigrated().await?;
        if unmigrated > 0 {
            return Err(MigrationError::UnmigratedRecords(unmigrated));
        }
        self.drop_staging_table().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::Migration;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_profile_mapping() {
        let profile = json!({
            "id": 42,
            "name": "Acme",
            "founded_year": "1999",
            "follower_count": null,
            "company_size": [51, 200],
            "specialities": "[\"AI\"]",
            "locations": [{"country": "US"}],
            "industry": "Software",
            "unknown_field": true
        });
        let (id, fields) = raw_fields_from_profile(profile.as_object().unwrap());

        assert_eq!(id, Some(42));
        assert_eq!(fields.name.as_deref(), Some("Acme"));
        assert_eq!(fields.founded_year, Some(1999));
        assert_eq!(fields.follower_count, None);
        assert_eq!(fields.company_size.as_deref(), Some("[51,200]"));
        assert_eq!(fields.specialities.as_deref(), Some("[\"AI\"]"));
        assert_eq!(fields.locations.as_deref(), Some(r#"[{"country":"US"}]"#));
        assert_eq!(fields.updates, None);
    }

    #[tokio::test]
    async fn test_load_migrate_cleanup() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"id": 1, "name": "Acme", "specialities": ["AI", "Cloud"]}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"name": "No Id Inc", "specialities": ["Cloud"], "similar_companies": [{{"name": "Acme"}}]}}"#
        )
        .unwrap();

        let db = Database::in_memory().await.unwrap();
        db.initialize_schema().await.unwrap();
        assert_eq!(db.load_profiles(file.path()).await.unwrap(), 2);

        // Nothing migrated yet
        assert!(matches!(
            db.cleanup_staging().await,
            Err(MigrationError::UnmigratedRecords(2))
        ));

        Migration::new(&db).run().await.unwrap();
        assert_eq!(db.count_rows("specialities").await.unwrap(), 2);
        assert_eq!(db.count_rows("company_specialities").await.unwrap(), 3);

        db.cleanup_staging().await.unwrap();
        assert!(!db.table_exists("raw_companies").await.unwrap());
        assert_eq!(db.count_rows("companies").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalid_line_names_line_number() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id": 1}}"#).unwrap();
        writeln!(file, "[1, 2, 3]").unwrap();

        let db = Database::in_memory().await.unwrap();
        db.initialize_schema().await.unwrap();
        let result = db.load_profiles(file.path()).await;
        assert!(matches!(
            result,
            Err(MigrationError::InvalidRawRecord { line: 2, .. })
        ));
        // The transaction rolled back
        assert_eq!(db.count_rows("raw_companies").await.unwrap(), 0);
    }
}
