//! Sequences extraction, dimension resolution, linking and detail loading over
//! the whole staging table.
//!
//! Each stage runs in its own transaction and is safe to repeat: companies and
//! dimension values are upserts, junction rows ignore existing pairs and detail
//! rows are replaced per company.

use clap::ValueEnum;
use serde::Serialize;
use sqlx::SqliteConnection;
use std::collections::BTreeSet;
use std::fmt;
use tokio::time::Instant;
use tracing::{info, instrument};

use crate::db::company::{upsert_company, CompanyRecord};
use crate::db::{Database, RawCompany};
use crate::normalize::detail::{load, load_similar_companies, CompanyLink, DetailRow, Location, Update};
use crate::normalize::dimension::{normalize_value, resolve, DimensionValue};
use crate::normalize::extract::{extract, SubRecord, VALUE_KEY};
use crate::normalize::fields::{RawField, SIZE_MAX, SIZE_MIN};
use crate::normalize::linker::link;
use crate::normalize::types::Dimension;
use crate::{MigrationError, MigrationResult, TARGET_MIGRATION};

/// Field groups, declared in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Companies,
    Specialities,
    CompanyTypes,
    Industries,
    Locations,
    Updates,
    AffiliatedCompanies,
    SimilarCompanies,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Companies,
        Stage::Specialities,
        Stage::CompanyTypes,
        Stage::Industries,
        Stage::Locations,
        Stage::Updates,
        Stage::AffiliatedCompanies,
        Stage::SimilarCompanies,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Companies => "companies",
            Stage::Specialities => "specialities",
            Stage::CompanyTypes => "company-types",
            Stage::Industries => "industries",
            Stage::Locations => "locations",
            Stage::Updates => "updates",
            Stage::AffiliatedCompanies => "affiliated-companies",
            Stage::SimilarCompanies => "similar-companies",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub records_processed: usize,
    /// Distinct dimension values or similar companies resolved.
    pub values_resolved: usize,
    /// Rows inserted or refreshed.
    pub rows_written: u64,
    pub elapsed_ms: u128,
}

impl StageReport {
    fn new(stage: Stage, records_processed: usize) -> Self {
        Self {
            stage,
            records_processed,
            values_resolved: 0,
            rows_written: 0,
            elapsed_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub stages: Vec<StageReport>,
}

impl MigrationReport {
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == stage)
    }

    pub fn rows_written(&self) -> u64 {
        self.stages.iter().map(|report| report.rows_written).sum()
    }
}

pub struct Migration<'a> {
    db: &'a Database,
    stages: BTreeSet<Stage>,
}

impl<'a> Migration<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            stages: Stage::ALL.into_iter().collect(),
        }
    }

    /// Restrict the run to `stages`; an empty selection keeps every stage.
    /// Stages always execute in declaration order.
    pub fn with_stages<I: IntoIterator<Item = Stage>>(mut self, stages: I) -> Self {
        let selected: BTreeSet<Stage> = stages.into_iter().collect();
        if !selected.is_empty() {
            self.stages = selected;
        }
        self
    }

    #[instrument(target = "migration", level = "info", skip(self))]
    pub async fn run(&self) -> MigrationResult<MigrationReport> {
        self.db.ensure_schema().await?;
        let raw = self.db.fetch_raw_companies().await?;

        info!(
            target: TARGET_MIGRATION,
            "Migrating {} raw companies through {} stages", raw.len(), self.stages.len()
        );

        let mut report = MigrationReport::default();
        for stage in &self.stages {
            if *stage != Stage::Companies {
                self.ensure_companies_loaded().await?;
            }

            let start = Instant::now();
            let mut tx = self.db.pool().begin().await?;
            let mut stage_report = run_stage(&mut tx, *stage, &raw).await?;
            tx.commit().await?;
            stage_report.elapsed_ms = start.elapsed().as_millis();

            info!(
                target: TARGET_MIGRATION,
                "Stage {} complete: {} records, {} values resolved, {} rows written in {}ms",
                stage,
                stage_report.records_processed,
                stage_report.values_resolved,
                stage_report.rows_written,
                stage_report.elapsed_ms
            );
            report.stages.push(stage_report);
        }

        Ok(report)
    }

    /// Every staging row must already have its company before anything refers to it.
    async fn ensure_companies_loaded(&self) -> MigrationResult<()> {
        match self.db.first_unmigrated_id().await? {
            Some(company_id) => Err(MigrationError::MissingRecord(company_id)),
            None => Ok(()),
        }
    }
}

async fn run_stage(
    conn: &mut SqliteConnection,
    stage: Stage,
    raw: &[RawCompany],
) -> MigrationResult<StageReport> {
    let mut report = StageReport::new(stage, raw.len());
    match stage {
        Stage::Companies => {
            report.rows_written = migrate_companies(conn, raw).await?;
        }
        Stage::Specialities => {
            (report.values_resolved, report.rows_written) =
                migrate_dimension(conn, Dimension::Speciality, raw).await?;
        }
        Stage::CompanyTypes => {
            (report.values_resolved, report.rows_written) =
                migrate_dimension(conn, Dimension::CompanyType, raw).await?;
        }
        Stage::Industries => {
            (report.values_resolved, report.rows_written) =
                migrate_dimension(conn, Dimension::Industry, raw).await?;
        }
        Stage::Locations => {
            report.rows_written = migrate_details::<Location>(conn, RawField::Locations, raw).await?;
        }
        Stage::Updates => {
            report.rows_written = migrate_details::<Update>(conn, RawField::Updates, raw).await?;
        }
        Stage::AffiliatedCompanies => {
            report.rows_written =
                migrate_details::<CompanyLink>(conn, RawField::AffiliatedCompanies, raw).await?;
        }
        Stage::SimilarCompanies => {
            let field = RawField::SimilarCompanies;
            let batch: Vec<(i64, Vec<SubRecord>)> = raw
                .iter()
                .map(|company| (company.id, extract(company.field(field), field.shape()).collect()))
                .collect();
            let loaded = load_similar_companies(conn, &batch).await?;
            report.values_resolved = loaded.resolved;
            report.rows_written = loaded.linked;
        }
    }
    Ok(report)
}

fn clean_text(value: Option<&str>) -> Option<String> {
    value.and_then(normalize_value)
}

async fn migrate_companies(conn: &mut SqliteConnection, raw: &[RawCompany]) -> MigrationResult<u64> {
    let size_field = RawField::CompanySize;
    let mut written = 0;

    for company in raw {
        // Absent size leaves both bounds NULL; a missing bound inside a present pair is 0
        let size = extract(company.field(size_field), size_field.shape()).next();
        let record = CompanyRecord {
            id: company.id,
            name: clean_text(company.fields.name.as_deref()),
            tagline: clean_text(company.fields.tagline.as_deref()),
            description: clean_text(company.fields.description.as_deref()),
            website: clean_text(company.fields.website.as_deref()),
            founded_year: company.fields.founded_year,
            follower_count: company.fields.follower_count,
            size_min: size.as_ref().map(|s| s.integer(SIZE_MIN).unwrap_or(0)),
            size_max: size.as_ref().map(|s| s.integer(SIZE_MAX).unwrap_or(0)),
        };
        written += upsert_company(conn, &record).await?;
    }

    Ok(written)
}

async fn migrate_dimension(
    conn: &mut SqliteConnection,
    dimension: Dimension,
    raw: &[RawCompany],
) -> MigrationResult<(usize, u64)> {
    let field = dimension.raw_field();
    let per_company: Vec<(i64, Vec<DimensionValue>)> = raw
        .iter()
        .map(|company| {
            let values = extract(company.field(field), field.shape())
                .filter_map(|record| {
                    record
                        .text(VALUE_KEY)
                        .and_then(|value| DimensionValue::new(dimension, value))
                })
                .collect();
            (company.id, values)
        })
        .collect();

    let ids = resolve(
        conn,
        per_company.iter().flat_map(|(_, values)| values.iter().cloned()),
    )
    .await?;

    let mut linked = 0;
    for (company_id, values) in &per_company {
        let targets = values.iter().filter_map(|value| ids.get(value).copied());
        linked += link(conn, dimension.junction(), *company_id, targets).await?;
    }

    Ok((ids.len(), linked))
}

async fn migrate_details<R: DetailRow>(
    conn: &mut SqliteConnection,
    field: RawField,
    raw: &[RawCompany],
) -> MigrationResult<u64> {
    let mut inserted = 0;
    for company in raw {
        inserted += load::<R, _>(conn, company.id, extract(company.field(field), field.shape())).await?;
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::raw::upsert_raw_company;
    use crate::db::RawFields;
    use crate::normalize::detail::NO_LINK;
    use crate::normalize::types::Junction;

    async fn setup(rows: Vec<(i64, RawFields)>) -> Database {
        let db = Database::in_memory().await.unwrap();
        db.initialize_schema().await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        for (id, fields) in rows {
            upsert_raw_company(&mut conn, Some(id), &fields).await.unwrap();
        }
        drop(conn);
        db
    }

    fn full_profile() -> RawFields {
        RawFields {
            name: Some(" Acme Corp ".into()),
            website: Some("https://acme.example".into()),
            founded_year: Some(1999),
            follower_count: Some(1200),
            company_size: Some("[51, 200]".into()),
            specialities: Some(r#"["AI", "  ai  ", "Cloud"]"#.into()),
            company_type: Some("Privately Held".into()),
            industry: Some(" Software ".into()),
            locations: Some(
                r#"[{"country": "US", "city": "Austin", "is_hq": "true"},
                    {"city": "No country"},
                    {"country": "DE", "is_hq": "maybe"}]"#
                    .into(),
            ),
            updates: Some(
                r#"[{"text": "Launch", "total_likes": 4,
                     "posted_on": {"day": 2, "month": 3, "year": 2024}},
                    {"article_link": "https://acme.example/post"}]"#
                    .into(),
            ),
            affiliated_companies: Some(r#"[{"name": "Acme Labs"}, 17]"#.into()),
            similar_companies: Some(
                r#"[{"name": "Globex", "link": "https://globex.example",
                     "industry": "Software", "location": "Springfield"}]"#
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn table_counts(db: &Database) -> Vec<(&'static str, i64)> {
        db.collect_stats().await.unwrap()
    }

    #[tokio::test]
    async fn test_full_migration() {
        let db = setup(vec![(10, full_profile())]).await;
        let report = Migration::new(&db).run().await.unwrap();
        assert_eq!(report.stages.len(), Stage::ALL.len());

        let company = db.get_company(10).await.unwrap().unwrap();
        assert_eq!(company.name.as_deref(), Some("Acme Corp"));
        assert_eq!((company.size_min, company.size_max), (Some(51), Some(200)));

        // Case-sensitive: "AI" and "ai" are separate values
        let specialities: Vec<String> = db
            .dimension_values(Dimension::Speciality)
            .await
            .unwrap()
            .into_iter()
            .map(|(_, name)| name)
            .collect();
        assert_eq!(specialities.len(), 3);
        for expected in ["AI", "ai", "Cloud"] {
            assert!(specialities.iter().any(|name| name == expected));
        }
        assert_eq!(db.linked_ids(Junction::Speciality, 10).await.unwrap().len(), 3);
        assert_eq!(db.linked_ids(Junction::Industry, 10).await.unwrap().len(), 1);
        assert_eq!(db.linked_ids(Junction::CompanyType, 10).await.unwrap().len(), 1);
        assert_eq!(
            db.dimension_values(Dimension::Industry).await.unwrap()[0].1,
            "Software"
        );

        let locations = db.get_company_locations(10).await.unwrap();
        assert_eq!(
            locations,
            vec![
                ("US".to_string(), "Austin".to_string(), true),
                ("DE".to_string(), "No City Provided".to_string(), false),
            ]
        );

        let updates = db.get_company_updates(10).await.unwrap();
        assert_eq!(updates[0], (NO_LINK.to_string(), "2024-03-02".to_string(), 4));
        assert_eq!(updates[1].1, "1900-01-01");

        let affiliated = db.get_affiliated_companies(10).await.unwrap();
        assert_eq!(affiliated.len(), 1);
        assert_eq!(affiliated[0].name, "Acme Labs");

        assert_eq!(db.linked_ids(Junction::SimilarCompany, 10).await.unwrap().len(), 1);
        assert_eq!(
            report.stage(Stage::Specialities).map(|s| (s.values_resolved, s.rows_written)),
            Some((3, 3))
        );
    }

    #[tokio::test]
    async fn test_rerun_leaves_tables_unchanged() {
        let db = setup(vec![(1, full_profile()), (2, full_profile())]).await;
        Migration::new(&db).run().await.unwrap();
        let before = table_counts(&db).await;

        let report = Migration::new(&db).run().await.unwrap();
        assert_eq!(table_counts(&db).await, before);
        assert_eq!(report.stage(Stage::Specialities).unwrap().rows_written, 0);

        // Shared values across companies: one row each, linked twice
        assert_eq!(db.count_rows("specialities").await.unwrap(), 3);
        assert_eq!(db.count_rows("company_specialities").await.unwrap(), 6);
        assert_eq!(db.count_rows("similar_companies").await.unwrap(), 1);
        assert_eq!(db.count_rows("company_similar_companies").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_null_and_empty_fields_contribute_nothing() {
        let empty_arrays = RawFields {
            specialities: Some("[]".into()),
            locations: Some("".into()),
            updates: Some("not json".into()),
            company_type: Some("   ".into()),
            ..Default::default()
        };
        let db = setup(vec![(1, RawFields::default()), (2, empty_arrays)]).await;
        Migration::new(&db).run().await.unwrap();

        assert_eq!(db.count_rows("companies").await.unwrap(), 2);
        for (table, count) in table_counts(&db).await {
            if table != "companies" && table != "raw_companies" {
                assert_eq!(count, 0, "{} should be empty", table);
            }
        }
        let company = db.get_company(1).await.unwrap().unwrap();
        assert_eq!((company.size_min, company.size_max), (None, None));
    }

    #[tokio::test]
    async fn test_whitespace_variants_share_one_value() {
        let first = RawFields {
            specialities: Some(r#"["Cloud Computing"]"#.into()),
            ..Default::default()
        };
        let second = RawFields {
            specialities: Some(r#"[" Cloud Computing "]"#.into()),
            ..Default::default()
        };
        let db = setup(vec![(1, first), (2, second)]).await;
        Migration::new(&db).run().await.unwrap();

        let values = db.dimension_values(Dimension::Speciality).await.unwrap();
        assert_eq!(values.len(), 1);
        let id = values[0].0;
        assert_eq!(db.linked_ids(Junction::Speciality, 1).await.unwrap(), vec![id]);
        assert_eq!(db.linked_ids(Junction::Speciality, 2).await.unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn test_repeated_value_in_one_record_links_once() {
        let fields = RawFields {
            specialities: Some(r#"["Cloud", "Cloud", " Cloud"]"#.into()),
            updates: Some("[{}]".into()),
            ..Default::default()
        };
        let db = setup(vec![(1, fields)]).await;
        let report = Migration::new(&db).run().await.unwrap();

        assert_eq!(db.count_rows("specialities").await.unwrap(), 1);
        assert_eq!(db.count_rows("company_specialities").await.unwrap(), 1);
        assert_eq!(
            report.stage(Stage::Specialities).map(|s| (s.values_resolved, s.rows_written)),
            Some((1, 1))
        );
        // An empty update object still becomes a defaulted row
        assert_eq!(
            db.get_company_updates(1).await.unwrap(),
            vec![(NO_LINK.to_string(), "1900-01-01".to_string(), 0)]
        );
    }

    #[tokio::test]
    async fn test_open_ended_size_range() {
        let fields = RawFields {
            company_size: Some("[10001, null]".into()),
            ..Default::default()
        };
        let db = setup(vec![(1, fields)]).await;
        Migration::new(&db)
            .with_stages([Stage::Companies])
            .run()
            .await
            .unwrap();
        let company = db.get_company(1).await.unwrap().unwrap();
        assert_eq!((company.size_min, company.size_max), (Some(10001), Some(0)));
    }

    #[tokio::test]
    async fn test_stage_before_companies_is_fatal() {
        let db = setup(vec![(5, full_profile())]).await;
        let result = Migration::new(&db)
            .with_stages([Stage::Specialities])
            .run()
            .await;
        assert!(matches!(result, Err(MigrationError::MissingRecord(5))));
        assert_eq!(db.count_rows("specialities").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_schema_is_fatal() {
        let db = Database::in_memory().await.unwrap();
        let result = Migration::new(&db).run().await;
        assert!(matches!(
            result,
            Err(MigrationError::SchemaNotBootstrapped(_))
        ));
    }

    #[test]
    fn test_stage_selection_keeps_order() {
        let stages: Vec<Stage> = [Stage::SimilarCompanies, Stage::Companies, Stage::Updates]
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        assert_eq!(
            stages,
            vec![Stage::Companies, Stage::Updates, Stage::SimilarCompanies]
        );
        assert_eq!(Stage::CompanyTypes.to_string(), "company-types");
    }
}
