//! Typed detail rows built from extracted sub-records, with the sentinel defaults
//! substituted for missing sub-fields.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::debug;

use super::dimension::{resolve, DimensionKey};
use super::extract::SubRecord;
use super::fields::*;
use super::linker::link;
use super::types::Junction;
use crate::db::detail::{
    delete_company_rows, insert_affiliated_company, insert_location, insert_update,
};
use crate::db::dimension::upsert_similar_company;
use crate::{MigrationError, MigrationResult, TARGET_MIGRATION};

pub const NO_LINK: &str = "No Link Provided";
pub const NO_NAME: &str = "No Name Provided";
pub const NO_INDUSTRY: &str = "No Industry Provided";
pub const NO_LOCATION: &str = "No Location Provided";
pub const NO_CITY: &str = "No City Provided";
pub const NO_STATE: &str = "No State Provided";
pub const NO_POSTAL_CODE: &str = "No Postal Code Provided";
pub const NO_ADDRESS: &str = "No Address Provided";
pub const NO_IMAGE: &str = "No Image Provided";
pub const NO_TEXT: &str = "No Text Provided";

pub const DEFAULT_YEAR: i32 = 1900;
pub const DEFAULT_MONTH: u32 = 1;
pub const DEFAULT_DAY: u32 = 1;

fn text_or(record: &SubRecord, name: &str, sentinel: &str) -> String {
    record.text(name).unwrap_or(sentinel).to_string()
}

/// `"true"` and `"1"` are true, everything else (including absence) is false.
pub fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        let v = v.trim();
        v.eq_ignore_ascii_case("true") || v == "1"
    })
}

pub fn default_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(DEFAULT_YEAR, DEFAULT_MONTH, DEFAULT_DAY).unwrap_or_default()
}

/// Combine day, month and year into a date. Any missing component, or a
/// combination that is not a calendar date, yields 1900-01-01.
pub fn assemble_date(year: Option<i64>, month: Option<i64>, day: Option<i64>) -> NaiveDate {
    let (Some(year), Some(month), Some(day)) = (year, month, day) else {
        return default_date();
    };
    let parts = (
        i32::try_from(year).ok(),
        u32::try_from(month).ok(),
        u32::try_from(day).ok(),
    );
    let date = match parts {
        (Some(year), Some(month), Some(day)) => NaiveDate::from_ymd_opt(year, month, day),
        _ => None,
    };
    date.unwrap_or_else(default_date)
}

/// A row of a one-to-many detail table.
#[async_trait]
pub trait DetailRow: Sized + Send + Sync {
    const TABLE: &'static str;

    /// Apply defaults; `None` when a required sub-field is missing.
    fn from_sub_record(record: &SubRecord) -> Option<Self>;

    async fn insert(&self, conn: &mut SqliteConnection, company_id: i64)
        -> Result<(), sqlx::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub country: String,
    pub city: String,
    pub postal_code: String,
    pub line_1: String,
    pub state: String,
    pub is_hq: bool,
}

#[async_trait]
impl DetailRow for Location {
    const TABLE: &'static str = "company_locations";

    fn from_sub_record(record: &SubRecord) -> Option<Self> {
        // Country is required
        let country = record.text(COUNTRY)?.to_string();
        Some(Location {
            country,
            city: text_or(record, CITY, NO_CITY),
            postal_code: text_or(record, POSTAL_CODE, NO_POSTAL_CODE),
            line_1: text_or(record, LINE_1, NO_ADDRESS),
            state: text_or(record, STATE, NO_STATE),
            is_hq: parse_flag(record.text(IS_HQ)),
        })
    }

    async fn insert(&self, conn: &mut SqliteConnection, company_id: i64) -> Result<(), sqlx::Error> {
        insert_location(conn, company_id, self).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Update {
    pub article_link: String,
    pub image: String,
    pub posted_on: NaiveDate,
    pub text: String,
    pub total_likes: i64,
}

#[async_trait]
impl DetailRow for Update {
    const TABLE: &'static str = "company_updates";

    fn from_sub_record(record: &SubRecord) -> Option<Self> {
        Some(Update {
            article_link: text_or(record, ARTICLE_LINK, NO_LINK),
            image: text_or(record, IMAGE, NO_IMAGE),
            posted_on: assemble_date(
                record.integer(POSTED_YEAR),
                record.integer(POSTED_MONTH),
                record.integer(POSTED_DAY),
            ),
            text: text_or(record, TEXT, NO_TEXT),
            total_likes: record.integer(TOTAL_LIKES).unwrap_or(0),
        })
    }

    async fn insert(&self, conn: &mut SqliteConnection, company_id: i64) -> Result<(), sqlx::Error> {
        insert_update(conn, company_id, self).await
    }
}

/// Another company referenced from a profile. Stored per company as an
/// affiliated company, or shared across companies as a similar company.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, sqlx::FromRow,
)]
pub struct CompanyLink {
    pub name: String,
    pub link: String,
    pub industry: String,
    pub location: String,
}

impl CompanyLink {
    pub fn with_defaults(record: &SubRecord) -> Self {
        CompanyLink {
            name: text_or(record, NAME, NO_NAME),
            link: text_or(record, LINK, NO_LINK),
            industry: text_or(record, INDUSTRY, NO_INDUSTRY),
            location: text_or(record, LOCATION, NO_LOCATION),
        }
    }
}

#[async_trait]
impl DetailRow for CompanyLink {
    const TABLE: &'static str = "affiliated_companies";

    fn from_sub_record(record: &SubRecord) -> Option<Self> {
        Some(CompanyLink::with_defaults(record))
    }

    async fn insert(&self, conn: &mut SqliteConnection, company_id: i64) -> Result<(), sqlx::Error> {
        insert_affiliated_company(conn, company_id, self).await
    }
}

/// Identity of a shared similar company: the defaulted 4-tuple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimilarCompanyKey(pub CompanyLink);

#[async_trait]
impl DimensionKey for SimilarCompanyKey {
    async fn upsert(&self, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
        let CompanyLink {
            name,
            link,
            industry,
            location,
        } = &self.0;
        upsert_similar_company(conn, name, link, industry, location).await
    }
}

/// Replace a company's rows in `R::TABLE` with the rows built from `sub_records`.
///
/// Sub-records missing a required field are dropped without affecting the others.
/// Returns the number of rows inserted.
pub async fn load<R, I>(
    conn: &mut SqliteConnection,
    company_id: i64,
    sub_records: I,
) -> MigrationResult<u64>
where
    R: DetailRow,
    I: IntoIterator<Item = SubRecord>,
{
    let rows: Vec<R> = sub_records
        .into_iter()
        .filter_map(|record| R::from_sub_record(&record))
        .collect();

    let removed = delete_company_rows(conn, R::TABLE, company_id).await?;
    if removed > 0 {
        debug!(
            target: TARGET_MIGRATION,
            "Replacing {} rows in {} for company {}", removed, R::TABLE, company_id
        );
    }

    for row in &rows {
        row.insert(conn, company_id)
            .await
            .map_err(|e| MigrationError::for_company(e, company_id))?;
    }

    Ok(rows.len() as u64)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimilarCompanyLoad {
    /// Distinct similar companies seen in the batch.
    pub resolved: usize,
    /// Junction rows added.
    pub linked: u64,
}

/// Deduplicate the similar companies of every company in the batch, then link each
/// company to its entries.
pub async fn load_similar_companies(
    conn: &mut SqliteConnection,
    batch: &[(i64, Vec<SubRecord>)],
) -> MigrationResult<SimilarCompanyLoad> {
    let per_company: Vec<(i64, Vec<SimilarCompanyKey>)> = batch
        .iter()
        .map(|(company_id, records)| {
            let keys = records
                .iter()
                .map(|record| SimilarCompanyKey(CompanyLink::with_defaults(record)))
                .collect();
            (*company_id, keys)
        })
        .collect();

    let ids = resolve(
        conn,
        per_company.iter().flat_map(|(_, keys)| keys.iter().cloned()),
    )
    .await?;

    let mut linked = 0;
    for (company_id, keys) in &per_company {
        let targets = keys.iter().filter_map(|key| ids.get(key).copied());
        linked += link(conn, Junction::SimilarCompany, *company_id, targets).await?;
    }

    Ok(SimilarCompanyLoad {
        resolved: ids.len(),
        linked,
    })
}
