use super::extract::{FieldPath, Shape};

pub const COUNTRY: &str = "country";
pub const CITY: &str = "city";
pub const POSTAL_CODE: &str = "postal_code";
pub const LINE_1: &str = "line_1";
pub const STATE: &str = "state";
pub const IS_HQ: &str = "is_hq";

pub const ARTICLE_LINK: &str = "article_link";
pub const IMAGE: &str = "image";
pub const TEXT: &str = "text";
pub const TOTAL_LIKES: &str = "total_likes";
pub const POSTED_DAY: &str = "posted_day";
pub const POSTED_MONTH: &str = "posted_month";
pub const POSTED_YEAR: &str = "posted_year";

pub const NAME: &str = "name";
pub const LINK: &str = "link";
pub const INDUSTRY: &str = "industry";
pub const LOCATION: &str = "location";

pub const SIZE_MIN: &str = "min";
pub const SIZE_MAX: &str = "max";

pub const LOCATION_PATHS: &[FieldPath] = &[
    FieldPath::text(COUNTRY, &["country"]),
    FieldPath::text(CITY, &["city"]),
    FieldPath::text(POSTAL_CODE, &["postal_code"]),
    FieldPath::text(LINE_1, &["line_1"]),
    FieldPath::text(STATE, &["state"]),
    FieldPath::text(IS_HQ, &["is_hq"]),
];

pub const UPDATE_PATHS: &[FieldPath] = &[
    FieldPath::text(ARTICLE_LINK, &["article_link"]),
    FieldPath::text(IMAGE, &["image"]),
    FieldPath::text(TEXT, &["text"]),
    FieldPath::integer(TOTAL_LIKES, &["total_likes"]),
    FieldPath::integer(POSTED_DAY, &["posted_on", "day"]),
    FieldPath::integer(POSTED_MONTH, &["posted_on", "month"]),
    FieldPath::integer(POSTED_YEAR, &["posted_on", "year"]),
];

/// Shared by affiliated and similar companies.
pub const COMPANY_LINK_PATHS: &[FieldPath] = &[
    FieldPath::text(NAME, &["name"]),
    FieldPath::text(LINK, &["link"]),
    FieldPath::text(INDUSTRY, &["industry"]),
    FieldPath::text(LOCATION, &["location"]),
];

/// Semi-structured columns of the staging table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawField {
    CompanySize,
    Specialities,
    CompanyType,
    Industry,
    Locations,
    Updates,
    AffiliatedCompanies,
    SimilarCompanies,
}

impl RawField {
    pub fn shape(&self) -> Shape {
        match self {
            RawField::CompanySize => Shape::ScalarPair {
                first: SIZE_MIN,
                second: SIZE_MAX,
            },
            RawField::Specialities => Shape::ArrayOfScalar,
            RawField::CompanyType | RawField::Industry => Shape::Scalar,
            RawField::Locations => Shape::ArrayOfObject(LOCATION_PATHS),
            RawField::Updates => Shape::ArrayOfObject(UPDATE_PATHS),
            RawField::AffiliatedCompanies | RawField::SimilarCompanies => {
                Shape::ArrayOfObject(COMPANY_LINK_PATHS)
            }
        }
    }
}
