use super::fields::RawField;

/// Categorical attributes deduplicated into their own lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Speciality,
    CompanyType,
    Industry,
}

impl Dimension {
    pub fn table(&self) -> &'static str {
        match self {
            Dimension::Speciality => "specialities",
            Dimension::CompanyType => "company_types",
            Dimension::Industry => "industries",
        }
    }

    pub fn raw_field(&self) -> RawField {
        match self {
            Dimension::Speciality => RawField::Specialities,
            Dimension::CompanyType => RawField::CompanyType,
            Dimension::Industry => RawField::Industry,
        }
    }

    pub fn junction(&self) -> Junction {
        match self {
            Dimension::Speciality => Junction::Speciality,
            Dimension::CompanyType => Junction::CompanyType,
            Dimension::Industry => Junction::Industry,
        }
    }
}

/// Many-to-many tables pairing a company with a shared row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Junction {
    Speciality,
    CompanyType,
    Industry,
    SimilarCompany,
}

impl Junction {
    pub fn table(&self) -> &'static str {
        match self {
            Junction::Speciality => "company_specialities",
            Junction::CompanyType => "company_company_types",
            Junction::Industry => "company_industries",
            Junction::SimilarCompany => "company_similar_companies",
        }
    }

    pub fn target_column(&self) -> &'static str {
        match self {
            Junction::Speciality => "speciality_id",
            Junction::CompanyType => "company_type_id",
            Junction::Industry => "industry_id",
            Junction::SimilarCompany => "similar_company_id",
        }
    }
}
