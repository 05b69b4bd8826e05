// Re-export the Database struct and other public items
pub mod company;
pub mod core;
pub(crate) mod detail;
pub(crate) mod dimension;
pub(crate) mod junction;
pub mod raw;
pub mod schema;

// Re-export Database and essential traits
pub use self::company::CompanyRecord;
pub use self::core::Database;
pub use self::core::DbConstraintErrorExt;
pub use self::raw::{RawCompany, RawFields};
