pub mod detail;
pub mod dimension;
pub mod extract;
pub mod fields;
pub mod linker;
pub mod types;

pub use extract::{extract, FieldPath, Shape, SubRecord};
pub use fields::RawField;
pub use types::*;
