pub mod config;
pub mod db;
pub mod error;
pub mod loader;
pub mod logging;
pub mod migration;
pub mod normalize;

pub use error::{MigrationError, MigrationResult};

pub const TARGET_DB: &str = "db_query";
pub const TARGET_EXTRACT: &str = "extract";
pub const TARGET_MIGRATION: &str = "migration";
