use std::env;

pub const DEFAULT_DATABASE_PATH: &str = "companies.db";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Runtime settings, read from the environment and overridable from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Path of the SQLite database holding both the staging and normalized tables.
    pub database_path: String,
    /// Directory for the rolling log file.
    pub log_dir: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            log_dir: DEFAULT_LOG_DIR.to_string(),
        }
    }
}

impl MigrationConfig {
    /// Reads `DATABASE_PATH` and `LOG_DIR`, falling back to the defaults for unset or
    /// blank values.
    pub fn from_env() -> Self {
        Self {
            database_path: get_env_var_or("DATABASE_PATH", DEFAULT_DATABASE_PATH),
            log_dir: get_env_var_or("LOG_DIR", DEFAULT_LOG_DIR),
        }
    }

    pub fn with_database_path(mut self, database_path: Option<String>) -> Self {
        if let Some(path) = database_path {
            self.database_path = path;
        }
        self
    }
}

fn get_env_var_or(var: &str, default: &str) -> String {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override_wins() {
        let config = MigrationConfig::default().with_database_path(Some("other.db".into()));
        assert_eq!(config.database_path, "other.db");
        assert_eq!(config.log_dir, DEFAULT_LOG_DIR);

        let config = MigrationConfig::default().with_database_path(None);
        assert_eq!(config.database_path, DEFAULT_DATABASE_PATH);
    }

    #[test]
    fn test_missing_env_var_uses_default() {
        assert_eq!(
            get_env_var_or("ORGNORM_TEST_SURELY_UNSET_VARIABLE", "fallback"),
            "fallback"
        );
    }
}
