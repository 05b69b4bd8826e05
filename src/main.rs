//! # Company profile normalizer
//!
//! Moves raw company profiles from the `raw_companies` staging table into the
//! normalized schema.
//!
//! ## Usage
//!
//! ```text
//! orgnorm init
//! orgnorm load profiles.jsonl
//! orgnorm migrate
//! orgnorm migrate --stage specialities --stage industries --json
//! orgnorm stats
//! orgnorm cleanup --yes
//! ```
//!
//! ## Configuration
//!
//! - `DATABASE_PATH`: SQLite database file (default: "companies.db"), overridden by `--database`
//! - `LOG_DIR`: directory for the daily rolling log file (default: "logs")
//! - `RUST_LOG`: stdout log filter

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use orgnorm::config::MigrationConfig;
use orgnorm::db::Database;
use orgnorm::migration::{Migration, Stage};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Normalize raw company profiles", long_about = None)]
struct Cli {
    /// SQLite database path, overrides DATABASE_PATH
    #[arg(short, long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the staging and normalized tables
    Init,

    /// Load a JSON Lines file of profiles into the staging table
    Load {
        /// File with one profile object per line
        path: PathBuf,
    },

    /// Run the migration from the staging table into the normalized tables
    Migrate {
        /// Only run these stages (repeatable); all stages by default
        #[arg(short, long, value_enum)]
        stage: Vec<Stage>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display row counts per table
    Stats,

    /// Drop the staging table once every row has been migrated
    Cleanup {
        /// Confirm the irreversible drop
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = MigrationConfig::from_env().with_database_path(cli.database);

    orgnorm::logging::configure_logging(&config.log_dir);

    let db = Database::new(&config.database_path)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_path))?;

    match cli.command {
        Commands::Init => {
            db.initialize_schema()
                .await
                .context("Failed to initialize schema")?;
            info!("Schema ready in {}", config.database_path);
        }

        Commands::Load { path } => {
            let loaded = db
                .load_profiles(&path)
                .await
                .with_context(|| format!("Failed to load {}", path.display()))?;
            info!("Loaded {} profiles from {}", loaded, path.display());
        }

        Commands::Migrate { stage, json } => {
            let report = Migration::new(&db)
                .with_stages(stage)
                .run()
                .await
                .context("Migration failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for stage in &report.stages {
                    println!(
                        "{:<22} records: {:>8}  resolved: {:>8}  written: {:>8}  {:>6}ms",
                        stage.stage.as_str(),
                        stage.records_processed,
                        stage.values_resolved,
                        stage.rows_written,
                        stage.elapsed_ms
                    );
                }
                println!("Total rows written: {}", report.rows_written());
            }
        }

        Commands::Stats => {
            for (table, count) in db.collect_stats().await? {
                println!("{:<28} {:>10}", table, count);
            }
        }

        Commands::Cleanup { yes } => {
            if !yes {
                bail!("Cleanup drops the staging table permanently; re-run with --yes");
            }
            db.cleanup_staging()
                .await
                .context("Cleanup refused")?;
            info!("Staging table dropped");
        }
    }

    Ok(())
}
