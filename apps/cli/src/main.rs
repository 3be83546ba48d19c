//! rbacsync command-line composition root.

#![forbid(unsafe_code)]

mod cli_config;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use rbacsync_application::{ChangeAction, ChangeReport, InitOptions, RbacAdminService};
use rbacsync_core::AppError;
use rbacsync_infrastructure::{
    JsonFileDocumentStore, PostgresGraphStore, StaticPermissionDiscovery, load_sync_definition,
};
use sqlx::postgres::PgPoolOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::cli_config::{CliConfig, init_tracing};

/// Synchronizes, exports and imports the role/permission graph.
#[derive(Parser, Debug)]
#[command(name = "rbacsync")]
#[command(about = "Role and permission graph synchronization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synchronize discovered actions and the definition file into the graph
    Init {
        /// Clear every role, permission, edge, rule and assignment first
        #[arg(long)]
        reset: bool,
        /// Delete stored permissions that are no longer discovered or declared
        #[arg(long)]
        delete_obsolete_permissions: bool,
        /// Do not ask for confirmation before a reset
        #[arg(long)]
        yes: bool,
    },

    /// Write the graph to per-locale documents
    Export,

    /// Replay the documents of the default locale into the graph
    Import,

    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = CliConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run database migrations: {error}")))?;

    if matches!(cli.command, Command::Migrate) {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let discovery = StaticPermissionDiscovery::from_file(&config.action_manifest).await?;
    let service = RbacAdminService::new(
        Arc::new(PostgresGraphStore::new(pool)),
        Arc::new(JsonFileDocumentStore::new(config.rbac_dir.clone())),
        Arc::new(discovery),
        config.admin_user_id.clone(),
    );

    match cli.command {
        Command::Init {
            reset,
            delete_obsolete_permissions,
            yes,
        } => {
            if reset && !yes && !confirm_reset().await? {
                return Err(AppError::Validation("reset was not confirmed".to_owned()));
            }

            let definition = load_sync_definition(&config.definition_file).await?;
            let report = service
                .init(InitOptions {
                    definition,
                    reset,
                    delete_obsolete_permissions,
                })
                .await?;

            log_report("init", &report);
        }
        Command::Export => {
            let report = service.export(&config.export_locales()).await?;
            for key in &report.documents {
                info!(document = %key, "document written");
            }
            info!(
                locales = report.locales.len(),
                documents = report.documents.len(),
                directory = %config.rbac_dir.display(),
                "export finished"
            );
        }
        Command::Import => {
            let report = service.import(&config.default_locale).await?;
            log_report("import", &report);
        }
        Command::Migrate => {}
    }

    Ok(())
}

const RESET_PROMPT: &str =
    "This removes every role, permission, edge, rule and assignment. Continue? [y/N] ";

async fn confirm_reset() -> Result<bool, AppError> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(RESET_PROMPT.as_bytes())
        .await
        .map_err(|error| AppError::Internal(format!("failed to write prompt: {error}")))?;
    stdout
        .flush()
        .await
        .map_err(|error| AppError::Internal(format!("failed to write prompt: {error}")))?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read confirmation: {error}")))?;

    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn log_report(operation: &str, report: &ChangeReport) {
    for change in report.changes() {
        info!("{change}");
    }

    for warning in report.warnings() {
        warn!("{warning}");
    }

    let count = |action: ChangeAction| {
        report
            .changes()
            .iter()
            .filter(|change| change.action == action)
            .count()
    };

    info!(
        created = count(ChangeAction::Created),
        updated = count(ChangeAction::Updated),
        removed = count(ChangeAction::Removed),
        skipped = count(ChangeAction::Skipped),
        warnings = report.warnings().len(),
        "{operation} finished"
    );
}
