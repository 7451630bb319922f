//! Paperflow operator CLI.
//!
//! - `paperflow health` - aggregated system health report
//! - `paperflow migrate` - audit and repair current-version pointers

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use paperflow::adapters::cache::create_cache;
use paperflow::adapters::object_store::{FilesystemObjectStore, RetryingObjectStore};
use paperflow::application::{DocumentCache, DocumentStore, PointerMigration, SystemStatus};
use paperflow::config::AppConfig;

/// Paperflow operator CLI.
#[derive(Parser)]
#[command(name = "paperflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report system health.
    ///
    /// Aggregates per-stage object counts and stuck-document detection.
    /// Exits nonzero unless the system is healthy.
    Health {
        /// Minutes after which a processing document counts as stuck;
        /// overrides the configured value.
        #[arg(long)]
        timeout_minutes: Option<i64>,

        /// Emit the report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Audit and repair current-version pointers.
    ///
    /// Exits nonzero when any document failed to audit or repair.
    Migrate {
        /// Report what would be repaired without writing anything.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays clean for JSON output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = config.validate() {
        error!(error = %err, "invalid configuration");
        return ExitCode::FAILURE;
    }

    let mut timeout_minutes = config.storage.processing_timeout_minutes as i64;
    if let Commands::Health {
        timeout_minutes: Some(minutes),
        ..
    } = &cli.command
    {
        timeout_minutes = *minutes;
    }

    let store = Arc::new(RetryingObjectStore::new(
        FilesystemObjectStore::new(&config.storage.root),
        config.storage.retry.policy(),
    ));
    let cache = DocumentCache::new(
        create_cache(&config.cache).await,
        Duration::from_secs(config.cache.ttl_seconds),
        Duration::from_secs(config.cache.health_ttl_seconds),
    );
    let docs = DocumentStore::new(store, cache, timeout_minutes);

    match cli.command {
        Commands::Health { json, .. } => run_health(&docs, json).await,
        Commands::Migrate { dry_run } => run_migrate(&docs, dry_run).await,
    }
}

async fn run_health(docs: &DocumentStore, json: bool) -> ExitCode {
    let health = match docs.get_system_health().await {
        Ok(health) => health,
        Err(err) => {
            error!(error = %err, "health check failed");
            return ExitCode::FAILURE;
        }
    };

    if json {
        match serde_json::to_string_pretty(&health) {
            Ok(encoded) => println!("{encoded}"),
            Err(err) => {
                error!(error = %err, "failed to encode health report");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("status: {:?}", health.status);
        println!("checked at: {}", health.checked_at);
        println!("stuck documents: {}", health.stuck_documents);
        println!("objects by state:");
        for (state, count) in &health.state_counts {
            println!("  {state}: {count}");
        }
        if !health.issues.is_empty() {
            println!("issues:");
            for issue in &health.issues {
                println!("  - {issue}");
            }
        }
    }

    match health.status {
        SystemStatus::Healthy => ExitCode::SUCCESS,
        SystemStatus::Degraded | SystemStatus::Unhealthy => ExitCode::FAILURE,
    }
}

async fn run_migrate(docs: &DocumentStore, dry_run: bool) -> ExitCode {
    let report = match PointerMigration::new(docs).run(dry_run).await {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, "pointer migration failed");
            return ExitCode::FAILURE;
        }
    };

    let action = if report.dry_run { "would repair" } else { "repaired" };
    println!("{} {} pointer(s)", action, report.repairs.len());
    for repair in &report.repairs {
        println!(
            "  {} -> {} ({:?})",
            repair.doc_id, repair.version, repair.issue
        );
    }
    for error in &report.errors {
        eprintln!("error: {error}");
    }

    if report.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
