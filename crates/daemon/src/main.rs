//! KB Sync - Main Entry Point
//! Starts one knowledge-base ingestion job and waits for it to finish.

mod report;
mod settings;

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kb_sync_core::application::{cancel_channel, Orchestrator};
use kb_sync_core::port::id_provider::UuidProvider;
use kb_sync_core::port::time_provider::SystemTimeProvider;
use kb_sync_infra_bedrock::BedrockIngestionService;

use crate::report::{process_exit_code, RunReport};
use crate::settings::SyncConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // 1. .env first so it can feed both logging and config
    let dotenv_path = dotenvy::dotenv().ok();

    // 2. Initialize logging
    init_logging()?;

    info!("kb-sync v{} starting...", VERSION);
    if let Some(path) = dotenv_path {
        info!(path = %path.display(), "Loaded .env");
    }

    // 3. Load configuration
    let conf = SyncConfig::load().context("Failed to load configuration")?;
    conf.validate()?;
    let request = conf.job_request()?;

    info!(
        region = %conf.region,
        knowledge_base_id = %request.knowledge_base_id(),
        data_source_id = %request.data_source_id(),
        poll_interval_s = conf.poll_interval_seconds,
        timeout_s = conf.timeout_seconds,
        "Configuration loaded"
    );

    // 4. Setup dependencies (DI wiring)
    let service = Arc::new(BedrockIngestionService::from_region(conf.region.clone()).await);
    let orchestrator = Orchestrator::new(
        service,
        Arc::new(SystemTimeProvider),
        Arc::new(UuidProvider),
        conf.orchestrator_settings(),
    );

    // 5. Ctrl+C cancels the run
    let (cancel_tx, cancel) = cancel_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received. Cancelling run...");
                cancel_tx.cancel();
            }
            Err(e) => warn!(error = ?e, "Failed to listen for Ctrl+C"),
        }
    });

    // 6. Run
    let outcome = orchestrator.run_with_cancel(&request, &cancel).await?;

    // 7. Report
    let report = RunReport::from_outcome(&outcome);
    let rendered =
        serde_json::to_string_pretty(&report).context("Failed to render run report")?;
    if outcome.is_success() {
        info!(outcome = outcome.kind(), "Run report:\n{}", rendered);
    } else {
        tracing::error!(outcome = outcome.kind(), "Run report:\n{}", rendered);
    }

    Ok(process_exit_code(&outcome))
}

fn init_logging() -> Result<()> {
    let log_format = std::env::var("KB_SYNC_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("kb_sync=info"))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init()
        }
        _ => {
            // Development: human-readable output
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .try_init()
        }
    }
    .context("Failed to install tracing subscriber")
}
