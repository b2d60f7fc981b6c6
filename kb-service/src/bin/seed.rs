//! One-shot reconciliation: migrate, run a full catalog pass, print the
//! report as JSON. Exits non-zero when the pass fails or skips entries.

use kb_service::config::KbConfig;
use kb_service::dtos::SeedResponse;
use kb_service::init_metrics;
use kb_service::services::{SeedTrigger, connect_store};
use kb_service::startup::AppState;
use service_core::observability::init_tracing;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match KbConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::from(2);
        }
    };

    init_tracing(&config.service_name, &config.log_level, None);
    init_metrics();

    let store = match connect_store(&config.database) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize store");
            return ExitCode::FAILURE;
        }
    };

    let state = match AppState::new(config, store.clone()) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load seed catalog");
            store.close().await;
            return ExitCode::from(2);
        }
    };

    let code = match store.migrate().await {
        Err(e) => {
            tracing::error!(error = %e, "Migration failed");
            ExitCode::FAILURE
        }
        Ok(()) => match state.seeder.run(SeedTrigger::Cli).await {
            Ok(report) => {
                let clean = report.violations.is_empty();
                match serde_json::to_string_pretty(&SeedResponse::from(report)) {
                    Ok(json) => println!("{}", json),
                    Err(e) => tracing::error!(error = %e, "Failed to render seed report"),
                }
                if clean {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(3)
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Seed failed");
                ExitCode::FAILURE
            }
        },
    };

    store.close().await;
    code
}
