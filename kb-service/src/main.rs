//! kb-service entry point.

use kb_service::config::{KbConfig, redact_url};
use kb_service::init_metrics;
use kb_service::startup::Application;

use service_core::observability::init_tracing;
use tokio::signal;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load configuration
    let config = KbConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting kb-service");

    init_metrics();

    // Log configuration (mask sensitive values)
    tracing::info!(
        service_name = %config.service_name,
        http_port = %config.common.port,
        database_url = %redact_url(&config.database.url),
        db_max_connections = %config.database.max_connections,
        seed_on_boot = config.seed.on_boot,
        seed_skip_when_populated = config.seed.skip_when_populated,
        force_seed = config.seed.force,
        admin_secret_configured = config.security.admin_secret.is_some(),
        "Configuration loaded"
    );

    if config.security.admin_secret.is_none() {
        tracing::warn!("SECURITY_SECRET_KEY is not set, admin routes will answer 503");
    }

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to build application");
        std::io::Error::other(format!("Application build error: {}", e))
    })?;
    let store = app.store();

    // Run with graceful shutdown
    let result = tokio::select! {
        result = app.run_until_stopped() => result,
        _ = shutdown_signal() => {
            tracing::info!("Graceful shutdown initiated");
            Ok(())
        }
    };

    store.close().await;

    if let Err(e) = result {
        tracing::error!(error = %e, "Application error");
        return Err(e);
    }

    tracing::info!("Service shutdown complete");
    Ok(())
}
