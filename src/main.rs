//! medrelay server binary

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use medrelay::api::{create_router, with_cors, AppState};
use medrelay::backend::{create_backend, BackendConfig, RecordBackend};
use medrelay::config::{AppConfig, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config)?;

    let backend_config = config
        .backend
        .to_runtime()
        .context("invalid backend configuration")?;
    log_backend(&backend_config);

    let backend: Arc<dyn RecordBackend> = Arc::from(create_backend(backend_config)?);

    let state = AppState::new(backend, config.admin.passkey.as_str())
        .with_error_details(config.expose_error_details());
    if state.expose_errors {
        tracing::warn!("Development mode: error responses include internal detail");
    }

    let router = with_cors(create_router(state), config.cors.frontend_origin.as_deref())
        .context("invalid CORS configuration")?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!(%addr, "Listening for HTTP traffic");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

fn log_backend(config: &BackendConfig) {
    match config {
        BackendConfig::Appwrite(appwrite) => tracing::info!(
            endpoint = %appwrite.endpoint,
            project_id = %appwrite.project_id,
            database_id = %appwrite.database_id,
            bucket_id = ?appwrite.bucket_id,
            "Using hosted record backend",
        ),
        BackendConfig::Memory => {
            tracing::warn!("Using in-memory record backend; data is lost on restart")
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.logging.level.clone()))
        .unwrap_or_else(|_| EnvFilter::new("medrelay=info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }

    Ok(())
}
