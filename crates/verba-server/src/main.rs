//! verba server - HTTP API over NLP inference pipelines.

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod error;
mod state;

use verba_core::{pipelines, Capability, EngineConfig, PipelineCache};

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "verba_server=debug,verba_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting verba NLP server");

    // Load configuration
    let config = EngineConfig::default();
    info!("Models directory: {:?}", config.models_dir);
    info!("Pipeline device: {}", config.device);

    // Build the pipeline cache at the composition root and inject it
    let cache = PipelineCache::new(
        config.descriptors(),
        pipelines::builder(config.models_dir.clone()),
    );
    let state = AppState::new(cache);

    info!("Pipeline cache initialized, pipelines load on first request");

    // Optionally warm pipelines in the background without delaying bind
    preload_from_env(&state);

    // Build router
    let app = api::create_router(state.clone());

    // Start server
    let host = std::env::var("VERBA_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = match std::env::var("VERBA_PORT") {
        Ok(raw) => match raw.parse::<u16>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Invalid VERBA_PORT='{}', falling back to 8080", raw);
                8080
            }
        },
        Err(_) => 8080,
    };
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    info!("Server ready. Press Ctrl+C to stop.");
    server.await?;

    Ok(())
}

/// Warm the capabilities named in VERBA_PRELOAD (comma-separated).
fn preload_from_env(state: &AppState) {
    let Ok(raw) = std::env::var("VERBA_PRELOAD") else {
        return;
    };

    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match name.parse::<Capability>() {
            Ok(capability) => {
                let pipelines = state.pipelines.clone();
                tokio::spawn(async move {
                    if let Err(err) = pipelines.get(capability).await {
                        warn!("Preload of {} failed: {}", capability, err);
                    }
                });
            }
            Err(err) => warn!("Ignoring VERBA_PRELOAD entry: {}", err),
        }
    }
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}
