use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use translate_gateway::backend::{
    GoogleTranslateV2, GoogleTranslateV3, LegacyBackend, MockLegacyBackend, MockModernBackend,
    ModernBackend,
};
use translate_gateway::compat::CompatibilityWrapper;
use translate_gateway::config::{BackendConfig, Config};
use translate_gateway::lifecycle::{listen_for_signals, Lifecycle};
use translate_gateway::server::{self, AppState, ShutdownTiming};

fn init_logging(development_mode: bool) -> Result<()> {
    let directive = if development_mode {
        "translate_gateway=debug"
    } else {
        "translate_gateway=info"
    };
    let filter = EnvFilter::from_default_env().add_directive(directive.parse()?);

    if development_mode {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    }
    Ok(())
}

fn build_backends(
    config: &Config,
) -> Result<(Arc<dyn LegacyBackend>, Arc<dyn ModernBackend>)> {
    match &config.backends {
        BackendConfig::Mock => {
            info!("Using in-memory backends");
            let legacy: Arc<dyn LegacyBackend> = Arc::new(MockLegacyBackend::new());
            let modern: Arc<dyn ModernBackend> = Arc::new(MockModernBackend::new());
            Ok((legacy, modern))
        }
        BackendConfig::Google(google) => {
            let client = reqwest::Client::builder()
                .timeout(config.upstream_timeout)
                .build()
                .context("Failed to build HTTP client")?;

            let legacy = GoogleTranslateV2::new(
                client.clone(),
                google.v2_api_key.clone(),
                google.v2_base_url.clone(),
            );
            let modern = GoogleTranslateV3::new(
                client,
                google.v3_project_key.clone(),
                google.v3_base_url.clone(),
            )
            .with_access_token(google.v3_access_token.clone());

            info!(v2 = ?legacy, v3 = ?modern, "Using Google Translate backends");
            let legacy: Arc<dyn LegacyBackend> = Arc::new(legacy);
            let modern: Arc<dyn ModernBackend> = Arc::new(modern);
            Ok((legacy, modern))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Configuration problems abort before anything is served
    let config = Config::from_env()?;

    init_logging(config.development_mode)?;
    translate_gateway::error::init_app_name(&config.app_name);

    info!(
        app_name = %config.app_name,
        port = config.port,
        liveness_probe_port = config.liveness_probe_port,
        "Starting translate gateway"
    );

    let (legacy, modern) = build_backends(&config)?;
    let lifecycle = Arc::new(Lifecycle::new());
    let state = AppState::new(CompatibilityWrapper::new(legacy, modern), lifecycle.clone());

    let liveness_listener = TcpListener::bind(("0.0.0.0", config.liveness_probe_port))
        .await
        .with_context(|| format!("Failed to bind liveness port {}", config.liveness_probe_port))?;
    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;

    let liveness = tokio::spawn(async move {
        if let Err(e) = server::serve_liveness(liveness_listener).await {
            error!("Liveness listener failed: {}", e);
        }
    });
    tokio::spawn(listen_for_signals(lifecycle.clone()));

    let result = server::serve(
        listener,
        server::router(state),
        lifecycle,
        ShutdownTiming {
            drain: config.shutdown_drain,
            grace: config.graceful_shutdown,
        },
    )
    .await;

    liveness.abort();
    result.context("Server failed")?;

    info!("Stopped");
    Ok(())
}
