//! HTTP surface: the main router, the liveness listener and the serve loop
//! that drains connections on shutdown.

pub mod handlers;
pub mod wire;

use crate::compat::CompatibilityWrapper;
use crate::error::{ErrorKind, GatewayError};
use crate::lifecycle::Lifecycle;
use axum::extract::{Request, State};
use axum::http::{header, HeaderName, Method};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub compat: CompatibilityWrapper,
    pub lifecycle: Arc<Lifecycle>,
}

impl AppState {
    pub fn new(compat: CompatibilityWrapper, lifecycle: Arc<Lifecycle>) -> Self {
        Self { compat, lifecycle }
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([HeaderName::from_static("x-requested-with"), header::ORIGIN])
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/readiness", get(handlers::readiness))
        .route("/google-translate/v2/translate", post(handlers::legacy_translate))
        .route("/google-translate/v2/detect", post(handlers::legacy_detect))
        .route("/google-translate/v3/translate", post(handlers::modern_translate))
        .route("/google-translate/v3/detect", post(handlers::modern_detect))
        .route("/google-translate/translate", post(handlers::unified_translate))
        .route("/google-translate/detect", post(handlers::unified_detect))
        .route(
            "/google-translate/v3/glossaries",
            get(handlers::list_glossaries)
                .post(handlers::create_glossary)
                .delete(handlers::delete_glossary),
        )
        .fallback(handlers::not_found)
        .layer(CompressionLayer::new())
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Answers `200 {}` on every path.
pub fn liveness_router() -> Router {
    Router::new().fallback(handlers::liveness)
}

/// Serve the liveness probe until the process exits.
pub async fn serve_liveness(listener: TcpListener) -> io::Result<()> {
    info!("Liveness probe listening on {}", listener.local_addr()?);
    axum::serve(listener, liveness_router()).await
}

/// Shutdown timing for [`serve`], both measured from the moment the
/// lifecycle leaves `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownTiming {
    /// New connections are still accepted for this long, so probes see the
    /// `503` readiness answer before the listener closes. Capped at `grace`.
    pub drain: Duration,
    /// Deadline for in-flight requests.
    pub grace: Duration,
}

/// Serve `app` until shutdown begins, keep accepting for `timing.drain`,
/// then give in-flight requests until `timing.grace` to finish.
///
/// The lifecycle is `Stopped` when this returns. Any handler still running
/// at that point is dropped and its caller gets a `500` error body.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    lifecycle: Arc<Lifecycle>,
    timing: ShutdownTiming,
) -> io::Result<()> {
    info!("Serving on {}", listener.local_addr()?);

    let drain = timing.drain.min(timing.grace);
    let app = app.layer(middleware::from_fn_with_state(
        lifecycle.clone(),
        abandon_when_stopped,
    ));

    let shutdown_signal = {
        let lifecycle = lifecycle.clone();
        async move {
            lifecycle.wait_for_shutdown().await;
            tokio::time::sleep(drain).await;
            info!("Listener closed, draining in-flight requests");
        }
    };

    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
    });

    tokio::select! {
        result = &mut server => {
            // Server exited on its own, before any shutdown signal
            lifecycle.mark_stopped();
            return result.map_err(io::Error::other).and_then(|served| served);
        }
        _ = lifecycle.wait_for_shutdown() => {}
    }

    info!(
        drain_ms = drain.as_millis() as u64,
        grace_ms = timing.grace.as_millis() as u64,
        "Shutting down"
    );

    let outcome = match tokio::time::timeout(timing.grace, &mut server).await {
        Ok(result) => {
            info!("Graceful shutdown completed");
            result.map_err(io::Error::other).and_then(|served| served)
        }
        Err(_) => {
            warn!(
                grace_ms = timing.grace.as_millis() as u64,
                "Grace period elapsed, abandoning in-flight requests"
            );
            server.abort();
            Ok(())
        }
    };

    // Wakes every request still parked in `abandon_when_stopped`
    lifecycle.mark_stopped();
    outcome
}

/// Runs the request unless the lifecycle reaches `Stopped` first, in which
/// case the handler future is dropped.
async fn abandon_when_stopped(
    State(lifecycle): State<Arc<Lifecycle>>,
    request: Request,
    next: Next,
) -> Response {
    tokio::select! {
        response = next.run(request) => response,
        _ = lifecycle.wait_for_stop() => {
            GatewayError::new(ErrorKind::Internal, "request abandoned at shutdown").into_response()
        }
    }
}
