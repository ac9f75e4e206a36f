//! # Scrape Listener
//!
//! Serves the current gauge values on `GET /metrics`. Binding happens
//! before `start` returns so a busy port surfaces as a startup error; the
//! accept loop then runs on a background task until shutdown is broadcast.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::SinkError;
use crate::exposition::PrometheusSink;

/// Path of the only endpoint.
pub const METRICS_PATH: &str = "/metrics";

/// A running scrape listener.
pub struct MetricsServer {
    /// The address actually bound (useful when port 0 was requested).
    pub local_addr: SocketAddr,
    pub handle: JoinHandle<()>,
}

/// Builds the router: `/metrics` and nothing else.
pub fn router(sink: Arc<PrometheusSink>) -> Router {
    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .with_state(sink)
}

/// Binds `addr` and starts serving in the background.
pub async fn start(
    sink: Arc<PrometheusSink>,
    addr: SocketAddr,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<MetricsServer, SinkError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| SinkError::Bind { addr, source })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| SinkError::Bind { addr, source })?;

    log::info!("Metrics listener on http://{}{}", local_addr, METRICS_PATH);

    let app = router(sink);
    let handle = tokio::spawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.recv().await.ok();
                log::info!("Metrics listener shutting down.");
            })
            .await;
        if let Err(e) = served {
            log::error!("Metrics listener failed: {}", e);
        }
    });

    Ok(MetricsServer { local_addr, handle })
}

async fn metrics_handler(State(sink): State<Arc<PrometheusSink>>) -> impl IntoResponse {
    match sink.render() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, sink.content_type())], body),
        Err(e) => {
            log::error!("Cannot render metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain".to_string())],
                e.to_string(),
            )
        }
    }
}
