//! HTTP server for the AI gateway (axum).
//!
//! Exposes `/v2/chat`, `/v2/embedding`, `/v2/image`, `/v2/video`, and
//! `/v2/batch` over the [`GatewayEngine`]/[`BatchReconciler`] built by
//! `gateway-core`.
//!
//! **Public API**: [`run_serve`], [`run_serve_on_listener`].

mod app;
mod error;
mod handlers;
pub mod remote_store;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::info;

pub use app::AppState;
use app::router;

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Runs the server on an existing listener. Used by tests (bind to
/// `127.0.0.1:0`, then pass the listener) and by [`run_serve`].
pub async fn run_serve_on_listener(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: Option<oneshot::Receiver<()>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!("gateway HTTP server listening on http://{}", addr);

    let app = router(state);
    match shutdown {
        Some(rx) => {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await?;
        }
        None => {
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}

/// Runs the server. Listens on `addr` (default `0.0.0.0:8080`).
pub async fn run_serve(
    addr: Option<&str>,
    state: Arc<AppState>,
    shutdown: Option<oneshot::Receiver<()>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = addr.unwrap_or(DEFAULT_HTTP_ADDR);
    let listener = TcpListener::bind(addr).await?;
    run_serve_on_listener(listener, state, shutdown).await
}
