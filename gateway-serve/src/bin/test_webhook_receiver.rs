//! Test-only echo receiver for `POST /internal/webhook/batch/:batch_id`: an
//! ephemeral process an integration test points a batch submission's
//! webhook URL at, then asserts on what arrived.

use axum::extract::Path;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Default)]
struct Received(Mutex<Vec<(String, serde_json::Value)>>);

async fn echo(
    state: axum::extract::State<Arc<Received>>,
    Path(batch_id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> &'static str {
    state.0.lock().unwrap().push((batch_id, body));
    "ok"
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().init();

    let state = Arc::new(Received::default());
    let app = Router::new().route("/internal/webhook/batch/:batch_id", post(echo)).with_state(state);

    let addr = std::env::var("TEST_WEBHOOK_ADDR").unwrap_or_else(|_| "127.0.0.1:9090".to_string());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("test webhook receiver listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
