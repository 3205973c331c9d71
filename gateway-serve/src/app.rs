//! Axum app: shared state and the `/v2/*` router.

use std::sync::Arc;

use axum::routing::post;
use axum::Router;

use gateway_core::batch::BatchReconciler;
use gateway_core::config::resolver::ConfigurationResolver;
use gateway_core::GatewayEngine;

use crate::handlers;

pub struct AppState {
    pub engine: Arc<GatewayEngine>,
    pub batch: Arc<BatchReconciler>,
    pub resolver: Arc<ConfigurationResolver>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v2/chat", post(handlers::chat))
        .route("/v2/embedding", post(handlers::embedding))
        .route("/v2/image", post(handlers::image))
        .route("/v2/video", post(handlers::video))
        .route("/v2/batch", post(handlers::batch))
        .with_state(state)
}
