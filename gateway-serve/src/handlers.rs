//! `/v2/*` handlers: each is a thin
//! `State`+`Json` extraction around the corresponding engine call.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use gateway_core::config::resolver::ResolveOverrides;
use gateway_core::error::GatewayError;
use gateway_protocol::{BatchRequest, ChatRequest, EmbeddingResponse, ImageResponse, VideoResponse};

use crate::app::AppState;
use crate::error::ApiError;

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<gateway_protocol::ChatResponse>, ApiError> {
    Ok(Json(state.engine.run_turn(req).await?))
}

pub async fn embedding(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<EmbeddingResponse>, ApiError> {
    Ok(Json(state.engine.run_embedding(req).await?))
}

pub async fn image(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ImageResponse>, ApiError> {
    Ok(Json(state.engine.run_image(req).await?))
}

pub async fn video(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<VideoResponse>, ApiError> {
    Ok(Json(state.engine.run_video(req).await?))
}

/// Each `batch[]` entry is one JSONL-style line: a JSON object carrying its
/// own `custom_id` plus the provider-native request body, mirroring how OpenAI/Anthropic batch submission itself is
/// JSONL. `custom_id` defaults to `item-<index>` if the line omits one.
pub async fn batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<gateway_protocol::BatchAckResponse>, ApiError> {
    let resolved = state
        .resolver
        .resolve(&req.bridge_id, None, ResolveOverrides::default())
        .await?;
    let cfg = resolved.primary().clone();

    let mut requests = Vec::with_capacity(req.batch.len());
    let mut custom_ids = Vec::with_capacity(req.batch.len());
    for (i, line) in req.batch.iter().enumerate() {
        let parsed: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| GatewayError::Validation(format!("batch line {i} is not valid JSON: {e}")))?;
        let custom_id = parsed
            .get("custom_id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("item-{i}"));
        custom_ids.push(custom_id);
        requests.push(parsed);
    }

    let ack = state
        .batch
        .submit(
            &req.bridge_id,
            cfg.service.as_str(),
            requests,
            custom_ids,
            req.webhook.url,
            req.webhook.headers,
            req.batch_variables,
            cfg.apikey.unwrap_or_default(),
        )
        .await?;
    Ok(Json(ack))
}
