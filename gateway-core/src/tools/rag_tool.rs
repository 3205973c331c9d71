//! RAG tool execution, delegating to the deployment's `VectorStore`.

use serde_json::Value;
use std::collections::HashMap;

use super::VectorStore;
use crate::config::types::BridgeConfig;
use crate::error::GatewayError;

pub async fn invoke(store: &dyn VectorStore, _cfg: &BridgeConfig, args: &Value) -> Result<String, GatewayError> {
    let resource_id = args
        .get("resource_id")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::Tool("missing resource_id".to_string()))?;
    let query = args
        .get("query")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::Tool("missing query".to_string()))?;
    store.query(resource_id, query, None).await
}

/// Used when a tool name resolves to a fixed `resource_to_collection_mapping`.
pub async fn invoke_with_mapping(
    store: &dyn VectorStore,
    mapping: &HashMap<String, String>,
    args: &Value,
) -> Result<String, GatewayError> {
    let resource_id = args
        .get("resource_id")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::Tool("missing resource_id".to_string()))?;
    let query = args
        .get("query")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::Tool("missing query".to_string()))?;
    let collection = mapping.get(resource_id).map(String::as_str);
    store.query(resource_id, query, collection).await
}
