//! Connected-agent tool execution"). The actual re-entry lives behind `AgentCaller` so
//! this module stays a thin argument-unpacking shim.

use serde_json::Value;

use super::AgentCaller;
use crate::config::types::ConnectedAgent;
use crate::error::GatewayError;

pub async fn invoke(caller: &dyn AgentCaller, agent: &ConnectedAgent, args: &Value) -> Result<String, GatewayError> {
    let query = args
        .get("_query")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::Tool("missing _query".to_string()))?;
    caller
        .call_agent(&agent.bridge_id, agent.version_id.as_deref(), query, None)
        .await
}
