//! Tool Registry & Invoker: materializes HTTP,
//! RAG, and connected-agent tools (plus `web_search`/`web_crawl` built-ins)
//! and executes parallel fan-out when the model requests tool calls.

pub mod agent_tool;
pub mod builtin;
pub mod http_tool;
pub mod rag_tool;

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::types::{BridgeConfig, ToolTarget};
use crate::error::GatewayError;
use crate::provider::{DetectedToolCall, ToolExecutionResult};

/// RAG backend port.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn query(
        &self,
        resource_id: &str,
        query: &str,
        collection: Option<&str>,
    ) -> Result<String, GatewayError>;
}

/// One HTTP-tool argument-hydration + invocation round: hydrates args from
/// `variables_path`, then dispatches. Re-entrant agent calls go through
/// `AgentCaller` so the invoker never depends on the engine directly (would
/// be a cycle): the engine registers itself as the `AgentCaller` at
/// startup.
#[async_trait]
pub trait AgentCaller: Send + Sync {
    async fn call_agent(
        &self,
        bridge_id: &str,
        version_id: Option<&str>,
        user_query: &str,
        thread_id: Option<&str>,
    ) -> Result<String, GatewayError>;
}

pub struct ToolInvoker {
    pub http_client: reqwest::Client,
    pub vector_store: Option<Arc<dyn VectorStore>>,
    pub agent_caller: Option<Arc<dyn AgentCaller>>,
}

impl ToolInvoker {
    pub fn new(
        http_client: reqwest::Client,
        vector_store: Option<Arc<dyn VectorStore>>,
        agent_caller: Option<Arc<dyn AgentCaller>>,
    ) -> Self {
        ToolInvoker { http_client, vector_store, agent_caller }
    }

    /// Hydrates each call's args from `variables_path`, then executes every call in parallel. A single failing tool never aborts peers — its
    /// failure becomes the tool-result content string.
    pub async fn invoke_all(
        &self,
        cfg: &BridgeConfig,
        calls: &[DetectedToolCall],
        variables: &HashMap<String, serde_json::Value>,
    ) -> Vec<ToolExecutionResult> {
        let futures = calls.iter().map(|call| {
            let hydrated_args = hydrate_args(cfg, &call.name, call.arguments.clone(), variables);
            self.invoke_one(cfg, call, hydrated_args)
        });
        join_all(futures).await
    }

    async fn invoke_one(
        &self,
        cfg: &BridgeConfig,
        call: &DetectedToolCall,
        args: serde_json::Value,
    ) -> ToolExecutionResult {
        let result = self.dispatch(cfg, call, args).await;
        match result {
            Ok(content) => ToolExecutionResult {
                call_id: call.call_id.clone(),
                name: call.name.clone(),
                content,
                is_error: false,
            },
            Err(e) => ToolExecutionResult {
                call_id: call.call_id.clone(),
                name: call.name.clone(),
                content: e.to_string(),
                is_error: true,
            },
        }
    }

    async fn dispatch(
        &self,
        cfg: &BridgeConfig,
        call: &DetectedToolCall,
        args: serde_json::Value,
    ) -> Result<String, GatewayError> {
        if call.name == "web_search" {
            return builtin::web_search(&self.http_client, &args).await;
        }
        if call.name == "web_crawl" {
            return builtin::web_crawl(&self.http_client, &args).await;
        }
        if call.name == "get_knowledge_base_data" {
            let Some(store) = &self.vector_store else {
                return Err(GatewayError::Tool("RAG not configured for this bridge".to_string()));
            };
            return rag_tool::invoke(store.as_ref(), cfg, &args).await;
        }
        if let Some(name) = call.name.strip_suffix("_query") {
            if let Some(agent) = cfg.connected_agents.get(name) {
                let Some(caller) = &self.agent_caller else {
                    return Err(GatewayError::Tool("agent calls not configured".to_string()));
                };
                return agent_tool::invoke(caller.as_ref(), agent, &args).await;
            }
        }

        // Unknown-tool-name invariant: never crash, surface
        // a fixed error string to the model.
        let Some(target) = cfg.tool_id_and_name_mapping.get(&call.name) else {
            return Err(GatewayError::Tool("Wrong Function name".to_string()));
        };
        match target {
            ToolTarget::Http { url } => http_tool::invoke(&self.http_client, url, &args).await,
            ToolTarget::Rag { resource_to_collection_mapping } => {
                let Some(store) = &self.vector_store else {
                    return Err(GatewayError::Tool("RAG not configured for this bridge".to_string()));
                };
                rag_tool::invoke_with_mapping(store.as_ref(), resource_to_collection_mapping, &args).await
            }
            ToolTarget::Agent { bridge_id, version_id, .. } => {
                let Some(caller) = &self.agent_caller else {
                    return Err(GatewayError::Tool("agent calls not configured".to_string()));
                };
                let query = args.get("_query").and_then(|v| v.as_str()).unwrap_or_default();
                caller
                    .call_agent(bridge_id, version_id.as_deref(), query, None)
                    .await
            }
            ToolTarget::WebSearch => builtin::web_search(&self.http_client, &args).await,
            ToolTarget::WebCrawl => builtin::web_crawl(&self.http_client, &args).await,
        }
    }
}

/// Overwrites each arg whose path is listed in `variables_path[function_name]`
/// with the corresponding variable value.
fn hydrate_args(
    cfg: &BridgeConfig,
    function_name: &str,
    mut args: serde_json::Value,
    variables: &HashMap<String, serde_json::Value>,
) -> serde_json::Value {
    let Some(mapping) = cfg.variables_path.get(function_name) else {
        return args;
    };
    if let serde_json::Value::Object(map) = &mut args {
        for (arg_path, variable_path) in mapping {
            if let Some(value) = variables.get(variable_path) {
                map.insert(arg_path.clone(), value.clone());
            }
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DetectedToolCall;
    use serde_json::json;

    fn bridge_with_unknown_tool() -> BridgeConfig {
        let raw = json!({
            "bridge_id": "b1",
            "org_id": "o1",
            "service": "openai",
            "model": "gpt-4o",
            "configuration": {"prompt": "hi"}
        });
        serde_json::from_value(raw).unwrap()
    }

    #[tokio::test]
    async fn unknown_tool_name_surfaces_error_without_panicking() {
        let invoker = ToolInvoker::new(reqwest::Client::new(), None, None);
        let cfg = bridge_with_unknown_tool();
        let call = DetectedToolCall {
            call_id: "1".into(),
            name: "does_not_exist".into(),
            arguments: json!({}),
        };
        let results = invoker.invoke_all(&cfg, std::slice::from_ref(&call), &HashMap::new()).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_error);
        assert_eq!(results[0].content, "Wrong Function name");
    }

    #[test]
    fn hydrate_args_overwrites_from_variables_path() {
        let mut cfg = bridge_with_unknown_tool();
        let mut fn_map = HashMap::new();
        fn_map.insert("user_id".to_string(), "session.user_id".to_string());
        cfg.variables_path.insert("lookup".to_string(), fn_map);

        let mut variables = HashMap::new();
        variables.insert("session.user_id".to_string(), json!("u-42"));

        let hydrated = hydrate_args(&cfg, "lookup", json!({"user_id": "stale"}), &variables);
        assert_eq!(hydrated["user_id"], json!("u-42"));
    }
}
