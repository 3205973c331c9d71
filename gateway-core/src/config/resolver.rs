//! Configuration Resolver: given a `bridge_id`, produces a
//! flat `bridge_configurations` map covering every reachable connected
//! agent, with API keys decrypted and tool lists materialized.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::crypto;
use super::document_store::DocumentStore;
use super::types::{BridgeConfig, Service, ToolSpec, ToolTarget};
use crate::cache::DistributedCache;
use crate::error::GatewayError;
use crate::limits::check_bridge_api_folder_limits;

/// Caller-supplied overrides layered onto the resolved bridge.
#[derive(Clone, Debug, Default)]
pub struct ResolveOverrides {
    pub configuration: Option<Value>,
    pub extra_tools: Vec<ToolSpec>,
    pub doc_ids: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub primary_bridge_id: String,
    pub bridge_configurations: HashMap<String, BridgeConfig>,
}

impl ResolvedConfig {
    /// Invariant: a bridge with no connected agents resolves
    /// to a single-entry map.
    pub fn primary(&self) -> &BridgeConfig {
        &self.bridge_configurations[&self.primary_bridge_id]
    }
}

pub struct ConfigurationResolver {
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn DistributedCache>,
    encryption_key: Vec<u8>,
    encryption_iv_seed: Vec<u8>,
    built_in_keys: HashMap<String, String>,
}

impl ConfigurationResolver {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn DistributedCache>,
        encryption_key: Vec<u8>,
        encryption_iv_seed: Vec<u8>,
        built_in_keys: HashMap<String, String>,
    ) -> Self {
        ConfigurationResolver {
            store,
            cache,
            encryption_key,
            encryption_iv_seed,
            built_in_keys,
        }
    }

    pub async fn resolve(
        &self,
        bridge_id: &str,
        version_id: Option<&str>,
        overrides: ResolveOverrides,
    ) -> Result<ResolvedConfig, GatewayError> {
        let cache_key = format!("bridge_resolved_{}", version_id.unwrap_or(bridge_id));
        if let Some(cached) = self.cache.get(&cache_key).await? {
            if let Ok(resolved) = serde_json::from_str::<SerializedResolved>(&cached) {
                return Ok(resolved.into());
            }
        }

        let mut visited = HashSet::new();
        let mut bridge_configurations = HashMap::new();
        let primary_bridge_id = bridge_id.to_string();

        self.resolve_recursive(
            bridge_id,
            version_id,
            &overrides,
            &mut visited,
            &mut bridge_configurations,
            true,
        )
        .await?;

        let resolved = ResolvedConfig {
            primary_bridge_id,
            bridge_configurations,
        };

        let serialized = SerializedResolved::from(&resolved);
        if let Ok(json) = serde_json::to_string(&serialized) {
            let _ = self.cache.set(&cache_key, &json, 300).await;
        }

        Ok(resolved)
    }

    #[allow(clippy::too_many_arguments)]
    async fn resolve_recursive(
        &self,
        bridge_id: &str,
        version_id: Option<&str>,
        overrides: &ResolveOverrides,
        visited: &mut HashSet<String>,
        out: &mut HashMap<String, BridgeConfig>,
        is_primary: bool,
    ) -> Result<(), GatewayError> {
        // Visited-set DFS forbids cycles.
        if !visited.insert(bridge_id.to_string()) {
            return Ok(());
        }

        let mut cfg = self.store.get_bridge(bridge_id, version_id).await?;
        check_bridge_api_folder_limits(&cfg, &self.cache, &self.store).await?;

        if is_primary {
            if let Some(caller_config) = &overrides.configuration {
                merge_json_caller_wins(&mut cfg.configuration, caller_config);
            }
        }

        cfg.apikey = Some(self.resolve_apikey(&cfg)?);

        if is_primary {
            cfg.tools.extend(overrides.extra_tools.clone());
        }

        if cfg.service == Service::OpenaiCompletion {
            // already canonicalized by Service::canonicalize; nothing to do.
        }

        let connected = cfg.connected_agents.clone();
        out.insert(bridge_id.to_string(), cfg);

        for agent in connected.values() {
            Box::pin(self.resolve_recursive(
                &agent.bridge_id,
                agent.version_id.as_deref(),
                overrides,
                visited,
                out,
                false,
            ))
            .await?;
        }

        Ok(())
    }

    /// API key precedence: caller-provided > per-service
    /// bridge key > folder-level key > service defaults. Keys stored
    /// encrypted are decrypted here.
    fn resolve_apikey(&self, cfg: &BridgeConfig) -> Result<String, GatewayError> {
        if let Some(apikey) = &cfg.apikey {
            if !apikey.is_empty() {
                return self.maybe_decrypt(apikey);
            }
        }
        if let Some(builtin) = self.built_in_keys.get(cfg.service.as_str()) {
            return Ok(builtin.clone());
        }
        if cfg.model == "gpt-5-nano" {
            if let Some(builtin) = self.built_in_keys.get("openai_chatbot_nano") {
                return Ok(builtin.clone());
            }
        }
        Err(GatewayError::Validation(format!(
            "no api key resolvable for bridge {} service {}",
            cfg.bridge_id,
            cfg.service.as_str()
        )))
    }

    fn maybe_decrypt(&self, stored: &str) -> Result<String, GatewayError> {
        let Ok(raw) = BASE64.decode(stored) else {
            return Ok(stored.to_string());
        };
        match crypto::decrypt(&self.encryption_key, &raw) {
            Ok(plaintext) => Ok(String::from_utf8_lossy(&plaintext).to_string()),
            Err(_) => Ok(stored.to_string()),
        }
    }

    /// Encrypts a plaintext key for storage (used by bridge authoring, not
    /// the hot resolve path).
    pub fn encrypt_apikey(&self, plaintext: &str) -> String {
        let ciphertext = crypto::encrypt(&self.encryption_key, &self.encryption_iv_seed, plaintext.as_bytes());
        BASE64.encode(&ciphertext)
    }
}

/// Derives the effective `tool_choice` for a named-tool request, formatted
/// per provider.
pub fn derive_tool_choice(named: Option<&str>, service: Service) -> Value {
    let Some(name) = named else {
        return Value::String("auto".to_string());
    };
    match service {
        Service::Openai | Service::OpenaiCompletion => serde_json::json!({"type": "function", "name": name}),
        Service::Anthropic => serde_json::json!({"type": "tool", "name": name}),
        _ => Value::String(name.to_string()),
    }
}

/// Flattens connected agents, pre-tools, RAG, and built-ins into the final
/// `ToolSpec` list. Argument hydration from
/// `variables_path` happens later, at dispatch time.
pub fn build_tool_specs(cfg: &BridgeConfig, doc_ids_non_empty: bool) -> Vec<ToolSpec> {
    let mut specs = cfg.tools.clone();

    if doc_ids_non_empty && cfg.tool_id_and_name_mapping.values().any(|t| matches!(t, ToolTarget::Rag { .. })) {
        specs.push(ToolSpec {
            name: "get_knowledge_base_data".to_string(),
            description: "Query the bridge's knowledge base".to_string(),
            properties: serde_json::json!({
                "resource_id": {"type": "string"},
                "query": {"type": "string"},
            }),
            required: vec!["resource_id".to_string(), "query".to_string()],
            r#type: "function".to_string(),
        });
    }

    for name in &cfg.built_in_tools {
        if name == "web_search" {
            specs.push(crate::tools::builtin::web_search_tool_spec());
        } else if name == "web_crawl" {
            specs.push(crate::tools::builtin::web_crawl_tool_spec());
        }
    }

    for (name, agent) in &cfg.connected_agents {
        specs.push(ToolSpec {
            name: format!("{name}_query"),
            description: agent.description.clone(),
            properties: serde_json::json!({
                "action_type": {"type": "string", "enum": ["transfer"]},
                "agent_id": {"type": "string", "enum": [agent.bridge_id.clone()]},
                "_query": {"type": "string"},
            }),
            required: vec!["action_type".to_string(), "agent_id".to_string(), "_query".to_string()],
            r#type: "function".to_string(),
        });
    }

    specs
}

fn merge_json_caller_wins(base: &mut Value, caller: &Value) {
    if let (Value::Object(base_map), Value::Object(caller_map)) = (base.clone(), caller) {
        let mut merged = base_map;
        for (k, v) in caller_map {
            merged.insert(k.clone(), v.clone());
        }
        *base = Value::Object(merged);
    } else {
        *base = caller.clone();
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct SerializedResolved {
    primary_bridge_id: String,
    bridge_configurations: HashMap<String, BridgeConfig>,
}

impl From<&ResolvedConfig> for SerializedResolved {
    fn from(r: &ResolvedConfig) -> Self {
        SerializedResolved {
            primary_bridge_id: r.primary_bridge_id.clone(),
            bridge_configurations: r.bridge_configurations.clone(),
        }
    }
}

impl From<SerializedResolved> for ResolvedConfig {
    fn from(s: SerializedResolved) -> Self {
        ResolvedConfig {
            primary_bridge_id: s.primary_bridge_id,
            bridge_configurations: s.bridge_configurations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryCache, InMemoryDocumentStore};

    fn resolver(store: Arc<InMemoryDocumentStore>) -> ConfigurationResolver {
        ConfigurationResolver::new(
            store,
            Arc::new(InMemoryCache::default()),
            b"test-encryption-key-32-bytes-ok".to_vec(),
            b"iv-seed".to_vec(),
            HashMap::new(),
        )
    }

    #[tokio::test]
    async fn no_connected_agents_resolves_to_single_entry_map() {
        let store = Arc::new(InMemoryDocumentStore::with_simple_bridge("b1"));
        let r = resolver(store);
        let resolved = r.resolve("b1", None, ResolveOverrides::default()).await.unwrap();
        assert_eq!(resolved.bridge_configurations.len(), 1);
        assert!(resolved.bridge_configurations.contains_key("b1"));
    }

    #[tokio::test]
    async fn connected_agent_cycle_does_not_infinite_loop() {
        let store = Arc::new(InMemoryDocumentStore::with_cycle("a", "b"));
        let r = resolver(store);
        let resolved = r.resolve("a", None, ResolveOverrides::default()).await.unwrap();
        assert_eq!(resolved.bridge_configurations.len(), 2);
    }

    #[test]
    fn tool_choice_formats_per_provider() {
        assert_eq!(
            derive_tool_choice(Some("refund"), Service::Openai),
            serde_json::json!({"type": "function", "name": "refund"})
        );
        assert_eq!(
            derive_tool_choice(Some("refund"), Service::Anthropic),
            serde_json::json!({"type": "tool", "name": "refund"})
        );
        assert_eq!(
            derive_tool_choice(Some("refund"), Service::Groq),
            Value::String("refund".to_string())
        );
        assert_eq!(derive_tool_choice(None, Service::Openai), Value::String("auto".to_string()));
    }
}
