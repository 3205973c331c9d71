//! Execution Engine: the per-turn lifecycle
//! `INIT → GUARDRAILS_OK → PROMPT_READY → DISPATCHING → TOOL_LOOP →
//! (TRANSFER | COMPLETE | FAILED)`, orchestrating every other module.

pub mod delivery;
pub mod fallback;
pub mod guardrails;
pub mod latency;
pub mod media;
pub mod response;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::cache::{conversation_cache_key, DistributedCache};
use crate::config::document_store::DocumentStore;
use crate::config::resolver::{ConfigurationResolver, ResolveOverrides};
use crate::config::types::{BridgeConfig, Service, ToolTarget};
use crate::context::alert::{dispatch_filtered, AlertEvent, AlertSink, AlertType};
use crate::context::{ConversationStore, ConversationTurn};
use crate::error::GatewayError;
use crate::limits::{compute_total_cost, rate_limit, update_cost};
use crate::normalizer::{self, CallType};
use crate::provider::{ChatMessage, ChatOutcome, ChatRequest as ProviderChatRequest, ProviderRegistry, ProviderTranscript};
use crate::tools::ToolInvoker;
use crate::transfer::{self, ThreadInfo, TransferHistory, TransferHop};
use gateway_protocol::{ChatRequest as WireChatRequest, ChatResponse};

const DEFAULT_TOOL_CALL_COUNT: u32 = 3;

/// The bridge a turn finally settled on — may differ from the primary bridge
/// after a transfer chain, and is what pricing and persistence key off.
struct FinalTurn {
    bridge_id: String,
    org_id: String,
    service: Service,
    model: String,
    version_id: Option<String>,
    configuration: serde_json::Value,
}

/// Pushes a shaped response through a non-default response channel. The concrete RTLayer/webhook wire
/// format is an opaque external collaborator.
#[async_trait]
pub trait ResponseChannel: Send + Sync {
    async fn push(&self, format: &gateway_protocol::ResponseFormat, response: &ChatResponse) -> Result<(), GatewayError>;
}

pub struct GatewayEngine {
    resolver: Arc<ConfigurationResolver>,
    cache: Arc<dyn DistributedCache>,
    store: Arc<dyn DocumentStore>,
    providers: Arc<ProviderRegistry>,
    tool_invoker: Arc<ToolInvoker>,
    conversation_store: Arc<dyn ConversationStore>,
    response_channel: Arc<dyn ResponseChannel>,
    alert_sink: Arc<dyn AlertSink>,
    subscribed_alerts: Vec<AlertType>,
}

impl GatewayEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: Arc<ConfigurationResolver>,
        cache: Arc<dyn DistributedCache>,
        store: Arc<dyn DocumentStore>,
        providers: Arc<ProviderRegistry>,
        tool_invoker: Arc<ToolInvoker>,
        conversation_store: Arc<dyn ConversationStore>,
        response_channel: Arc<dyn ResponseChannel>,
        alert_sink: Arc<dyn AlertSink>,
        subscribed_alerts: Vec<AlertType>,
    ) -> Self {
        GatewayEngine {
            resolver,
            cache,
            store,
            providers,
            tool_invoker,
            conversation_store,
            response_channel,
            alert_sink,
            subscribed_alerts,
        }
    }

    /// Runs one full turn and returns the caller-facing envelope. For a non-default `response_format` this both pushes the
    /// shaped response and returns the deferred ack.
    pub async fn run_turn(&self, req: WireChatRequest) -> Result<ChatResponse, GatewayError> {
        if let Some(thread_id) = &req.thread_id {
            if !rate_limit::thread_allowed(&self.cache, thread_id).await? {
                return Err(GatewayError::Validation("thread rate limit exceeded".to_string()));
            }
        }
        if !rate_limit::bridge_allowed(&self.cache, &req.bridge_id).await? {
            return Err(GatewayError::Validation("bridge rate limit exceeded".to_string()));
        }

        let overrides = ResolveOverrides {
            configuration: (!req.configuration.is_null()).then(|| req.configuration.clone()),
            extra_tools: req
                .extra_tools
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect(),
            doc_ids: Vec::new(),
        };
        let resolved = self.resolver.resolve(&req.bridge_id, req.version_id.as_deref(), overrides).await?;
        let primary = resolved.primary().clone();
        let named_tool_choice = req.tool_choice.clone();

        let thread_id = req.thread_id.clone().unwrap_or_default();
        let sub_thread_id = req.sub_thread_id.clone().unwrap_or_default();
        let mut tracker = latency::LatencyTracker::start();

        // Step 1: guardrails.
        if primary.guardrails.is_enabled {
            let guardrails_adapter = self.providers.get("openai")?;
            let guardrails_key = primary.apikey.clone().unwrap_or_default();
            let user_text = req.user.clone().unwrap_or_default();
            let started = Instant::now();
            let verdict = guardrails::check(&guardrails_adapter, &guardrails_key, &primary.guardrails, &user_text).await;
            tracker.record_function("guardrails", started.elapsed().as_millis() as u64);
            if !verdict.is_safe {
                dispatch_filtered(
                    self.alert_sink.as_ref(),
                    &self.subscribed_alerts,
                    AlertEvent {
                        alert_type: AlertType::GuardrailsBlocked,
                        bridge_id: primary.bridge_id.clone(),
                        message_id: None,
                        detail: serde_json::json!({"reason": verdict.reason, "violations": verdict.violations}),
                    },
                )
                .await?;
                let (data, usage) = response::blocked_by_guardrails(&primary.model, &verdict.reason);
                let chat_response = ChatResponse::synchronous(data, usage);
                return self.deliver(&req, chat_response).await;
            }
        }

        // Step 2: inject current_time_date_and_current_identifier.
        let mut variables = req.variables.clone();
        variables.entry("current_time_date_and_current_identifier".to_string()).or_insert_with(|| {
            serde_json::Value::String(Uuid::new_v4().to_string())
        });

        // Step 3: pre_tools.
        if let Some(pre_tool) = primary.pre_tools.clone() {
            let started = Instant::now();
            let result = self.run_pre_tool(&primary, &pre_tool, &variables).await;
            tracker.record_function("pre_tools", started.elapsed().as_millis() as u64);
            variables.insert("pre_function".to_string(), serde_json::Value::String(result));
        }

        // Step 4: hydrate conversation (cache, else persistence store).
        let transcript = self.hydrate_conversation(&primary, &thread_id, &sub_thread_id).await?;

        let mut history = TransferHistory::with_orchestrator_flag(req.orchestrator_flag);
        let mut per_hop_turns = Vec::new();

        let outcome = self
            .run_bridge(
                &primary,
                &variables,
                transcript,
                &mut history,
                &mut per_hop_turns,
                &thread_id,
                &sub_thread_id,
                0,
                named_tool_choice.as_deref(),
                &mut tracker,
            )
            .await;

        let (final_turn, outcome, fallback_used, first_attempt_error) = match outcome {
            Ok((final_turn, outcome)) => (final_turn, outcome, false, None),
            Err(first_err) => {
                // Step 10: fallback retry.
                let Some(plan) = fallback::plan(&primary, &primary.fall_back) else {
                    return Err(first_err);
                };
                dispatch_filtered(
                    self.alert_sink.as_ref(),
                    &self.subscribed_alerts,
                    AlertEvent {
                        alert_type: AlertType::FallbackRetry,
                        bridge_id: primary.bridge_id.clone(),
                        message_id: None,
                        detail: serde_json::json!({"first_attempt_error": first_err.to_string()}),
                    },
                )
                .await?;

                let mut retry_cfg = primary.clone();
                retry_cfg.service = plan.service;
                retry_cfg.model = plan.model;
                if let Some(key) = plan.apikey {
                    retry_cfg.apikey = Some(key);
                }
                let retry_transcript = self.hydrate_conversation(&retry_cfg, &thread_id, &sub_thread_id).await?;
                match self
                    .run_bridge(
                        &retry_cfg,
                        &variables,
                        retry_transcript,
                        &mut history,
                        &mut per_hop_turns,
                        &thread_id,
                        &sub_thread_id,
                        0,
                        named_tool_choice.as_deref(),
                        &mut tracker,
                    )
                    .await
                {
                    Ok((final_turn, outcome)) => (
                        final_turn,
                        outcome,
                        true,
                        Some(fallback::combine_errors(&first_err.to_string(), "recovered on fallback")),
                    ),
                    Err(second_err) => {
                        return Err(GatewayError::Upstream {
                            service: primary.service.as_str().to_string(),
                            message: fallback::combine_errors(&first_err.to_string(), &second_err.to_string()),
                        });
                    }
                }
            }
        };

        let tokens = response::token_counts(&outcome.usage);
        let model_config = self.store.get_model_config(final_turn.service.as_str(), &final_turn.model).await?;
        let total_cost = compute_total_cost(tokens, &model_config);
        update_cost(&primary, total_cost, &self.cache).await?;

        let last_hop_message_id = per_hop_turns.last().map(|t| t.message_id.clone());
        if !history.hops.is_empty() {
            transfer::persist_chain(
                &self.conversation_store,
                &history,
                std::mem::take(&mut per_hop_turns),
                history.orchestrator_flag,
                &primary.org_id,
                &primary.bridge_id,
                &outcome.content,
            )
            .await?;
        }

        let user_urls: Vec<String> = req.user_urls.iter().map(|u| u.url.clone()).collect();
        let fallback_model = fallback_used.then(|| final_turn.model.clone());
        let (data, usage) = response::shape(
            &outcome,
            &final_turn.model,
            serde_json::Value::Null,
            None,
            fallback_used,
            first_attempt_error.clone(),
            total_cost,
        );
        let turn_latency = tracker.finish();
        let llm_urls = data.images.clone().unwrap_or_default();

        self.conversation_store
            .write_turn(ConversationTurn {
                message_id: data.message_id.clone(),
                org_id: final_turn.org_id.clone(),
                bridge_id: final_turn.bridge_id.clone(),
                version_id: final_turn.version_id.clone(),
                thread_id: thread_id.clone(),
                sub_thread_id: sub_thread_id.clone(),
                role: "assistant".to_string(),
                content: data.content.clone(),
                tools_data: data.tools_data.clone(),
                finish_reason: format!("{:?}", data.finish_reason),
                total_cost,
                latency: turn_latency,
                parent_id: last_hop_message_id,
                child_id: None,
                tokens,
                ai_config: final_turn.configuration.clone(),
                variables: variables.clone(),
                user_urls,
                llm_urls,
                status: "success".to_string(),
                fallback_used,
                first_attempt_error,
                fallback_model,
            })
            .await?;

        let chat_response = ChatResponse::synchronous(data, usage);
        self.deliver(&req, chat_response).await
    }

    /// Push-or-return: a non-default `response_format`
    /// gets the shaped response pushed through [`ResponseChannel`] and the
    /// caller receives only an ack.
    async fn deliver(&self, req: &WireChatRequest, response: ChatResponse) -> Result<ChatResponse, GatewayError> {
        if req.response_format.is_async_channel() {
            self.response_channel.push(&req.response_format, &response).await?;
            return Ok(ChatResponse::deferred_ack());
        }
        Ok(response)
    }

    async fn run_pre_tool(&self, cfg: &BridgeConfig, pre_tool: &crate::config::types::ToolSpec, variables: &HashMap<String, serde_json::Value>) -> String {
        let Some(ToolTarget::Http { url }) = cfg.tool_id_and_name_mapping.get(&pre_tool.name) else {
            return "Error: pre_tool has no bound http target".to_string();
        };
        match crate::tools::http_tool::invoke(&self.tool_invoker.http_client, url, &serde_json::json!(variables)).await {
            Ok(result) => result,
            Err(e) => format!("Error {e}"),
        }
    }

    async fn hydrate_conversation(
        &self,
        cfg: &BridgeConfig,
        thread_id: &str,
        sub_thread_id: &str,
    ) -> Result<ProviderTranscript, GatewayError> {
        let version_id = cfg.version_id.as_deref().unwrap_or(&cfg.bridge_id);
        let key = conversation_cache_key(version_id, thread_id, sub_thread_id);

        if let Some(raw) = self.cache.get(&key).await? {
            if let Ok(turns) = serde_json::from_str::<Vec<ConversationTurn>>(&raw) {
                return Ok(turns_to_transcript(&turns));
            }
        }

        let turns = self
            .conversation_store
            .recent_turns(&cfg.org_id, &cfg.bridge_id, thread_id, sub_thread_id, 3)
            .await?;
        Ok(turns_to_transcript(&turns))
    }

    /// Runs steps 5-9 for one bridge, recursing on the tool loop and
    /// following a transfer chain to completion.
    #[allow(clippy::too_many_arguments)]
    async fn run_bridge(
        &self,
        cfg: &BridgeConfig,
        variables: &HashMap<String, serde_json::Value>,
        mut transcript: ProviderTranscript,
        history: &mut TransferHistory,
        per_hop_turns: &mut Vec<ConversationTurn>,
        thread_id: &str,
        sub_thread_id: &str,
        depth: u32,
        named_tool_choice: Option<&str>,
        tracker: &mut latency::LatencyTracker,
    ) -> Result<(FinalTurn, ChatOutcome), GatewayError> {
        let flat = normalizer::flatten_variables(variables);
        let mut rendered = normalizer::render(cfg.prompt(), &flat, &cfg.variables_state);
        if !rendered.missing.is_empty() {
            dispatch_filtered(
                self.alert_sink.as_ref(),
                &self.subscribed_alerts,
                AlertEvent {
                    alert_type: AlertType::MissingVariables,
                    bridge_id: cfg.bridge_id.clone(),
                    message_id: None,
                    detail: serde_json::json!({"missing": rendered.missing}),
                },
            )
            .await?;
        }

        // Step 9: optional prompt wrapper — renders `template` with
        // `{prompt, ...variables}`, overriding the prompt render above.
        if let Some(wrapper_id) = &cfg.wrapper_id {
            let template = self.store.get_wrapper_template(wrapper_id).await?;
            let mut wrap_flat = flat.clone();
            wrap_flat.insert("prompt".to_string(), rendered.rendered.clone());
            let wrapped = normalizer::render(&template, &wrap_flat, &cfg.variables_state);
            rendered.rendered = wrapped.rendered;
        }

        transcript.push(ChatMessage::User { content: rendered.rendered, attachments: vec![] });

        self.dispatch_with_tool_loop(cfg, transcript, history, per_hop_turns, thread_id, sub_thread_id, depth, named_tool_choice, tracker)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch_with_tool_loop<'a>(
        &'a self,
        cfg: &'a BridgeConfig,
        transcript: ProviderTranscript,
        history: &'a mut TransferHistory,
        per_hop_turns: &'a mut Vec<ConversationTurn>,
        thread_id: &'a str,
        sub_thread_id: &'a str,
        depth: u32,
        named_tool_choice: Option<&'a str>,
        tracker: &'a mut latency::LatencyTracker,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(FinalTurn, ChatOutcome), GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            let adapter = self.providers.get(cfg.service.as_str())?;
            let model_config = self.store.get_model_config(cfg.service.as_str(), &cfg.model).await?;

            let mut params = serde_json::Map::new();
            if let Some(obj) = cfg.configuration.as_object() {
                for (k, v) in obj {
                    if k == "prompt" {
                        continue;
                    }
                    params.insert(k.clone(), normalizer::resolve_sentinel(k, v, cfg.service, &model_config));
                }
            }
            let doc_ids_non_empty = cfg.tool_id_and_name_mapping.values().any(|t| matches!(t, ToolTarget::Rag { .. }));
            let tool_specs = crate::config::resolver::build_tool_specs(cfg, doc_ids_non_empty);
            let has_tools = !tool_specs.is_empty();
            let normalized_params = normalizer::normalize(&params, cfg.service, CallType::Default, has_tools);
            let tool_choice = if depth == 0 {
                crate::config::resolver::derive_tool_choice(named_tool_choice, cfg.service)
            } else {
                serde_json::Value::String("auto".to_string())
            };

            let request = ProviderChatRequest {
                model: cfg.model.clone(),
                system_prompt: None,
                transcript: transcript.clone(),
                tools: tool_specs,
                tool_choice,
                params: normalized_params,
                api_key: cfg.apikey.clone().unwrap_or_default(),
                base_url: None,
            };

            let started = Instant::now();
            let outcome = adapter.chat(request).await?;
            tracker.record_model_call(started.elapsed().as_millis() as u64);

            let final_turn = FinalTurn {
                bridge_id: cfg.bridge_id.clone(),
                org_id: cfg.org_id.clone(),
                service: cfg.service,
                model: cfg.model.clone(),
                version_id: cfg.version_id.clone(),
                configuration: cfg.configuration.clone(),
            };

            let tool_call_count = if cfg.tool_call_count == 0 { DEFAULT_TOOL_CALL_COUNT } else { cfg.tool_call_count };
            if outcome.tool_calls.is_empty() || depth >= tool_call_count {
                return Ok((final_turn, outcome));
            }

            // Step 8b: transfer check before any tool executes.
            if let Some(transfer_req) = transfer::detect_transfer(&outcome.tool_calls) {
                return self
                    .follow_transfer(cfg, &outcome, transfer_req, history, per_hop_turns, thread_id, sub_thread_id, depth, tracker)
                    .await;
            }

            // Steps 8c-8d: hydrate args, execute tools in parallel.
            let tool_started = Instant::now();
            let results = self.tool_invoker.invoke_all(cfg, &outcome.tool_calls, &HashMap::new()).await;
            tracker.record_function("tool_invoke", tool_started.elapsed().as_millis() as u64);

            let mut next_transcript = transcript;
            adapter.merge_tool_results(&mut next_transcript, &outcome.tool_calls, &results);

            self.dispatch_with_tool_loop(cfg, next_transcript, history, per_hop_turns, thread_id, sub_thread_id, depth + 1, named_tool_choice, tracker)
                .await
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn follow_transfer(
        &self,
        cfg: &BridgeConfig,
        outcome: &ChatOutcome,
        transfer_req: transfer::TransferRequest,
        history: &mut TransferHistory,
        per_hop_turns: &mut Vec<ConversationTurn>,
        thread_id: &str,
        sub_thread_id: &str,
        depth: u32,
        tracker: &mut latency::LatencyTracker,
    ) -> Result<(FinalTurn, ChatOutcome), GatewayError> {
        let Some(target) = cfg.connected_agents.get(&transfer_req.target_bridge_id).cloned().or_else(|| {
            cfg.connected_agents.values().find(|a| a.bridge_id == transfer_req.target_bridge_id).cloned()
        }) else {
            return Err(GatewayError::Validation(format!("transfer target {} not in bridge_configurations", transfer_req.target_bridge_id)));
        };

        let hop_content = if outcome.content.trim().is_empty() {
            transfer::transfer_placeholder_content(&target.bridge_id)
        } else {
            outcome.content.clone()
        };

        let parent_id = per_hop_turns.last().map(|t| t.message_id.clone());
        let message_id = Uuid::new_v4().to_string();

        history.push(TransferHop {
            bridge_id: cfg.bridge_id.clone(),
            history_params: serde_json::json!({}),
            dataset: serde_json::json!({}),
            version_id: cfg.version_id.clone(),
            thread_info: ThreadInfo { thread_id: thread_id.to_string(), sub_thread_id: sub_thread_id.to_string() },
            parent_id: parent_id.clone(),
        });
        per_hop_turns.push(ConversationTurn {
            message_id,
            org_id: cfg.org_id.clone(),
            bridge_id: cfg.bridge_id.clone(),
            version_id: cfg.version_id.clone(),
            thread_id: thread_id.to_string(),
            sub_thread_id: sub_thread_id.to_string(),
            role: "assistant".to_string(),
            content: hop_content,
            tools_data: serde_json::Value::Null,
            finish_reason: "tool_call".to_string(),
            total_cost: 0.0,
            latency: latency::LatencyBreakdown::default(),
            parent_id,
            child_id: Some(target.bridge_id.clone()),
            tokens: crate::limits::TokenCounts::default(),
            ai_config: cfg.configuration.clone(),
            variables: HashMap::new(),
            user_urls: Vec::new(),
            llm_urls: Vec::new(),
            status: "transferred".to_string(),
            fallback_used: false,
            first_attempt_error: None,
            fallback_model: None,
        });

        let target_cfg = self.store.get_bridge(&target.bridge_id, target.version_id.as_deref()).await?;
        let mut target_variables: HashMap<String, serde_json::Value> = target.agent_variables.clone();
        target_variables.insert("_query".to_string(), serde_json::Value::String(transfer_req.user_query));

        let (final_turn, final_outcome) = self
            .run_bridge(&target_cfg, &target_variables, Vec::new(), history, per_hop_turns, thread_id, sub_thread_id, depth, None, tracker)
            .await?;

        transfer::pin_last_transferred_agent(&self.cache, &cfg.bridge_id, thread_id, sub_thread_id, &final_turn.bridge_id).await?;

        Ok((final_turn, final_outcome))
    }
}

fn turns_to_transcript(turns: &[ConversationTurn]) -> ProviderTranscript {
    turns
        .iter()
        .map(|t| ChatMessage::Assistant { content: t.content.clone(), tool_calls: vec![] })
        .collect()
}

#[async_trait]
impl crate::queue::EngineEntrypoint for GatewayEngine {
    async fn run_turn(&self, request: WireChatRequest) -> Result<(), GatewayError> {
        GatewayEngine::run_turn(self, request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        InMemoryAlertSink, InMemoryCache, InMemoryConversationStore, InMemoryDocumentStore, InMemoryResponseChannel, StaticChatAdapter,
    };

    fn make_engine(adapter: Arc<StaticChatAdapter>, store: Arc<InMemoryDocumentStore>) -> GatewayEngine {
        make_engine_with_conversation_store(adapter, store, Arc::new(InMemoryConversationStore::default()))
    }

    fn make_engine_with_conversation_store(
        adapter: Arc<dyn crate::provider::ProviderAdapter>,
        store: Arc<InMemoryDocumentStore>,
        conversation_store: Arc<InMemoryConversationStore>,
    ) -> GatewayEngine {
        let cache: Arc<dyn DistributedCache> = Arc::new(InMemoryCache::default());
        let mut registry = ProviderRegistry::new();
        registry.register(adapter);
        let resolver = Arc::new(ConfigurationResolver::new(
            store.clone(),
            cache.clone(),
            b"test-encryption-key-32-bytes-ok".to_vec(),
            b"iv-seed".to_vec(),
            HashMap::new(),
        ));
        let tool_invoker = Arc::new(ToolInvoker::new(reqwest::Client::new(), None, None));
        GatewayEngine::new(
            resolver,
            cache,
            store,
            Arc::new(registry),
            tool_invoker,
            conversation_store,
            Arc::new(InMemoryResponseChannel::default()),
            Arc::new(InMemoryAlertSink::default()),
            vec![AlertType::GuardrailsBlocked, AlertType::MissingVariables],
        )
    }

    fn wire_request(bridge_id: &str) -> WireChatRequest {
        WireChatRequest {
            bridge_id: bridge_id.to_string(),
            version_id: None,
            org_id: None,
            user: Some("hello".to_string()),
            tool_choice: None,
            configuration: serde_json::Value::Null,
            variables: HashMap::new(),
            thread_id: Some("t1".to_string()),
            sub_thread_id: Some("s1".to_string()),
            response_format: gateway_protocol::ResponseFormat::Default,
            fall_back: None,
            guardrails: None,
            tool_call_count: None,
            orchestrator_flag: false,
            user_urls: vec![],
            extra_tools: vec![],
            built_in_tools: vec![],
            web_search_filters: vec![],
        }
    }

    #[tokio::test]
    async fn a_plain_turn_completes_and_writes_a_conversation_row() {
        let adapter = Arc::new(StaticChatAdapter::new("openai", "hi there", vec![]));
        let store = Arc::new(InMemoryDocumentStore::with_simple_bridge("b1"));
        let engine = make_engine(adapter, store);

        let response = engine.run_turn(wire_request("b1")).await.unwrap();
        assert!(response.success);
        assert_eq!(response.response.unwrap().data.content, "hi there");
    }

    /// Returns a transfer tool call on its first two invocations (a -> b,
    /// b -> c), then a plain answer — simulates a 3-hop transfer chain on a
    /// single shared adapter instance.
    struct ChainAdapter {
        calls: std::sync::Mutex<u32>,
    }

    impl ChainAdapter {
        fn new() -> Self {
            ChainAdapter { calls: std::sync::Mutex::new(0) }
        }
    }

    #[async_trait]
    impl crate::provider::ProviderAdapter for ChainAdapter {
        fn name(&self) -> &'static str {
            "openai"
        }

        async fn chat(&self, _req: crate::provider::ChatRequest) -> Result<ChatOutcome, GatewayError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            let call = *calls;
            drop(calls);

            let transfer_call = |target: &str| crate::provider::DetectedToolCall {
                call_id: format!("call-{target}"),
                name: format!("{target}_query"),
                arguments: serde_json::json!({"action_type": "transfer", "agent_id": target, "_query": "help"}),
            };

            Ok(match call {
                1 => ChatOutcome {
                    content: String::new(),
                    raw: crate::provider::RawModelResponse(serde_json::Value::Null),
                    tool_calls: vec![transfer_call("b")],
                    usage: crate::provider::ProviderUsage { input_tokens: 10, output_tokens: 5, ..Default::default() },
                    finish_reason_raw: "tool_calls".to_string(),
                },
                2 => ChatOutcome {
                    content: String::new(),
                    raw: crate::provider::RawModelResponse(serde_json::Value::Null),
                    tool_calls: vec![transfer_call("c")],
                    usage: crate::provider::ProviderUsage { input_tokens: 8, output_tokens: 4, ..Default::default() },
                    finish_reason_raw: "tool_calls".to_string(),
                },
                _ => ChatOutcome {
                    content: "final answer".to_string(),
                    raw: crate::provider::RawModelResponse(serde_json::Value::Null),
                    tool_calls: vec![],
                    usage: crate::provider::ProviderUsage { input_tokens: 6, output_tokens: 3, ..Default::default() },
                    finish_reason_raw: "stop".to_string(),
                },
            })
        }

        fn detect_tool_calls(&self, _raw: &crate::provider::RawModelResponse) -> Vec<crate::provider::DetectedToolCall> {
            Vec::new()
        }

        fn merge_tool_results(
            &self,
            _transcript: &mut ProviderTranscript,
            _tool_calls: &[crate::provider::DetectedToolCall],
            _results: &[crate::provider::ToolExecutionResult],
        ) {
        }
    }

    #[tokio::test]
    async fn multi_hop_transfer_chain_persists_each_hop_exactly_once() {
        let adapter = Arc::new(ChainAdapter::new());
        let store = Arc::new(InMemoryDocumentStore::with_chain("a", "b", "c"));
        let conversation_store = Arc::new(InMemoryConversationStore::default());
        let engine = make_engine_with_conversation_store(adapter, store, conversation_store.clone());

        let response = engine.run_turn(wire_request("a")).await.unwrap();
        assert!(response.success);
        assert_eq!(response.response.unwrap().data.content, "final answer");

        let turns = conversation_store.all_turns();
        // One row per hop (a, b) plus the final settled turn on c — no
        // duplicate rows from persist_chain running once per stack frame.
        assert_eq!(turns.len(), 3);

        let hop_a = turns.iter().find(|t| t.bridge_id == "a").unwrap();
        let hop_b = turns.iter().find(|t| t.bridge_id == "b").unwrap();
        let final_turn = turns.iter().find(|t| t.bridge_id == "c").unwrap();

        assert!(hop_a.parent_id.is_none());
        assert_eq!(hop_b.parent_id.as_deref(), Some(hop_a.message_id.as_str()));
        assert_eq!(final_turn.parent_id.as_deref(), Some(hop_b.message_id.as_str()));
        assert!(final_turn.total_cost > 0.0);
    }
}
