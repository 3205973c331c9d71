//! Request Context & History: the per-turn persistence shape and the
//! `ConversationStore` port it's written through.

pub mod alert;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::engine::latency::LatencyBreakdown;
use crate::error::GatewayError;
use crate::limits::TokenCounts;

/// One persisted agent turn. Written once per
/// bridge in a non-orchestrator transfer chain, or once for the sole bridge
/// in a non-transferring turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub message_id: String,
    pub org_id: String,
    pub bridge_id: String,
    pub version_id: Option<String>,
    pub thread_id: String,
    pub sub_thread_id: String,
    pub role: String,
    pub content: String,
    pub tools_data: Value,
    pub finish_reason: String,
    pub total_cost: f64,
    pub latency: LatencyBreakdown,
    pub parent_id: Option<String>,
    pub child_id: Option<String>,
    pub tokens: TokenCounts,
    /// Effective per-provider params this turn actually dispatched with
    /// (post-sentinel-resolution, post-normalization).
    pub ai_config: Value,
    pub variables: HashMap<String, Value>,
    pub user_urls: Vec<String>,
    pub llm_urls: Vec<String>,
    pub status: String,
    pub fallback_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_attempt_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_model: Option<String>,
}

/// One aggregated row covering an entire transfer chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrchestratorTurn {
    pub transfer_request_id: String,
    pub org_id: String,
    pub primary_bridge_id: String,
    pub thread_id: String,
    pub sub_thread_id: String,
    pub hops: Vec<super::transfer::TransferHop>,
    pub final_content: String,
    pub total_cost: f64,
}

/// Persistence port for conversation history.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn write_turn(&self, turn: ConversationTurn) -> Result<(), GatewayError>;
    async fn write_orchestrator_turn(&self, turn: OrchestratorTurn) -> Result<(), GatewayError>;

    /// Last `limit` successful turns for (org,thread,sub_thread,bridge),
    /// newest last.
    async fn recent_turns(
        &self,
        org_id: &str,
        bridge_id: &str,
        thread_id: &str,
        sub_thread_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, GatewayError>;
}
