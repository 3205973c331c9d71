//! Transfer Orchestrator: on a `transfer` tool call, the
//! current bridge commits its history and cost immediately, then the engine
//! recurses into the target bridge. `TransferHistory` is threaded through
//! the call stack as an explicit parameter, never a global.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::{last_transferred_agent_key, DistributedCache, LAST_TRANSFERRED_AGENT_TTL_SECS};
use crate::context::{ConversationStore, ConversationTurn, OrchestratorTurn};
use crate::error::GatewayError;

pub const EMPTY_TRANSFER_CONTENT_TEMPLATE: &str = "Query is successfully transferred to agent";

/// One bridge hop in a transfer chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferHop {
    pub bridge_id: String,
    pub history_params: serde_json::Value,
    pub dataset: serde_json::Value,
    pub version_id: Option<String>,
    pub thread_info: ThreadInfo,
    pub parent_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub thread_id: String,
    pub sub_thread_id: String,
}

/// A request that hands the conversation to `target_bridge_id` instead of
/// executing tools.
#[derive(Clone, Debug)]
pub struct TransferRequest {
    pub target_bridge_id: String,
    pub user_query: String,
    pub tool_name: String,
}

/// Detects a transfer intent among tool calls: `args.action_type=="transfer"`,
/// extracting the target bridge id from `args.agent_id` and the handoff text
/// from `args._query`.
pub fn detect_transfer(calls: &[crate::provider::DetectedToolCall]) -> Option<TransferRequest> {
    calls.iter().find_map(|call| {
        let action_type = call.arguments.get("action_type")?.as_str()?;
        if action_type != "transfer" {
            return None;
        }
        let target_bridge_id = call.arguments.get("agent_id")?.as_str()?.to_string();
        let user_query = call.arguments.get("_query").and_then(|v| v.as_str()).unwrap_or("").to_string();
        Some(TransferRequest { target_bridge_id, user_query, tool_name: call.name.clone() })
    })
}

/// Threaded through the recursive engine calls of one transfer chain.
#[derive(Clone, Debug, Default)]
pub struct TransferHistory {
    pub transfer_request_id: String,
    pub hops: Vec<TransferHop>,
    pub orchestrator_flag: bool,
}

impl TransferHistory {
    pub fn new() -> Self {
        TransferHistory { transfer_request_id: Uuid::new_v4().to_string(), hops: Vec::new(), orchestrator_flag: false }
    }

    pub fn with_orchestrator_flag(orchestrator_flag: bool) -> Self {
        TransferHistory { orchestrator_flag, ..Self::new() }
    }

    pub fn push(&mut self, hop: TransferHop) {
        self.hops.push(hop);
    }
}

/// Empty assistant content from a transfer hop is replaced with this
/// message.
pub fn transfer_placeholder_content(target_agent_name: &str) -> String {
    format!("{EMPTY_TRANSFER_CONTENT_TEMPLATE} {target_agent_name}")
}

/// Persists the chain once it terminates non-transferring: either one
/// aggregated `OrchestratorTurn` (`orchestrator_flag`) or one row per hop
/// with `parent_id`/`child_id` linked in chain order.
pub async fn persist_chain(
    store: &Arc<dyn ConversationStore>,
    history: &TransferHistory,
    per_hop_turns: Vec<ConversationTurn>,
    orchestrator_flag: bool,
    org_id: &str,
    primary_bridge_id: &str,
    final_content: &str,
) -> Result<(), GatewayError> {
    if orchestrator_flag {
        let thread_info = history
            .hops
            .first()
            .map(|h| h.thread_info.clone())
            .unwrap_or(ThreadInfo { thread_id: String::new(), sub_thread_id: String::new() });
        let total_cost = per_hop_turns.iter().map(|t| t.total_cost).sum();
        store
            .write_orchestrator_turn(OrchestratorTurn {
                transfer_request_id: history.transfer_request_id.clone(),
                org_id: org_id.to_string(),
                primary_bridge_id: primary_bridge_id.to_string(),
                thread_id: thread_info.thread_id,
                sub_thread_id: thread_info.sub_thread_id,
                hops: history.hops.clone(),
                final_content: final_content.to_string(),
                total_cost,
            })
            .await
    } else {
        for turn in per_hop_turns {
            store.write_turn(turn).await?;
        }
        Ok(())
    }
}

/// Pins the final assistant bridge id under the sticky key for 3 days:
/// subsequent requests in the same thread start there.
pub async fn pin_last_transferred_agent(
    cache: &Arc<dyn DistributedCache>,
    primary_bridge_id: &str,
    thread_id: &str,
    sub_thread_id: &str,
    final_bridge_id: &str,
) -> Result<(), GatewayError> {
    let key = last_transferred_agent_key(primary_bridge_id, thread_id, sub_thread_id);
    cache.set(&key, final_bridge_id, LAST_TRANSFERRED_AGENT_TTL_SECS).await
}

/// Reads the sticky key so a new request in the same thread can resume at
/// the previously pinned agent rather than the primary bridge.
pub async fn resume_bridge_id(
    cache: &Arc<dyn DistributedCache>,
    primary_bridge_id: &str,
    thread_id: &str,
    sub_thread_id: &str,
) -> Result<Option<String>, GatewayError> {
    let key = last_transferred_agent_key(primary_bridge_id, thread_id, sub_thread_id);
    cache.get(&key).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DetectedToolCall;
    use serde_json::json;

    #[test]
    fn detects_transfer_action_type_and_extracts_target() {
        let calls = vec![DetectedToolCall {
            call_id: "1".into(),
            name: "transfer_tool".into(),
            arguments: json!({"action_type": "transfer", "agent_id": "agent-b", "_query": "refund"}),
        }];
        let transfer = detect_transfer(&calls).unwrap();
        assert_eq!(transfer.target_bridge_id, "agent-b");
        assert_eq!(transfer.user_query, "refund");
    }

    #[test]
    fn non_transfer_tool_calls_are_ignored() {
        let calls = vec![DetectedToolCall {
            call_id: "1".into(),
            name: "lookup".into(),
            arguments: json!({"query": "x"}),
        }];
        assert!(detect_transfer(&calls).is_none());
    }

    #[test]
    fn placeholder_content_names_the_target_agent() {
        assert_eq!(
            transfer_placeholder_content("Refund Bot"),
            "Query is successfully transferred to agent Refund Bot"
        );
    }
}
