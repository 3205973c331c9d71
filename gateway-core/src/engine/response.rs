//! Response shaping and the hallucination
//! probe.

use gateway_protocol::{ChatData, FinishReason, Usage};
use uuid::Uuid;

use crate::limits::TokenCounts;
use crate::provider::{ChatOutcome, ProviderUsage};

const HALLUCINATION_DIAGNOSTIC: &str = "AI is Hallucinating — the model returned no usable content.";

/// True when content strips to only whitespace/newlines but the raw content
/// was non-empty.
pub fn is_hallucinating(content: &str, raw_had_content: bool) -> bool {
    raw_had_content && content.trim().is_empty()
}

/// Builds the caller-facing `ChatData`/`Usage` pair from one adapter outcome,
/// applying the hallucination probe and the `finish_reason` mapping table.
pub fn shape(
    outcome: &ChatOutcome,
    model: &str,
    tools_data: serde_json::Value,
    images: Option<Vec<String>>,
    fallback: bool,
    first_attempt_error: Option<String>,
    total_cost: f64,
) -> (ChatData, Usage) {
    let raw_had_content = !outcome.content.is_empty();
    let content = if is_hallucinating(&outcome.content, raw_had_content) {
        tracing::warn!(model, "hallucination probe tripped: raw content was whitespace-only");
        HALLUCINATION_DIAGNOSTIC.to_string()
    } else {
        outcome.content.clone()
    };

    let data = ChatData {
        id: Uuid::new_v4().to_string(),
        content,
        model: model.to_string(),
        role: "assistant".to_string(),
        finish_reason: FinishReason::from_raw(&outcome.finish_reason_raw),
        tools_data,
        images,
        annotations: None,
        fallback,
        first_attempt_error,
        message_id: Uuid::new_v4().to_string(),
        blocked_by_guardrails: false,
    };

    let usage = usage_from(&outcome.usage, total_cost);
    (data, usage)
}

/// The synchronous guardrails-block response shape.
pub fn blocked_by_guardrails(model: &str, reason: &str) -> (ChatData, Usage) {
    let data = ChatData {
        id: Uuid::new_v4().to_string(),
        content: reason.to_string(),
        model: model.to_string(),
        role: "assistant".to_string(),
        finish_reason: FinishReason::Other,
        tools_data: serde_json::Value::Null,
        images: None,
        annotations: None,
        fallback: false,
        first_attempt_error: None,
        message_id: Uuid::new_v4().to_string(),
        blocked_by_guardrails: true,
    };
    (data, Usage::default())
}

fn usage_from(provider_usage: &ProviderUsage, cost: f64) -> Usage {
    Usage {
        input_tokens: provider_usage.input_tokens,
        output_tokens: provider_usage.output_tokens,
        total_tokens: provider_usage.input_tokens + provider_usage.output_tokens,
        cached_tokens: provider_usage.cached_tokens,
        reasoning_tokens: provider_usage.reasoning_tokens,
        cost,
    }
}

pub fn token_counts(provider_usage: &ProviderUsage) -> TokenCounts {
    TokenCounts {
        input: provider_usage.input_tokens as u64,
        output: provider_usage.output_tokens as u64,
        cached: provider_usage.cached_tokens.unwrap_or(0) as u64,
        reasoning: provider_usage.reasoning_tokens.unwrap_or(0) as u64,
        cache_read: provider_usage.cache_read_tokens.unwrap_or(0) as u64,
        cache_creation: provider_usage.cache_creation_tokens.unwrap_or(0) as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RawModelResponse;

    fn outcome(content: &str) -> ChatOutcome {
        ChatOutcome {
            content: content.to_string(),
            raw: RawModelResponse(serde_json::Value::Null),
            tool_calls: vec![],
            usage: ProviderUsage { input_tokens: 10, output_tokens: 5, ..Default::default() },
            finish_reason_raw: "stop".to_string(),
        }
    }

    #[test]
    fn whitespace_only_content_is_replaced_with_diagnostic() {
        let (data, _) = shape(&outcome("  \n "), "gpt-4o", serde_json::Value::Null, None, false, None, 0.0);
        assert_eq!(data.content, HALLUCINATION_DIAGNOSTIC);
    }

    #[test]
    fn non_empty_content_passes_through() {
        let (data, usage) = shape(&outcome("hello"), "gpt-4o", serde_json::Value::Null, None, false, None, 0.01);
        assert_eq!(data.content, "hello");
        assert_eq!(usage.total_tokens, 15);
        assert_eq!(usage.cost, 0.01);
    }

    #[test]
    fn blocked_response_sets_flag_and_zero_usage() {
        let (data, usage) = blocked_by_guardrails("gpt-4o", "toxicity violation");
        assert!(data.blocked_by_guardrails);
        assert_eq!(usage.total_tokens, 0);
    }
}
