//! Guardrails check: a fixed small model is asked to
//! moderate the turn against the requested categories; an infra error
//! gracefully degrades to "safe" rather than failing the turn.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::config::types::GuardrailsConfig;
use crate::provider::{ChatRequest, ChatMessage, ProviderAdapter};

const GUARDRAILS_MODEL: &str = "gpt-5-nano";

pub const ALL_CATEGORIES: &[&str] = &[
    "data_leakage",
    "prompt_injection",
    "jailbreaking",
    "bias",
    "toxicity",
    "privacy",
    "hallucination",
    "violence",
    "illegal_activity",
    "misinformation",
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    pub is_safe: bool,
    pub reason: String,
    pub confidence: f64,
    #[serde(default)]
    pub violations: Vec<String>,
}

fn synthesize_prompt(categories: &[String], custom_prompt: Option<&str>, user_text: &str) -> String {
    let category_list = if categories.is_empty() {
        ALL_CATEGORIES.join(", ")
    } else {
        categories.join(", ")
    };
    let mut prompt = format!(
        "You are a moderation classifier. Evaluate the following user message against \
         these categories: {category_list}. Respond with strict JSON only: \
         {{\"is_safe\": bool, \"reason\": string, \"confidence\": number, \"violations\": [string]}}.\n\n\
         User message:\n{user_text}"
    );
    if let Some(custom) = custom_prompt {
        prompt.push_str(&format!("\n\nAdditional policy:\n{custom}"));
    }
    prompt
}

/// Runs the guardrails check. Returns `Ok(verdict)` on a parsed response, or
/// `Ok(safe-degrade)` on any infrastructure error").
pub async fn check(
    guardrails_adapter: &Arc<dyn ProviderAdapter>,
    api_key: &str,
    guardrails: &GuardrailsConfig,
    user_text: &str,
) -> GuardrailVerdict {
    if !guardrails.is_enabled {
        return GuardrailVerdict { is_safe: true, reason: "guardrails disabled".to_string(), confidence: 1.0, violations: vec![] };
    }

    let prompt = synthesize_prompt(&guardrails.categories, guardrails.custom_prompt.as_deref(), user_text);

    let req = ChatRequest {
        model: GUARDRAILS_MODEL.to_string(),
        system_prompt: None,
        transcript: vec![ChatMessage::User { content: prompt, attachments: vec![] }],
        tools: vec![],
        tool_choice: json!("none"),
        params: serde_json::Map::new(),
        api_key: api_key.to_string(),
        base_url: None,
    };

    match guardrails_adapter.chat(req).await {
        Ok(outcome) => match serde_json::from_str::<GuardrailVerdict>(&outcome.content) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(error = %e, "guardrails response was not parseable JSON; degrading to safe");
                GuardrailVerdict { is_safe: true, reason: "unparseable guardrails response".to_string(), confidence: 0.0, violations: vec![] }
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "guardrails call failed; degrading to safe");
            GuardrailVerdict { is_safe: true, reason: "guardrails infra error".to_string(), confidence: 0.0, violations: vec![] }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_prompt_includes_requested_categories_and_custom_prompt() {
        let prompt = synthesize_prompt(&["toxicity".to_string()], Some("no medical advice"), "hello");
        assert!(prompt.contains("toxicity"));
        assert!(prompt.contains("no medical advice"));
        assert!(prompt.contains("hello"));
    }

    #[test]
    fn empty_categories_falls_back_to_all() {
        let prompt = synthesize_prompt(&[], None, "hello");
        for category in ALL_CATEGORIES {
            assert!(prompt.contains(category));
        }
    }
}
