//! Canonical → per-provider parameter name table. This map is
//! part of the external contract and
//! must not drift once published.

use crate::config::types::Service;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallType {
    Default,
    Image,
    Embedding,
}

/// Canonical gateway parameter names.
pub const CANONICAL_KEYS: &[&str] = &[
    "creativity_level",
    "probability_cutoff",
    "token_selection_limit",
    "response_type",
    "max_tokens",
];

/// Looks up the provider-specific key for one canonical parameter, or
/// `None` if the provider has no equivalent for that call type (in which
/// case the normalizer drops the key rather than sending it upstream).
pub fn provider_key(canonical: &str, service: Service, call_type: CallType) -> Option<&'static str> {
    use Service::*;
    match (canonical, service, call_type) {
        ("creativity_level", Anthropic, _) => Some("temperature"),
        ("creativity_level", Gemini, _) => Some("temperature"),
        ("creativity_level", _, _) => Some("temperature"),

        ("probability_cutoff", Anthropic, _) => Some("top_p"),
        ("probability_cutoff", Gemini, _) => Some("topP"),
        ("probability_cutoff", _, _) => Some("top_p"),

        ("token_selection_limit", Anthropic, _) => Some("top_k"),
        ("token_selection_limit", Gemini, _) => Some("topK"),
        ("token_selection_limit", _, _) => None, // not supported by OpenAI-compatible chat APIs

        ("response_type", Gemini, _) => Some("response_mime_type"),
        ("response_type", _, CallType::Embedding) => None,
        ("response_type", _, _) => Some("response_format"),

        ("max_tokens", Anthropic, _) => Some("max_tokens"),
        ("max_tokens", Gemini, _) => Some("maxOutputTokens"),
        ("max_tokens", Openai, _) => Some("max_output_tokens"),
        ("max_tokens", _, _) => Some("max_tokens"),

        _ => None,
    }
}

/// Translates a canonical config map into the provider vocabulary for one
/// call type. Parameter normalization is a pure function of
/// `(canonical_config, service, call_type, has_tools)`; repeated application
/// on an already-normalized map is a no-op because unknown (already-provider)
/// keys pass through untouched.
///
/// `has_tools` reflects whether this request actually carries a tool list —
/// it does not come from `canonical`, which holds bridge configuration
/// params and never has a `tools` key.
pub fn normalize(
    canonical: &serde_json::Map<String, serde_json::Value>,
    service: Service,
    call_type: CallType,
    has_tools: bool,
) -> serde_json::Map<String, serde_json::Value> {
    let mut out = serde_json::Map::new();
    for (key, value) in canonical {
        match provider_key(key, service, call_type) {
            Some(provider_name) => {
                out.insert(provider_name.to_string(), value.clone());
            }
            None if CANONICAL_KEYS.contains(&key.as_str()) => {
                // Canonical key with no provider equivalent for this
                // call-type/service combination: drop it.
            }
            None => {
                // Not a canonical key (already provider vocabulary, or an
                // opaque pass-through field): keep as-is.
                out.insert(key.clone(), value.clone());
            }
        }
    }

    if !has_tools {
        out.remove("parallel_tool_calls");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_canonical_keys_per_service() {
        let mut canon = serde_json::Map::new();
        canon.insert("creativity_level".into(), json!(0.7));
        canon.insert("max_tokens".into(), json!(1024));

        let anthropic = normalize(&canon, Service::Anthropic, CallType::Default, false);
        assert_eq!(anthropic.get("temperature"), Some(&json!(0.7)));
        assert_eq!(anthropic.get("max_tokens"), Some(&json!(1024)));

        let openai = normalize(&canon, Service::Openai, CallType::Default, false);
        assert_eq!(openai.get("max_output_tokens"), Some(&json!(1024)));
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut canon = serde_json::Map::new();
        canon.insert("creativity_level".into(), json!(0.5));

        let once = normalize(&canon, Service::Groq, CallType::Default, true);
        let twice = normalize(&once, Service::Groq, CallType::Default, true);
        assert_eq!(once, twice);
    }

    #[test]
    fn strips_parallel_tool_calls_when_no_tools() {
        let mut canon = serde_json::Map::new();
        canon.insert("parallel_tool_calls".into(), json!(true));
        let out = normalize(&canon, Service::Openai, CallType::Default, false);
        assert!(!out.contains_key("parallel_tool_calls"));
    }

    #[test]
    fn keeps_parallel_tool_calls_when_tools_present() {
        let mut canon = serde_json::Map::new();
        canon.insert("parallel_tool_calls".into(), json!(true));
        let out = normalize(&canon, Service::Openai, CallType::Default, true);
        assert!(out.contains_key("parallel_tool_calls"));
    }
}
