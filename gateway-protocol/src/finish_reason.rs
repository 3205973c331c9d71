//! `finish_reason` is part of the external contract and must not drift once published.

use serde::{Deserialize, Serialize};

/// Normalized finish reason, mapped from each provider's raw value via a
/// fixed table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Completed,
    Truncated,
    ToolCall,
    Other,
}

impl FinishReason {
    /// Maps a provider's raw finish/stop reason string onto the fixed enum.
    /// Unknown values fall through to `Other` rather than failing the turn.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "stop" | "end_turn" | "completed" => FinishReason::Completed,
            "length" | "max_tokens" | "max_output_tokens" => FinishReason::Truncated,
            "tool_calls" | "tool_use" => FinishReason::ToolCall,
            _ => FinishReason::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_raw_values() {
        assert_eq!(FinishReason::from_raw("stop"), FinishReason::Completed);
        assert_eq!(FinishReason::from_raw("end_turn"), FinishReason::Completed);
        assert_eq!(FinishReason::from_raw("completed"), FinishReason::Completed);
        assert_eq!(FinishReason::from_raw("length"), FinishReason::Truncated);
        assert_eq!(
            FinishReason::from_raw("max_output_tokens"),
            FinishReason::Truncated
        );
        assert_eq!(FinishReason::from_raw("tool_calls"), FinishReason::ToolCall);
        assert_eq!(FinishReason::from_raw("tool_use"), FinishReason::ToolCall);
    }

    #[test]
    fn unknown_raw_value_maps_to_other() {
        assert_eq!(FinishReason::from_raw("content_filter"), FinishReason::Other);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&FinishReason::ToolCall).unwrap(),
            "\"tool_call\""
        );
    }
}
