//! Canonical (provider-agnostic) chat transcript types. Each adapter
//! translates this shape into its own wire format at dispatch time and
//! parses raw responses back into [`DetectedToolCall`]/content — the engine
//! never touches provider JSON directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Image,
    Pdf,
    Audio,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub kind: AttachmentKind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectedToolCall {
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolExecutionResult {
    pub call_id: String,
    pub name: String,
    /// Stringified tool output, or an error message.
    pub content: String,
    pub is_error: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ChatMessage {
    User {
        content: String,
        #[serde(default)]
        attachments: Vec<Attachment>,
    },
    Assistant {
        content: String,
        #[serde(default)]
        tool_calls: Vec<DetectedToolCall>,
    },
    Tool {
        call_id: String,
        name: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

/// The in-flight conversation an adapter dispatches and appends to across
/// tool-loop iterations. Provider-specific splice
/// rules (Anthropic's `tool_result` block, Gemini's
/// `function_call`/`function_response` pair, OpenAI Responses' extended
/// `input[]`) are realized inside each adapter's `chat` translation, not
/// here — this stays canonical so `merge_tool_results` has one
/// implementation shared by every adapter.
pub type ProviderTranscript = Vec<ChatMessage>;

/// Appends one assistant-with-tool-calls message plus each tool's result,
/// in call order.
pub fn merge_tool_results(
    transcript: &mut ProviderTranscript,
    tool_calls: &[DetectedToolCall],
    results: &[ToolExecutionResult],
) {
    transcript.push(ChatMessage::Assistant {
        content: String::new(),
        tool_calls: tool_calls.to_vec(),
    });
    for result in results {
        transcript.push(ChatMessage::Tool {
            call_id: result.call_id.clone(),
            name: result.name.clone(),
            content: result.content.clone(),
            is_error: result.is_error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_preserves_call_order() {
        let mut transcript = Vec::new();
        let calls = vec![
            DetectedToolCall { call_id: "1".into(), name: "a".into(), arguments: Value::Null },
            DetectedToolCall { call_id: "2".into(), name: "b".into(), arguments: Value::Null },
        ];
        let results = vec![
            ToolExecutionResult { call_id: "1".into(), name: "a".into(), content: "ok-a".into(), is_error: false },
            ToolExecutionResult { call_id: "2".into(), name: "b".into(), content: "ok-b".into(), is_error: false },
        ];
        merge_tool_results(&mut transcript, &calls, &results);

        assert_eq!(transcript.len(), 3);
        match &transcript[1] {
            ChatMessage::Tool { call_id, .. } => assert_eq!(call_id, "1"),
            _ => panic!("expected tool message"),
        }
        match &transcript[2] {
            ChatMessage::Tool { call_id, .. } => assert_eq!(call_id, "2"),
            _ => panic!("expected tool message"),
        }
    }
}
