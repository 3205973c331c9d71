//! OpenAI's legacy Chat Completions endpoint — `messages[]` with a system/developer role,
//! `choices[0].message.tool_calls` detection. Identical wire shape to the
//! other OpenAI-compatible providers, so this just wires the shared
//! adapter to OpenAI's completions base URL.

use super::openai_compatible::OpenAiCompatibleAdapter;

pub fn adapter() -> OpenAiCompatibleAdapter {
    OpenAiCompatibleAdapter::new("openai_completion", "https://api.openai.com/v1")
}
