//! Replays a fixed list of `{input, expected_substring}` cases through a
//! bridge and reports pass/fail — a lightweight stand-in for a regression
//! harness bridge authors run before publishing a new version.
//!
//! Not a separate service: just a thin loop over [`GatewayEngine::run_turn`].

use serde::{Deserialize, Serialize};

use crate::engine::GatewayEngine;
use crate::error::GatewayError;
use gateway_protocol::ChatRequest;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_substring: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub input: String,
    pub expected_substring: String,
    pub passed: bool,
    pub actual: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct TestCaseReport {
    pub results: Vec<TestCaseResult>,
}

impl TestCaseReport {
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn pass_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }
}

/// Runs each case as its own turn on `bridge_id` (no shared thread: every
/// case starts from a clean conversation) and checks whether the response
/// content contains `expected_substring`.
pub async fn run_test_cases(engine: &GatewayEngine, bridge_id: &str, cases: &[TestCase]) -> Result<TestCaseReport, GatewayError> {
    let mut results = Vec::with_capacity(cases.len());
    for case in cases {
        let request = ChatRequest {
            bridge_id: bridge_id.to_string(),
            version_id: None,
            org_id: None,
            user: None,
            configuration: serde_json::Value::Null,
            variables: [("user_query".to_string(), serde_json::Value::String(case.input.clone()))].into_iter().collect(),
            thread_id: None,
            sub_thread_id: None,
            response_format: gateway_protocol::ResponseFormat::Default,
            fall_back: None,
            guardrails: None,
            tool_call_count: None,
            orchestrator_flag: false,
            user_urls: Vec::new(),
            extra_tools: Vec::new(),
            built_in_tools: Vec::new(),
            web_search_filters: Vec::new(),
        };

        match engine.run_turn(request).await {
            Ok(response) => {
                let content = response.response.as_ref().map(|body| body.data.content.clone());
                let passed = content.as_deref().is_some_and(|c| c.contains(&case.expected_substring));
                results.push(TestCaseResult {
                    input: case.input.clone(),
                    expected_substring: case.expected_substring.clone(),
                    passed,
                    actual: content,
                    error: None,
                });
            }
            Err(e) => {
                results.push(TestCaseResult {
                    input: case.input.clone(),
                    expected_substring: case.expected_substring.clone(),
                    passed: false,
                    actual: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }
    Ok(TestCaseReport { results })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use std::sync::Arc;

    fn build_engine(adapter_content: &str) -> GatewayEngine {
        let store = Arc::new(InMemoryDocumentStore::with_simple_bridge("bridge-1"));
        let cache = Arc::new(InMemoryCache::default());
        let resolver = Arc::new(crate::config::resolver::ConfigurationResolver::new(
            store.clone(),
            cache.clone(),
            "0123456789abcdef0123456789abcdef".to_string(),
            "abcdef0123456789".to_string(),
            Default::default(),
        ));
        let mut registry = crate::provider::ProviderRegistry::new();
        registry.register(Arc::new(StaticChatAdapter::new("openai", adapter_content, Vec::new())));
        let providers = Arc::new(registry);
        let tool_invoker = Arc::new(crate::tools::ToolInvoker::new(reqwest::Client::new(), None, None));

        GatewayEngine::new(
            resolver,
            cache,
            store,
            providers,
            tool_invoker,
            Arc::new(InMemoryConversationStore::default()),
            Arc::new(InMemoryResponseChannel::default()),
            Arc::new(InMemoryAlertSink::default()),
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn reports_pass_when_substring_present() {
        let engine = build_engine("the answer is 42");
        let cases = vec![TestCase { input: "what is the answer".to_string(), expected_substring: "42".to_string() }];
        let report = run_test_cases(&engine, "bridge-1", &cases).await.unwrap();
        assert!(report.all_passed());
        assert_eq!(report.pass_count(), 1);
    }

    #[tokio::test]
    async fn reports_failure_when_substring_absent() {
        let engine = build_engine("I don't know");
        let cases = vec![TestCase { input: "what is the answer".to_string(), expected_substring: "42".to_string() }];
        let report = run_test_cases(&engine, "bridge-1", &cases).await.unwrap();
        assert!(!report.all_passed());
        assert_eq!(report.pass_count(), 0);
    }

    #[tokio::test]
    async fn reports_error_for_unknown_bridge() {
        let engine = build_engine("irrelevant");
        let cases = vec![TestCase { input: "hi".to_string(), expected_substring: "x".to_string() }];
        let report = run_test_cases(&engine, "missing-bridge", &cases).await.unwrap();
        assert!(!report.all_passed());
        assert!(report.results[0].error.is_some());
    }
}
