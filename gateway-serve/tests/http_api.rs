//! HTTP integration tests: bind an ephemeral listener, spawn the server,
//! drive it with `reqwest`, then shut it down.

use std::sync::Arc;
use std::time::Duration;

use gateway_core::batch::BatchReconciler;
use gateway_core::config::resolver::ConfigurationResolver;
use gateway_core::testing::{
    InMemoryAlertSink, InMemoryCache, InMemoryConversationStore, InMemoryDocumentStore, InMemoryResponseChannel, StaticChatAdapter,
};
use gateway_core::GatewayEngine;
use gateway_serve::AppState;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

async fn spawn_test_server() -> (
    String,
    oneshot::Sender<()>,
    tokio::task::JoinHandle<Result<(), Box<dyn std::error::Error + Send + Sync>>>,
) {
    let store = Arc::new(InMemoryDocumentStore::with_simple_bridge("bridge-1"));
    let cache = Arc::new(InMemoryCache::default());
    let resolver = Arc::new(ConfigurationResolver::new(
        store.clone(),
        cache.clone(),
        "0123456789abcdef0123456789abcdef".to_string(),
        "abcdef0123456789".to_string(),
        Default::default(),
    ));

    let mut registry = gateway_core::provider::ProviderRegistry::new();
    registry.register(Arc::new(StaticChatAdapter::new("openai", "hello from the test double", Vec::new())));
    let providers = Arc::new(registry);

    let tool_invoker = Arc::new(gateway_core::tools::ToolInvoker::new(reqwest::Client::new(), None, None));

    let engine = Arc::new(GatewayEngine::new(
        resolver.clone(),
        cache.clone(),
        store.clone(),
        providers.clone(),
        tool_invoker,
        Arc::new(InMemoryConversationStore::default()),
        Arc::new(InMemoryResponseChannel::default()),
        Arc::new(InMemoryAlertSink::default()),
        Vec::new(),
    ));

    let webhook: Arc<dyn gateway_core::batch::WebhookSink> = Arc::new(NoopWebhookSink);
    let batch = Arc::new(BatchReconciler::new(cache, store, providers, webhook));

    let state = Arc::new(AppState { engine, batch, resolver });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(gateway_serve::run_serve_on_listener(listener, state, Some(shutdown_rx)));
    (format!("http://{addr}"), shutdown_tx, handle)
}

struct NoopWebhookSink;

#[async_trait::async_trait]
impl gateway_core::batch::WebhookSink for NoopWebhookSink {
    async fn deliver(
        &self,
        _url: &str,
        _headers: &std::collections::HashMap<String, String>,
        _items: &[gateway_core::batch::FormattedBatchItem],
    ) -> Result<(), gateway_core::error::GatewayError> {
        Ok(())
    }
}

#[tokio::test]
async fn chat_endpoint_returns_synchronous_response() {
    let (base_url, shutdown_tx, handle) = spawn_test_server().await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/v2/chat"))
        .json(&serde_json::json!({"bridge_id": "bridge-1", "variables": {"user_query": "hi"}}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["response"]["data"]["content"], "hello from the test double");

    let _ = shutdown_tx.send(());
    let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
}

#[tokio::test]
async fn chat_endpoint_rejects_unknown_bridge_with_404() {
    let (base_url, shutdown_tx, handle) = spawn_test_server().await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/v2/chat"))
        .json(&serde_json::json!({"bridge_id": "does-not-exist"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    let _ = shutdown_tx.send(());
    let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
}

#[tokio::test]
async fn batch_endpoint_rejects_malformed_line_with_400() {
    let (base_url, shutdown_tx, handle) = spawn_test_server().await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/v2/batch"))
        .json(&serde_json::json!({
            "bridge_id": "bridge-1",
            "batch": ["not valid json"],
            "webhook": {"url": "http://127.0.0.1:1/unused", "headers": {}},
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let _ = shutdown_tx.send(());
    let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
}
