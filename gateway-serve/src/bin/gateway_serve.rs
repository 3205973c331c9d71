//! Gateway HTTP server entrypoint: loads environment, wires Redis,
//! providers, queue consumers, and alert/response delivery, then serves
//! `/v2/*`. Also spawns the two durable RabbitMQ consumers
//! alongside the HTTP listener.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::oneshot;
use tracing::{error, info};

use gateway_config::GatewayEnv;
use gateway_core::batch::BatchReconciler;
use gateway_core::cache::{DistributedCache, RedisCache};
use gateway_core::config::resolver::ConfigurationResolver;
use gateway_core::context::alert::{AlertSink, AlertType, WebhookAlertSink};
use gateway_core::engine::delivery::{HttpResponseChannel, HttpWebhookSink};
use gateway_core::provider::ProviderRegistry;
use gateway_core::queue::{
    BaseQueue, MessageHandler, PrimaryQueueHandler, SecondaryQueueHandler, PRIMARY_QUEUE_NAME, SECONDARY_QUEUE_NAME,
};
use gateway_core::tools::ToolInvoker;
use gateway_core::GatewayEngine;
use gateway_serve::remote_store::{RemoteConversationStore, RemoteDocumentStore, RemoteThreadNamer};
use gateway_serve::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    gateway_config::load_and_apply("gateway", None).context("loading .env/XDG config")?;
    let env = GatewayEnv::from_process_env().context("reading process environment")?;

    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .context("building reqwest client")?;

    let cache: Arc<dyn DistributedCache> = Arc::new(RedisCache::connect(&env.redis_url).await.context("connecting to redis")?);
    let store = Arc::new(RemoteDocumentStore::new(http_client.clone(), env.document_store_url.clone()));
    let conversation_store = Arc::new(RemoteConversationStore::new(http_client.clone(), env.document_store_url.clone()));

    let resolver = Arc::new(ConfigurationResolver::new(
        store.clone(),
        cache.clone(),
        env.encryption_key.clone(),
        env.encryption_iv_seed.clone(),
        env.built_in_keys.clone(),
    ));

    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(gateway_core::provider::openai::OpenAiAdapter::default()));
    registry.register(Arc::new(gateway_core::provider::anthropic::AnthropicAdapter::default()));
    registry.register(Arc::new(gateway_core::provider::gemini::GeminiAdapter::default()));
    registry.register(Arc::new(gateway_core::provider::ai_ml::AiMlAdapter::default()));
    registry.register(Arc::new(gateway_core::provider::openai_completion::adapter()));
    registry.register(Arc::new(gateway_core::provider::openai_compatible::groq()));
    registry.register(Arc::new(gateway_core::provider::openai_compatible::grok()));
    registry.register(Arc::new(gateway_core::provider::openai_compatible::open_router()));
    registry.register(Arc::new(gateway_core::provider::openai_compatible::mistral()));
    let providers = Arc::new(registry);

    let tool_invoker = Arc::new(ToolInvoker::new(http_client.clone(), None, None));

    let subscribed_alerts = vec![
        AlertType::GuardrailsBlocked,
        AlertType::MissingVariables,
        AlertType::FallbackRetry,
        AlertType::HallucinationDetected,
    ];
    // No dedicated alert-webhook env var exists yet; the document store's
    // base URL doubles as the alert sink target until one is added.
    let alert_sink: Arc<dyn AlertSink> =
        Arc::new(WebhookAlertSink::new(http_client.clone(), format!("{}/alerts", env.document_store_url), HashMap::new()));
    let response_channel = Arc::new(HttpResponseChannel::new(http_client.clone()));

    let engine = Arc::new(GatewayEngine::new(
        resolver.clone(),
        cache.clone(),
        store.clone(),
        providers.clone(),
        tool_invoker,
        conversation_store,
        response_channel,
        alert_sink.clone(),
        subscribed_alerts.clone(),
    ));

    let batch_webhook: Arc<dyn gateway_core::batch::WebhookSink> = Arc::new(HttpWebhookSink::new(http_client.clone()));
    let batch = Arc::new(BatchReconciler::new(cache.clone(), store.clone(), providers.clone(), batch_webhook));

    let state = Arc::new(AppState { engine: engine.clone(), batch, resolver });

    let amqp_conn = lapin::Connection::connect(&env.queue_url, lapin::ConnectionProperties::default())
        .await
        .context("connecting to amqp")?;

    spawn_primary_consumer(&amqp_conn, engine.clone()).await?;
    spawn_secondary_consumer(&amqp_conn, cache, store, alert_sink, subscribed_alerts, http_client).await?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("ctrl-c received, shutting down");
        let _ = shutdown_tx.send(());
    });

    gateway_serve::run_serve(None, state, Some(shutdown_rx)).await.map_err(|e| anyhow::anyhow!("{e}"))
}

async fn spawn_primary_consumer(conn: &lapin::Connection, engine: Arc<GatewayEngine>) -> anyhow::Result<()> {
    let channel = conn.create_channel().await.context("opening primary amqp channel")?;
    let queue = BaseQueue::declare(channel, PRIMARY_QUEUE_NAME).await.context("declaring primary queue")?;
    let handler: Arc<dyn MessageHandler> = Arc::new(PrimaryQueueHandler::new(engine));
    tokio::spawn(async move {
        if let Err(e) = queue.consume("gateway-serve-primary", handler.as_ref()).await {
            error!(error = %e, "primary queue consumer exited");
        }
    });
    info!(queue = PRIMARY_QUEUE_NAME, "primary queue consumer started");
    Ok(())
}

async fn spawn_secondary_consumer(
    conn: &lapin::Connection,
    cache: Arc<dyn DistributedCache>,
    store: Arc<RemoteDocumentStore>,
    alert_sink: Arc<dyn AlertSink>,
    subscribed_alerts: Vec<AlertType>,
    http_client: reqwest::Client,
) -> anyhow::Result<()> {
    let channel = conn.create_channel().await.context("opening secondary amqp channel")?;
    let queue = BaseQueue::declare(channel, SECONDARY_QUEUE_NAME).await.context("declaring secondary queue")?;
    let namer = Arc::new(RemoteThreadNamer::new(http_client, store.base_url().to_string()));
    let handler: Arc<dyn MessageHandler> = Arc::new(SecondaryQueueHandler::new(cache, store, namer, alert_sink, subscribed_alerts));
    tokio::spawn(async move {
        if let Err(e) = queue.consume("gateway-serve-secondary", handler.as_ref()).await {
            error!(error = %e, "secondary queue consumer exited");
        }
    });
    info!(queue = SECONDARY_QUEUE_NAME, "secondary queue consumer started");
    Ok(())
}
