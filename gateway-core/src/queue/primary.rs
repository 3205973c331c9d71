//! Primary queue worker: accepts a full request envelope
//! whose `response_format` is `RTLayer` or `webhook`, re-enters the
//! Execution Engine, and ignores the HTTP-style return — the engine itself
//! pushes the shaped response via the configured channel.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::queue::base_queue::MessageHandler;
use gateway_protocol::ChatRequest as WireChatRequest;

/// The engine's queue-facing entrypoint. Defined here (not in `engine`) so
/// this module doesn't need to know the engine's internal types — only that
/// it can be asked to run one turn and will handle delivery itself.
#[async_trait]
pub trait EngineEntrypoint: Send + Sync {
    async fn run_turn(&self, request: WireChatRequest) -> Result<(), GatewayError>;
}

pub struct PrimaryQueueHandler {
    engine: Arc<dyn EngineEntrypoint>,
}

impl PrimaryQueueHandler {
    pub fn new(engine: Arc<dyn EngineEntrypoint>) -> Self {
        PrimaryQueueHandler { engine }
    }
}

#[async_trait]
impl MessageHandler for PrimaryQueueHandler {
    async fn handle(&self, body: &[u8]) -> Result<(), GatewayError> {
        let request: WireChatRequest = serde_json::from_slice(body)?;
        self.engine.run_turn(request).await
    }
}
