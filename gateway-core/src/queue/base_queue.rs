//! Generic durable-queue consumer, ported from the Python
//! original's `aio_pika`-based `baseQueue.py` onto `lapin`: declares a queue
//! plus its `<queue>-Failed` dead-letter queue, consumes with persistent
//! delivery mode, and retries a handler up to 3 times with exponential
//! backoff before dead-lettering.

use async_trait::async_trait;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel};
use std::time::Duration;

use crate::error::GatewayError;
use crate::queue::log::{QueueMessageTimer, QueueOutcome};

pub const MAX_DELIVERY_ATTEMPTS: u32 = 3;

#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Processes one message body. An `Err` triggers the bounded retry.
    async fn handle(&self, body: &[u8]) -> Result<(), GatewayError>;
}

pub struct BaseQueue {
    channel: Channel,
    queue_name: String,
    failed_queue_name: String,
}

impl BaseQueue {
    pub async fn declare(channel: Channel, queue_name: &str) -> Result<Self, GatewayError> {
        let failed_queue_name = format!("{queue_name}-Failed");

        channel
            .queue_declare(queue_name, QueueDeclareOptions { durable: true, ..Default::default() }, FieldTable::default())
            .await?;
        channel
            .queue_declare(&failed_queue_name, QueueDeclareOptions { durable: true, ..Default::default() }, FieldTable::default())
            .await?;

        Ok(BaseQueue { channel, queue_name: queue_name.to_string(), failed_queue_name })
    }

    pub async fn publish(&self, body: &[u8]) -> Result<(), GatewayError> {
        self.channel
            .basic_publish(
                "",
                &self.queue_name,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await?
            .await?;
        Ok(())
    }

    async fn publish_to_dead_letter(&self, body: &[u8]) -> Result<(), GatewayError> {
        self.channel
            .basic_publish(
                "",
                &self.failed_queue_name,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await?
            .await?;
        Ok(())
    }

    /// Runs the consume loop until the channel closes. Each message is
    /// retried up to [`MAX_DELIVERY_ATTEMPTS`] with exponential backoff
    /// before being published to the dead-letter queue").
    pub async fn consume(&self, consumer_tag: &str, handler: &dyn MessageHandler) -> Result<(), GatewayError> {
        use futures::StreamExt;

        let mut consumer = self
            .channel
            .basic_consume(&self.queue_name, consumer_tag, BasicConsumeOptions::default(), FieldTable::default())
            .await?;

        while let Some(delivery) = consumer.next().await {
            let delivery = delivery?;
            let message_id = delivery
                .properties
                .message_id()
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_default();
            let timer = QueueMessageTimer::start(&self.queue_name, &message_id);

            let outcome = self.handle_with_retries(handler, &delivery.data).await;
            match outcome {
                Ok(()) => {
                    delivery.ack(BasicAckOptions::default()).await?;
                    timer.finish(QueueOutcome::Success, None);
                }
                Err(e) => {
                    self.publish_to_dead_letter(&delivery.data).await?;
                    delivery.nack(BasicNackOptions { requeue: false, ..Default::default() }).await?;
                    timer.finish(QueueOutcome::DeadLettered, Some(e.to_string()));
                }
            }
        }
        Ok(())
    }

    async fn handle_with_retries(&self, handler: &dyn MessageHandler, body: &[u8]) -> Result<(), GatewayError> {
        let mut last_err = None;
        for attempt in 0..MAX_DELIVERY_ATTEMPTS {
            match handler.handle(body).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(queue = %self.queue_name, attempt, error = %e, "queue message handler failed, retrying");
                    last_err = Some(e);
                    if attempt + 1 < MAX_DELIVERY_ATTEMPTS {
                        tokio::time::sleep(Duration::from_millis(200 * 2u64.pow(attempt))).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or(GatewayError::TransientInfra("handler failed with no recorded error".to_string())))
    }
}
