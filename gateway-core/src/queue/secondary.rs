//! Secondary queue worker: post-processing bundle for a
//! completed turn — thread display-name generation, hallucination alerts,
//! and total-cost roll-up. GPT-memory update is flagged but not performed
//! here; it is left to the external collaborator the flag names.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::DistributedCache;
use crate::config::document_store::DocumentStore;
use crate::context::alert::{dispatch_filtered, AlertEvent, AlertSink, AlertType};
use crate::error::GatewayError;
use crate::queue::base_queue::MessageHandler;

const THREAD_DISPLAY_NAME_TTL_SECS: u64 = 48 * 60 * 60;

/// The post-processing bundle for one completed turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostProcessJob {
    pub org_id: String,
    pub bridge_id: String,
    pub thread_id: String,
    pub sub_thread_id: String,
    pub message_id: String,
    pub total_cost: f64,
    #[serde(default)]
    pub thread_flag: bool,
    #[serde(default)]
    pub hallucinated: bool,
    #[serde(default)]
    pub gpt_memory: bool,
}

/// External collaborator that names a thread from its first turn.
#[async_trait]
pub trait ThreadNamer: Send + Sync {
    async fn describe(&self, org_id: &str, bridge_id: &str, thread_id: &str) -> Result<String, GatewayError>;
}

pub struct SecondaryQueueHandler {
    cache: Arc<dyn DistributedCache>,
    store: Arc<dyn DocumentStore>,
    namer: Arc<dyn ThreadNamer>,
    alert_sink: Arc<dyn AlertSink>,
    subscribed_alerts: Vec<AlertType>,
}

impl SecondaryQueueHandler {
    pub fn new(
        cache: Arc<dyn DistributedCache>,
        store: Arc<dyn DocumentStore>,
        namer: Arc<dyn ThreadNamer>,
        alert_sink: Arc<dyn AlertSink>,
        subscribed_alerts: Vec<AlertType>,
    ) -> Self {
        SecondaryQueueHandler { cache, store, namer, alert_sink, subscribed_alerts }
    }

    async fn process(&self, job: &PostProcessJob) -> Result<(), GatewayError> {
        self.refresh_thread_display_name(job).await?;

        if job.hallucinated {
            dispatch_filtered(
                self.alert_sink.as_ref(),
                &self.subscribed_alerts,
                AlertEvent {
                    alert_type: AlertType::HallucinationDetected,
                    bridge_id: job.bridge_id.clone(),
                    message_id: Some(job.message_id.clone()),
                    detail: serde_json::json!({"thread_id": job.thread_id}),
                },
            )
            .await?;
        }

        self.store.roll_up_usage(&job.bridge_id, job.total_cost).await?;

        // GPT-memory update is an external collaborator out of scope; this
        // worker only logs that the job requested it.
        if job.gpt_memory {
            tracing::debug!(bridge_id = %job.bridge_id, "gpt-memory update requested by post-process job");
        }

        Ok(())
    }

    /// Cache-gated per (org,bridge,thread,sub_thread) for 48h; first time
    /// with `thread_flag` calls the external namer, else the sub_thread_id
    /// is used verbatim.
    async fn refresh_thread_display_name(&self, job: &PostProcessJob) -> Result<(), GatewayError> {
        let key = format!("thread_display_name_{}_{}_{}_{}", job.org_id, job.bridge_id, job.thread_id, job.sub_thread_id);
        if self.cache.get(&key).await?.is_some() {
            return Ok(());
        }

        let name = if job.thread_flag {
            self.namer.describe(&job.org_id, &job.bridge_id, &job.thread_id).await?
        } else {
            job.sub_thread_id.clone()
        };

        self.cache.set(&key, &name, THREAD_DISPLAY_NAME_TTL_SECS).await
    }
}

#[async_trait]
impl MessageHandler for SecondaryQueueHandler {
    async fn handle(&self, body: &[u8]) -> Result<(), GatewayError> {
        let job: PostProcessJob = serde_json::from_slice(body)?;
        self.process(&job).await
    }
}
