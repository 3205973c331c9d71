//! Thin HTTP clients forwarding to the external document/conversation
//! service at `document_store_url`.

use async_trait::async_trait;
use gateway_core::config::document_store::DocumentStore;
use gateway_core::config::types::{BridgeConfig, ModelConfig};
use gateway_core::context::{ConversationStore, ConversationTurn, OrchestratorTurn};
use gateway_core::error::GatewayError;
use gateway_core::limits::{LimitKind, UsageLedger};
use gateway_core::queue::ThreadNamer;

pub struct RemoteDocumentStore {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteDocumentStore {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        RemoteDocumentStore { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DocumentStore for RemoteDocumentStore {
    async fn get_bridge(&self, bridge_id: &str, version_id: Option<&str>) -> Result<BridgeConfig, GatewayError> {
        let mut request = self.client.get(format!("{}/bridges/{bridge_id}", self.base_url));
        if let Some(v) = version_id {
            request = request.query(&[("version_id", v)]);
        }
        Ok(request.send().await?.error_for_status()?.json().await?)
    }

    async fn get_model_config(&self, service: &str, model: &str) -> Result<ModelConfig, GatewayError> {
        let url = format!("{}/model_configs/{service}/{model}", self.base_url);
        Ok(self.client.get(url).send().await?.error_for_status()?.json().await?)
    }

    async fn seed_usage(&self, kind: LimitKind, id: &str) -> Result<UsageLedger, GatewayError> {
        let url = format!("{}/usage/{}/{id}", self.base_url, kind.prefix());
        Ok(self.client.get(url).send().await?.error_for_status()?.json().await?)
    }

    async fn roll_up_usage(&self, bridge_id: &str, total_cost: f64) -> Result<(), GatewayError> {
        let url = format!("{}/bridges/{bridge_id}/roll_up_usage", self.base_url);
        self.client
            .post(url)
            .json(&serde_json::json!({ "total_cost": total_cost }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn get_wrapper_template(&self, wrapper_id: &str) -> Result<String, GatewayError> {
        let url = format!("{}/wrapper_templates/{wrapper_id}", self.base_url);
        let body: serde_json::Value = self.client.get(url).send().await?.error_for_status()?.json().await?;
        body.get("template")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Validation(format!("wrapper template {wrapper_id} response missing template")))
    }
}

pub struct RemoteConversationStore {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteConversationStore {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        RemoteConversationStore { client, base_url }
    }
}

#[async_trait]
impl ConversationStore for RemoteConversationStore {
    async fn write_turn(&self, turn: ConversationTurn) -> Result<(), GatewayError> {
        let url = format!("{}/conversation_turns", self.base_url);
        self.client.post(url).json(&turn).send().await?.error_for_status()?;
        Ok(())
    }

    async fn write_orchestrator_turn(&self, turn: OrchestratorTurn) -> Result<(), GatewayError> {
        let url = format!("{}/orchestrator_turns", self.base_url);
        self.client.post(url).json(&turn).send().await?.error_for_status()?;
        Ok(())
    }

    async fn recent_turns(
        &self,
        org_id: &str,
        bridge_id: &str,
        thread_id: &str,
        sub_thread_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, GatewayError> {
        let url = format!("{}/conversation_turns/recent", self.base_url);
        let response = self
            .client
            .get(url)
            .query(&[
                ("org_id", org_id),
                ("bridge_id", bridge_id),
                ("thread_id", thread_id),
                ("sub_thread_id", sub_thread_id),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        Ok(response.error_for_status()?.json().await?)
    }
}

/// Calls out to an external description agent over HTTP for thread naming.
pub struct RemoteThreadNamer {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteThreadNamer {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        RemoteThreadNamer { client, base_url }
    }
}

#[async_trait]
impl ThreadNamer for RemoteThreadNamer {
    async fn describe(&self, org_id: &str, bridge_id: &str, thread_id: &str) -> Result<String, GatewayError> {
        let url = format!("{}/threads/describe", self.base_url);
        let body: serde_json::Value = self
            .client
            .post(url)
            .json(&serde_json::json!({ "org_id": org_id, "bridge_id": bridge_id, "thread_id": thread_id }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        body.get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Validation("thread namer response missing name".to_string()))
    }
}
