//! HTTP-function tool execution:
//! POSTs hydrated arguments to the bound URL; a non-2xx status becomes a
//! `ToolError`, not a hard failure of the turn.

use reqwest::Client;
use serde_json::Value;

use crate::error::GatewayError;

pub async fn invoke(client: &Client, url: &str, args: &Value) -> Result<String, GatewayError> {
    let resp = client
        .post(url)
        .json(args)
        .send()
        .await
        .map_err(|e| GatewayError::Tool(format!("request to {url} failed: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(GatewayError::Tool(format!("{url} returned {status}: {body}")));
    }

    resp.text()
        .await
        .map_err(|e| GatewayError::Tool(format!("reading response from {url}: {e}")))
}
