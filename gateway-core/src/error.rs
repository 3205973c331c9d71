//! Crate-root error type. Every module boundary returns `Result<_, GatewayError>`;
//! only process entrypoints (the `gateway-serve` binaries) convert to `anyhow::Error`.

use thiserror::Error;

/// A quota violation, carrying the same typed payload the resolver's
/// `check_limits` step reports (bridge/folder/apikey, whichever tripped first).
#[derive(Debug, Clone)]
pub struct LimitExceeded {
    pub limit_type: String,
    pub current_usage: f64,
    pub limit_value: f64,
}

impl std::fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} limit exceeded: {} / {}",
            self.limit_type, self.current_usage, self.limit_value
        )
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("limit: {0}")]
    Limit(#[from] LimitExceeded),

    #[error("upstream ({service}): {message}")]
    Upstream { service: String, message: String },

    #[error("tool error: {0}")]
    Tool(String),

    #[error("blocked by guardrails: {0}")]
    PolicyBlock(String),

    #[error("transient infra: {0}")]
    TransientInfra(String),

    #[error("cancelled")]
    Cancelled,

    #[error("not found: {0}")]
    NotFound(String),
}

impl GatewayError {
    pub fn not_found(what: impl Into<String>) -> Self {
        GatewayError::NotFound(what.into())
    }

    pub fn unsupported(capability: &str, service: &str) -> Self {
        GatewayError::Upstream {
            service: service.to_string(),
            message: format!("{capability} is not supported by this adapter"),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::TransientInfra(format!("http: {e}"))
    }
}

impl From<redis::RedisError> for GatewayError {
    fn from(e: redis::RedisError) -> Self {
        GatewayError::TransientInfra(format!("redis: {e}"))
    }
}

impl From<lapin::Error> for GatewayError {
    fn from(e: lapin::Error) -> Self {
        GatewayError::TransientInfra(format!("amqp: {e}"))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Validation(format!("json: {e}"))
    }
}
