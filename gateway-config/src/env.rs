//! Typed environment for the gateway process.
//!
//! Call [`load_and_apply`](crate::load_and_apply) first so `.env`/XDG values land in
//! `std::env`, then call [`GatewayEnv::from_process_env`] to assemble this struct once at
//! startup and pass it down instead of re-reading `std::env` from deep inside the engine.

use std::collections::HashMap;
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
}

/// Process-wide configuration: cache/queue/document-store endpoints, the
/// encryption secret used to decrypt stored API keys,
/// and optional built-in keys per provider.
#[derive(Clone, Debug)]
pub struct GatewayEnv {
    pub redis_url: String,
    pub document_store_url: String,
    pub queue_url: String,
    pub vector_service_url: Option<String>,
    pub vector_service_key: Option<String>,
    pub rtlayer_push_key: Option<String>,
    pub encryption_key: Vec<u8>,
    pub encryption_iv_seed: Vec<u8>,
    /// Built-in / fallback API keys per service, e.g. a shared `ai_ml` key or
    /// the reserved `gpt-5-nano` chatbot-mode key.
    pub built_in_keys: HashMap<String, String>,
    pub provider_base_urls: HashMap<String, String>,
}

fn required(key: &'static str) -> Result<String, EnvError> {
    env::var(key).map_err(|_| EnvError::Missing(key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok()
}

impl GatewayEnv {
    /// Reads the variables this process needs out of `std::env`. Call
    /// [`crate::load_and_apply`] beforehand so `.env`/XDG values are visible here.
    pub fn from_process_env() -> Result<Self, EnvError> {
        let encryption_key = required("GATEWAY_ENCRYPTION_KEY")?.into_bytes();
        let encryption_iv_seed = optional("GATEWAY_ENCRYPTION_IV_SEED")
            .map(String::into_bytes)
            .unwrap_or_default();

        let mut built_in_keys = HashMap::new();
        for (service, var) in [
            ("ai_ml", "GATEWAY_BUILTIN_KEY_AI_ML"),
            ("openai_chatbot_nano", "GATEWAY_BUILTIN_KEY_CHATBOT_NANO"),
        ] {
            if let Some(v) = optional(var) {
                built_in_keys.insert(service.to_string(), v);
            }
        }

        let mut provider_base_urls = HashMap::new();
        for (service, var) in [
            ("openai", "GATEWAY_OPENAI_BASE_URL"),
            ("anthropic", "GATEWAY_ANTHROPIC_BASE_URL"),
            ("gemini", "GATEWAY_GEMINI_BASE_URL"),
            ("groq", "GATEWAY_GROQ_BASE_URL"),
            ("grok", "GATEWAY_GROK_BASE_URL"),
            ("mistral", "GATEWAY_MISTRAL_BASE_URL"),
            ("open_router", "GATEWAY_OPEN_ROUTER_BASE_URL"),
            ("ai_ml", "GATEWAY_AI_ML_BASE_URL"),
        ] {
            if let Some(v) = optional(var) {
                provider_base_urls.insert(service.to_string(), v);
            }
        }

        Ok(GatewayEnv {
            redis_url: env::var("GATEWAY_REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            document_store_url: env::var("GATEWAY_DOCUMENT_STORE_URL")
                .unwrap_or_else(|_| "memory://".to_string()),
            queue_url: env::var("GATEWAY_QUEUE_URL")
                .unwrap_or_else(|_| "amqp://127.0.0.1:5672/%2f".to_string()),
            vector_service_url: optional("GATEWAY_VECTOR_SERVICE_URL"),
            vector_service_key: optional("GATEWAY_VECTOR_SERVICE_KEY"),
            rtlayer_push_key: optional("GATEWAY_RTLAYER_KEY"),
            encryption_key,
            encryption_iv_seed,
            built_in_keys,
            provider_base_urls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_var<T>(key: &str, value: &str, f: impl FnOnce() -> T) -> T {
        let prev = env::var(key).ok();
        env::set_var(key, value);
        let result = f();
        match prev {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        }
        result
    }

    #[test]
    fn missing_encryption_key_is_an_error() {
        env::remove_var("GATEWAY_ENCRYPTION_KEY");
        let err = GatewayEnv::from_process_env().unwrap_err();
        assert!(matches!(err, EnvError::Missing("GATEWAY_ENCRYPTION_KEY")));
    }

    #[test]
    fn redis_url_defaults_when_unset() {
        env::remove_var("GATEWAY_REDIS_URL");
        let result = with_var("GATEWAY_ENCRYPTION_KEY", "0123456789abcdef", || {
            GatewayEnv::from_process_env()
        });
        let cfg = result.unwrap();
        assert_eq!(cfg.redis_url, "redis://127.0.0.1:6379");
    }

    #[test]
    fn built_in_key_picked_up_by_service_name() {
        let cfg = with_var("GATEWAY_ENCRYPTION_KEY", "0123456789abcdef", || {
            with_var("GATEWAY_BUILTIN_KEY_AI_ML", "builtin-secret", || {
                GatewayEnv::from_process_env()
            })
        })
        .unwrap();
        assert_eq!(
            cfg.built_in_keys.get("ai_ml").map(String::as_str),
            Some("builtin-secret")
        );
    }
}
