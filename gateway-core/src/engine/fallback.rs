//! Fallback retry: on a failed primary dispatch with
//! `fall_back.is_enable`, swap `{service, model, apikey}` and retry exactly
//! once.

use crate::config::types::{BridgeConfig, FallBackConfig, Service};

/// A bridge config with `service`/`model`/`apikey` swapped for the retry
/// attempt. `customConfig` (i.e. `configuration`) is left untouched unless
/// the service actually changed, in which case callers should re-run the
/// prompt/tool translation for the new service.
pub struct FallbackPlan {
    pub service: Service,
    pub model: String,
    pub apikey: Option<String>,
    pub service_changed: bool,
}

/// Builds the fallback plan from `fall_back`, or `None` if fallback is
/// disabled or incompletely configured.
pub fn plan(cfg: &BridgeConfig, fall_back: &FallBackConfig) -> Option<FallbackPlan> {
    if !fall_back.is_enable {
        return None;
    }
    let model = fall_back.model.clone()?;
    let service = match &fall_back.service {
        Some(raw) => Service::canonicalize(raw)?,
        None => cfg.service,
    };
    Some(FallbackPlan {
        service_changed: service != cfg.service,
        service,
        model,
        apikey: fall_back.apikey.clone(),
    })
}

/// Combines the primary attempt's error with the fallback attempt's outcome
/// message the way requires ("chained exceptions combine initial
/// + fallback messages verbatim").
pub fn combine_errors(first_attempt_error: &str, fallback_error: &str) -> String {
    format!("{first_attempt_error}; fallback: {fallback_error}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge(service: Service) -> BridgeConfig {
        let raw = serde_json::json!({
            "bridge_id": "b1",
            "org_id": "o1",
            "service": service.as_str(),
            "model": "gpt-4o",
            "configuration": {"prompt": "hi"}
        });
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn disabled_fallback_yields_no_plan() {
        let cfg = bridge(Service::Openai);
        let fb = FallBackConfig { is_enable: false, ..Default::default() };
        assert!(plan(&cfg, &fb).is_none());
    }

    #[test]
    fn enabled_fallback_with_different_service_is_flagged_changed() {
        let cfg = bridge(Service::Openai);
        let fb = FallBackConfig {
            is_enable: true,
            service: Some("anthropic".to_string()),
            model: Some("claude-3-5-sonnet".to_string()),
            apikey: Some("sk-ant-xxx".to_string()),
        };
        let plan = plan(&cfg, &fb).unwrap();
        assert!(plan.service_changed);
        assert_eq!(plan.service, Service::Anthropic);
    }

    #[test]
    fn fallback_without_explicit_service_keeps_primary_service() {
        let cfg = bridge(Service::Openai);
        let fb = FallBackConfig {
            is_enable: true,
            service: None,
            model: Some("gpt-4o-mini".to_string()),
            apikey: None,
        };
        let plan = plan(&cfg, &fb).unwrap();
        assert!(!plan.service_changed);
        assert_eq!(plan.service, Service::Openai);
    }
}
