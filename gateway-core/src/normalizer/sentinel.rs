//! Sentinel value resolution: a caller value of
//! `"default"|"min"|"max"` is substituted from the per-model parameter
//! schema, with per-service exceptions.

use serde_json::Value;

use crate::config::types::{ModelConfig, Service};

/// Resolves one canonical parameter value against `model`'s schema if it is
/// a sentinel string; otherwise returns it unchanged.
///
/// Exception: Anthropic's `max_tokens` keeps its numeric
/// default rather than being dropped when the sentinel has no bound in the
/// schema.
pub fn resolve_sentinel(
    canonical_key: &str,
    value: &Value,
    service: Service,
    model: &ModelConfig,
) -> Value {
    let Value::String(s) = value else {
        return value.clone();
    };
    let Some(spec) = model.params.get(canonical_key) else {
        return value.clone();
    };

    let resolved = match s.as_str() {
        "default" => Some(spec.default.clone()),
        "min" => spec.min.clone(),
        "max" => spec.max.clone(),
        _ => return value.clone(),
    };

    match resolved {
        Some(v) => v,
        None if canonical_key == "max_tokens" && service == Service::Anthropic => {
            spec.default.clone()
        }
        None => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ModelParamSpec;
    use serde_json::json;
    use std::collections::HashMap;

    fn model_with(param: &str, spec: ModelParamSpec) -> ModelConfig {
        let mut params = HashMap::new();
        params.insert(param.to_string(), spec);
        ModelConfig {
            params,
            ..Default::default()
        }
    }

    #[test]
    fn resolves_default_sentinel() {
        let model = model_with(
            "creativity_level",
            ModelParamSpec {
                default: json!(0.7),
                min: Some(json!(0.0)),
                max: Some(json!(2.0)),
                level: None,
            },
        );
        let resolved = resolve_sentinel(
            "creativity_level",
            &json!("default"),
            Service::Openai,
            &model,
        );
        assert_eq!(resolved, json!(0.7));
    }

    #[test]
    fn anthropic_max_tokens_keeps_numeric_default_when_no_max_bound() {
        let model = model_with(
            "max_tokens",
            ModelParamSpec {
                default: json!(4096),
                min: None,
                max: None,
                level: None,
            },
        );
        let resolved = resolve_sentinel("max_tokens", &json!("max"), Service::Anthropic, &model);
        assert_eq!(resolved, json!(4096));
    }

    #[test]
    fn non_sentinel_value_passes_through() {
        let model = model_with(
            "creativity_level",
            ModelParamSpec {
                default: json!(0.7),
                min: None,
                max: None,
                level: None,
            },
        );
        let resolved = resolve_sentinel("creativity_level", &json!(0.3), Service::Openai, &model);
        assert_eq!(resolved, json!(0.3));
    }
}
