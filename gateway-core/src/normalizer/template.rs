//! `{{placeholder}}` substitution over the union of
//! `variables` and a flattened view of nested variables. Unresolved
//! placeholders are left in place and reported as missing — a separate
//! alerting event, not a hard failure — except when `variables_state`
//! marks the variable as not `required`.

use serde_json::Value;
use std::collections::HashMap;

use crate::config::types::VariableState;

/// Flattens a nested JSON object into `"a.b.c" -> value` dotted paths,
/// stringifying leaf values so they can be spliced into prompt text.
pub fn flatten_variables(variables: &HashMap<String, Value>) -> HashMap<String, String> {
    let mut flat = HashMap::new();
    for (key, value) in variables {
        flatten_into(key, value, &mut flat);
    }
    flat
}

fn flatten_into(prefix: &str, value: &Value, out: &mut HashMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten_into(&format!("{prefix}.{k}"), v, out);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Null => {}
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

#[derive(Debug, Default)]
pub struct TemplateResult {
    pub rendered: String,
    /// Placeholders left unresolved, filtered by `variables_state`.
    pub missing: Vec<String>,
}

/// Substitutes every `{{key}}` occurrence found in `flat` (union of
/// top-level and flattened nested variables). Placeholders with no match
/// are left in the text verbatim.
pub fn render(template: &str, flat: &HashMap<String, String>, variables_state: &HashMap<String, VariableState>) -> TemplateResult {
    let mut rendered = String::with_capacity(template.len());
    let mut missing = Vec::new();
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'{' && bytes.get(i + 1) == Some(&b'{') {
            if let Some(end) = template[i + 2..].find("}}") {
                let key = template[i + 2..i + 2 + end].trim();
                match flat.get(key) {
                    Some(value) => rendered.push_str(value),
                    None => {
                        rendered.push_str(&template[i..i + 2 + end + 2]);
                        let required = variables_state
                            .get(key)
                            .map(|s| s.status == "required")
                            .unwrap_or(true);
                        if required {
                            missing.push(key.to_string());
                        }
                    }
                }
                i += 2 + end + 2;
                continue;
            }
        }
        let ch_len = template[i..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
        rendered.push_str(&template[i..i + ch_len]);
        i += ch_len;
    }

    TemplateResult { rendered, missing }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_top_level_and_nested_variables() {
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), json!("Ada"));
        vars.insert("user".to_string(), json!({"city": "London"}));
        let flat = flatten_variables(&vars);

        let result = render("Hello {{name}} from {{user.city}}", &flat, &HashMap::new());
        assert_eq!(result.rendered, "Hello Ada from London");
        assert!(result.missing.is_empty());
    }

    #[test]
    fn unresolved_placeholder_is_left_in_place_and_reported() {
        let flat = HashMap::new();
        let result = render("Hi {{unknown}}", &flat, &HashMap::new());
        assert_eq!(result.rendered, "Hi {{unknown}}");
        assert_eq!(result.missing, vec!["unknown".to_string()]);
    }

    #[test]
    fn non_required_variable_is_not_reported_missing() {
        let flat = HashMap::new();
        let mut state = HashMap::new();
        state.insert(
            "optional_var".to_string(),
            VariableState {
                status: "optional".to_string(),
                default_value: None,
            },
        );
        let result = render("Hi {{optional_var}}", &flat, &state);
        assert!(result.missing.is_empty());
    }
}
