// {{key}} placeholder rendering against the workflow context

use crate::context::WorkflowContext;
use crate::error::{FlowError, FlowResult};
use serde_json::Value;

/// Renders request templates by substituting context values
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Render a string template. Every placeholder must resolve.
    pub fn render_str(text: &str, ctx: &WorkflowContext) -> FlowResult<String> {
        Self::render_with(text, |name| ctx.get_text(name))
    }

    /// Render a string template with a custom lookup
    pub fn render_with<F>(text: &str, lookup: F) -> FlowResult<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                break;
            };
            result.push_str(&rest[..start]);

            let name = rest[start + 2..start + 2 + len].trim();
            let value =
                lookup(name).ok_or_else(|| FlowError::UnresolvedReference(name.to_string()))?;
            result.push_str(&value);

            rest = &rest[start + 2 + len + 2..];
        }

        result.push_str(rest);
        Ok(result)
    }

    /// Render every string inside a JSON value.
    ///
    /// A string that is exactly one placeholder takes the context value with
    /// its JSON type intact, so `"{{age}}"` can become the number `30`.
    pub fn render_value(value: &Value, ctx: &WorkflowContext) -> FlowResult<Value> {
        match value {
            Value::String(text) => {
                if let Some(name) = Self::sole_placeholder(text) {
                    return ctx
                        .get(name)
                        .cloned()
                        .ok_or_else(|| FlowError::UnresolvedReference(name.to_string()));
                }
                Ok(Value::String(Self::render_str(text, ctx)?))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| Self::render_value(item, ctx))
                .collect::<FlowResult<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut rendered = serde_json::Map::with_capacity(map.len());
                for (key, item) in map {
                    rendered.insert(key.clone(), Self::render_value(item, ctx)?);
                }
                Ok(Value::Object(rendered))
            }
            other => Ok(other.clone()),
        }
    }

    fn sole_placeholder(text: &str) -> Option<&str> {
        let inner = text.strip_prefix("{{")?.strip_suffix("}}")?;
        if inner.contains("{{") || inner.contains("}}") {
            return None;
        }
        Some(inner.trim())
    }

    /// Extract placeholder names from a template string
    pub fn extract_parameters(text: &str) -> Vec<String> {
        let mut params = Vec::new();
        let mut chars = text.chars().peekable();
        let mut current_param = String::new();
        let mut in_param = false;

        while let Some(c) = chars.next() {
            if c == '{' && chars.peek() == Some(&'{') {
                chars.next();
                in_param = true;
                current_param.clear();
            } else if c == '}' && chars.peek() == Some(&'}') && in_param {
                chars.next();
                if !current_param.trim().is_empty() {
                    params.push(current_param.trim().to_string());
                }
                in_param = false;
                current_param.clear();
            } else if in_param {
                current_param.push(c);
            }
        }

        params.sort();
        params.dedup();
        params
    }

    /// Placeholder names used anywhere inside a JSON value
    pub fn extract_value_parameters(value: &Value) -> Vec<String> {
        let mut params = Vec::new();
        Self::collect_value_parameters(value, &mut params);
        params.sort();
        params.dedup();
        params
    }

    fn collect_value_parameters(value: &Value, params: &mut Vec<String>) {
        match value {
            Value::String(text) => params.extend(Self::extract_parameters(text)),
            Value::Array(items) => {
                for item in items {
                    Self::collect_value_parameters(item, params);
                }
            }
            Value::Object(map) => {
                for item in map.values() {
                    Self::collect_value_parameters(item, params);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> WorkflowContext {
        let mut ctx = WorkflowContext::new();
        ctx.insert("providerUUID", json!("p-123")).unwrap();
        ctx.insert("age", json!(30)).unwrap();
        ctx.insert("slots", json!(["10:00", "10:30"])).unwrap();
        ctx
    }

    #[test]
    fn test_extract_parameters() {
        let text = "/api/provider/{{providerUUID}}/slots/{{ date }}?p={{providerUUID}}";
        let params = TemplateRenderer::extract_parameters(text);
        assert_eq!(params, vec!["date", "providerUUID"]);
    }

    #[test]
    fn test_render_str() {
        let ctx = context();
        let result = TemplateRenderer::render_str("/api/{{providerUUID}}/age/{{age}}", &ctx).unwrap();
        assert_eq!(result, "/api/p-123/age/30");
    }

    #[test]
    fn test_render_str_unterminated_placeholder_is_literal() {
        let ctx = context();
        let result = TemplateRenderer::render_str("prefix {{providerUUID", &ctx).unwrap();
        assert_eq!(result, "prefix {{providerUUID");
    }

    #[test]
    fn test_render_str_missing_key() {
        let ctx = context();
        let result = TemplateRenderer::render_str("Bearer {{accessToken}}", &ctx);
        assert!(matches!(result, Err(FlowError::UnresolvedReference(k)) if k == "accessToken"));
    }

    #[test]
    fn test_render_value_preserves_types() {
        let ctx = context();
        let body = json!({
            "providerUUID": "{{providerUUID}}",
            "age": "{{age}}",
            "label": "age={{age}}",
            "availability": [{"timeSlots": "{{slots}}", "fixed": true}],
        });

        let rendered = TemplateRenderer::render_value(&body, &ctx).unwrap();
        assert_eq!(
            rendered,
            json!({
                "providerUUID": "p-123",
                "age": 30,
                "label": "age=30",
                "availability": [{"timeSlots": ["10:00", "10:30"], "fixed": true}],
            })
        );
    }

    #[test]
    fn test_render_value_missing_key() {
        let ctx = context();
        let body = json!({"nested": {"patient": "{{patientUUID}}"}});
        assert!(TemplateRenderer::render_value(&body, &ctx).is_err());
    }

    #[test]
    fn test_extract_value_parameters() {
        let body = json!({
            "a": "{{providerUUID}}",
            "b": ["{{date}}", 1, {"c": "x {{slot}}"}],
        });
        assert_eq!(
            TemplateRenderer::extract_value_parameters(&body),
            vec!["date", "providerUUID", "slot"]
        );
    }

    #[test]
    fn test_render_with_custom_lookup() {
        let result = TemplateRenderer::render_with("john{{unique}}@test.com", |name| {
            (name == "unique").then(|| "42".to_string())
        })
        .unwrap();
        assert_eq!(result, "john42@test.com");
    }
}
