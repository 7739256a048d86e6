// Response body predicates

use crate::context::{value_to_text, WorkflowContext};
use crate::report::{FailureKind, StepFailure};
use crate::template::TemplateRenderer;
use crate::types::Assertion;
use serde_json::Value;

impl Assertion {
    /// Check the assertion against a parsed body
    pub fn check(&self, body: &Value, ctx: &WorkflowContext) -> Result<(), StepFailure> {
        match self {
            Assertion::Contains { pointer, value } => {
                let expected = TemplateRenderer::render_str(value, ctx)
                    .map_err(|e| StepFailure::new(FailureKind::UnresolvedReference, e.to_string()))?;

                match body.pointer(pointer) {
                    Some(Value::String(actual)) if actual.contains(&expected) => Ok(()),
                    Some(actual) => Err(StepFailure::new(
                        FailureKind::AssertionFailure,
                        format!("{} does not contain the expected text", pointer),
                    )
                    .with_expected(expected)
                    .with_actual(value_to_text(actual))),
                    None => Err(missing_field(pointer).with_expected(expected)),
                }
            }
            Assertion::Equals { pointer, value } => {
                let expected = TemplateRenderer::render_value(value, ctx)
                    .map_err(|e| StepFailure::new(FailureKind::UnresolvedReference, e.to_string()))?;

                match body.pointer(pointer) {
                    Some(actual) if *actual == expected => Ok(()),
                    Some(actual) => Err(StepFailure::new(
                        FailureKind::AssertionFailure,
                        format!("{} does not equal the expected value", pointer),
                    )
                    .with_expected(expected.to_string())
                    .with_actual(actual.to_string())),
                    None => Err(missing_field(pointer).with_expected(expected.to_string())),
                }
            }
            Assertion::Present { pointer } => match body.pointer(pointer) {
                Some(actual) if is_truthy(actual) => Ok(()),
                Some(actual) => Err(StepFailure::new(
                    FailureKind::AssertionFailure,
                    format!("{} is empty", pointer),
                )
                .with_actual(actual.to_string())),
                None => Err(missing_field(pointer)),
            },
        }
    }
}

fn missing_field(pointer: &str) -> StepFailure {
    StepFailure::new(
        FailureKind::AssertionFailure,
        format!("{} is missing from the response body", pointer),
    )
}

/// Null, false and the empty string are not truthy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contains(pointer: &str, value: &str) -> Assertion {
        Assertion::Contains {
            pointer: pointer.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_contains() {
        let body = json!({"message": "Provider created successfully. id=9"});
        let ctx = WorkflowContext::new();

        assert!(contains("/message", "Provider created successfully.").check(&body, &ctx).is_ok());

        let failure = contains("/message", "Patient").check(&body, &ctx).unwrap_err();
        assert_eq!(failure.kind, FailureKind::AssertionFailure);
        assert_eq!(failure.expected.as_deref(), Some("Patient"));
        assert_eq!(failure.actual.as_deref(), Some("Provider created successfully. id=9"));
    }

    #[test]
    fn test_contains_missing_field() {
        let body = json!({"error": "nope"});
        let failure = contains("/message", "ok")
            .check(&body, &WorkflowContext::new())
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::AssertionFailure);
        assert!(failure.message.contains("missing"));
    }

    #[test]
    fn test_contains_renders_template() {
        let mut ctx = WorkflowContext::new();
        ctx.insert("name", json!("Steven Miller")).unwrap();
        let body = json!({"message": "Created Steven Miller"});

        assert!(contains("/message", "{{name}}").check(&body, &ctx).is_ok());

        let failure = contains("/message", "{{other}}").check(&body, &ctx).unwrap_err();
        assert_eq!(failure.kind, FailureKind::UnresolvedReference);
    }

    #[test]
    fn test_equals() {
        let body = json!({"data": {"count": 2, "state": "ok"}});
        let ctx = WorkflowContext::new();

        let assertion = Assertion::Equals {
            pointer: "/data/count".to_string(),
            value: json!(2),
        };
        assert!(assertion.check(&body, &ctx).is_ok());

        let assertion = Assertion::Equals {
            pointer: "/data/state".to_string(),
            value: json!("failed"),
        };
        let failure = assertion.check(&body, &ctx).unwrap_err();
        assert_eq!(failure.expected.as_deref(), Some("\"failed\""));
        assert_eq!(failure.actual.as_deref(), Some("\"ok\""));
    }

    #[test]
    fn test_present() {
        let body = json!({"access_token": "abc", "empty": "", "none": null});
        let ctx = WorkflowContext::new();
        let present = |p: &str| Assertion::Present {
            pointer: p.to_string(),
        };

        assert!(present("/access_token").check(&body, &ctx).is_ok());
        assert!(present("/empty").check(&body, &ctx).is_err());
        assert!(present("/none").check(&body, &ctx).is_err());
        assert!(present("/absent").check(&body, &ctx).is_err());
    }
}
