// Deriving context values from response bodies

use crate::assertion::is_truthy;
use crate::context::{value_to_text, WorkflowContext};
use crate::report::{FailureKind, StepFailure};
use crate::template::TemplateRenderer;
use crate::types::Extraction;
use serde_json::Value;

const NO_MATCH: &str = "required identifier not found: lookup by predicate yielded no match";

impl Extraction {
    /// Compute the value this extraction stores. Nothing is written to the
    /// context here; the caller merges all of a step's values at once.
    pub fn apply(&self, body: &Value, ctx: &WorkflowContext) -> Result<Value, StepFailure> {
        match self {
            Extraction::Field { key, pointer } => match body.pointer(pointer) {
                Some(value) if is_truthy(value) => Ok(value.clone()),
                _ => Err(StepFailure::new(
                    FailureKind::MissingIdentifier,
                    format!("required identifier not found: {} has no value for '{}'", pointer, key),
                )),
            },
            Extraction::Lookup {
                key,
                collection,
                match_field,
                equals,
                select,
            } => {
                let expected = TemplateRenderer::render_str(equals, ctx)
                    .map_err(|e| StepFailure::new(FailureKind::UnresolvedReference, e.to_string()))?;

                let items = body
                    .pointer(collection)
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        StepFailure::new(
                            FailureKind::MissingIdentifier,
                            format!("required identifier not found: {} is not a list", collection),
                        )
                    })?;

                let entity = find_first(items, match_field, &expected).ok_or_else(|| {
                    StepFailure::new(FailureKind::MissingIdentifier, NO_MATCH)
                        .with_expected(format!("{} == {}", match_field, expected))
                })?;

                match entity.get(select) {
                    Some(value) if is_truthy(value) => Ok(value.clone()),
                    _ => Err(StepFailure::new(
                        FailureKind::MissingIdentifier,
                        format!(
                            "required identifier not found: matching entity has no '{}' for '{}'",
                            select, key
                        ),
                    )),
                }
            }
        }
    }
}

/// First entity whose `field` equals `expected`, in list order.
///
/// Duplicates are not disambiguated: the earliest match wins.
pub fn find_first<'a>(items: &'a [Value], field: &str, expected: &str) -> Option<&'a Value> {
    items
        .iter()
        .find(|item| item.get(field).is_some_and(|v| value_to_text(v) == expected))
}
