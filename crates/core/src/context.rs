// Key/value state threaded across the steps of one run

use crate::error::{FlowError, FlowResult};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Accumulated values for a single run.
///
/// Keys are write-once: a second insert for the same key is rejected and the
/// first value is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowContext {
    values: BTreeMap<String, Value>,
}

impl WorkflowContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Value rendered as text, as it appears when interpolated into a template
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.values.get(key).map(value_to_text)
    }

    /// Insert a new key, failing if it is already set
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> FlowResult<()> {
        let key = key.into();
        if self.values.contains_key(&key) {
            return Err(FlowError::ContextConflict(key));
        }
        self.values.insert(key, value);
        Ok(())
    }

    /// Insert every entry or none of them
    pub fn insert_all(&mut self, entries: Vec<(String, Value)>) -> FlowResult<()> {
        for (i, (key, _)) in entries.iter().enumerate() {
            if self.values.contains_key(key) || entries[..i].iter().any(|(k, _)| k == key) {
                return Err(FlowError::ContextConflict(key.clone()));
            }
        }
        self.values.extend(entries);
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Value)> for WorkflowContext {
    /// Later duplicates are dropped, matching the write-once rule
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut values = BTreeMap::new();
        for (key, value) in iter {
            values.entry(key).or_insert(value);
        }
        Self { values }
    }
}

/// Text form of a JSON value: strings unquoted, everything else as JSON
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_get() {
        let mut ctx = WorkflowContext::new();
        ctx.insert("providerUUID", json!("p-1")).unwrap();
        ctx.insert("count", json!(3)).unwrap();

        assert_eq!(ctx.get("providerUUID"), Some(&json!("p-1")));
        assert_eq!(ctx.get_text("providerUUID").unwrap(), "p-1");
        assert_eq!(ctx.get_text("count").unwrap(), "3");
        assert_eq!(ctx.len(), 2);
        assert!(ctx.get("missing").is_none());
    }

    #[test]
    fn test_overwrite_rejected() {
        let mut ctx = WorkflowContext::new();
        ctx.insert("accessToken", json!("first")).unwrap();

        let result = ctx.insert("accessToken", json!("second"));
        assert!(matches!(result, Err(FlowError::ContextConflict(k)) if k == "accessToken"));
        assert_eq!(ctx.get("accessToken"), Some(&json!("first")));
    }

    #[test]
    fn test_insert_all_is_atomic() {
        let mut ctx = WorkflowContext::new();
        ctx.insert("a", json!(1)).unwrap();

        let result = ctx.insert_all(vec![
            ("b".to_string(), json!(2)),
            ("a".to_string(), json!(3)),
        ]);
        assert!(result.is_err());
        assert!(!ctx.contains("b"));
        assert_eq!(ctx.get("a"), Some(&json!(1)));

        let result = ctx.insert_all(vec![
            ("c".to_string(), json!(1)),
            ("c".to_string(), json!(2)),
        ]);
        assert!(result.is_err());
        assert!(!ctx.contains("c"));

        ctx.insert_all(vec![("b".to_string(), json!(2))]).unwrap();
        assert_eq!(ctx.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_from_iter_keeps_first() {
        let ctx: WorkflowContext = vec![
            ("k".to_string(), json!("first")),
            ("k".to_string(), json!("second")),
        ]
        .into_iter()
        .collect();

        assert_eq!(ctx.get("k"), Some(&json!("first")));
    }
}
