use crate::client::{HttpClient, HttpRequest};
use crate::context::WorkflowContext;
use crate::error::FlowError;
use crate::report::{snippet, FailureKind, StepFailure, StepResult, StepStatus};
use crate::template::TemplateRenderer;
use crate::types::{StepSpec, WorkflowSpec};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// What happened while executing a step
#[derive(Default)]
struct Outcome {
    status_code: Option<u16>,
    body: Option<Value>,
    failures: Vec<StepFailure>,
    extracted: Vec<String>,
}

impl Outcome {
    fn fail(mut self, failure: StepFailure) -> Self {
        self.failures.push(failure);
        self
    }
}

/// Executes one step: render, send, validate, extract
pub struct StepExecutor {
    client: Arc<dyn HttpClient>,
    default_timeout: Duration,
}

impl StepExecutor {
    pub fn new(client: Arc<dyn HttpClient>, default_timeout: Duration) -> Self {
        Self {
            client,
            default_timeout,
        }
    }

    pub fn client(&self) -> Arc<dyn HttpClient> {
        self.client.clone()
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Execute a step. Extracted values are merged into `ctx` only when every
    /// check passed.
    pub async fn execute(
        &self,
        workflow: &WorkflowSpec,
        step: &StepSpec,
        ctx: &mut WorkflowContext,
    ) -> StepResult {
        tracing::info!("Executing step: {} ({} {})", step.id, step.method, step.path);

        let started_at = chrono::Utc::now();
        let start = Instant::now();

        let mut outcome = self.execute_step(workflow, step, ctx).await;
        if extracts_auth_token(workflow, step) {
            outcome.body = None;
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let status = if outcome.failures.is_empty() {
            tracing::info!("Step {} passed in {}ms", step.id, duration_ms);
            StepStatus::Passed
        } else {
            for failure in &outcome.failures {
                tracing::warn!("Step {} failed: {}", step.id, failure);
            }
            StepStatus::Failed
        };

        StepResult {
            step_id: step.id.clone(),
            name: step.name.clone(),
            status,
            status_code: outcome.status_code,
            body: outcome.body,
            failures: outcome.failures,
            extracted: outcome.extracted,
            started_at,
            duration_ms,
        }
    }

    async fn execute_step(
        &self,
        workflow: &WorkflowSpec,
        step: &StepSpec,
        ctx: &mut WorkflowContext,
    ) -> Outcome {
        let mut outcome = Outcome::default();

        let request = match self.prepare(workflow, step, ctx) {
            Ok(request) => request,
            Err(failure) => return outcome.fail(failure),
        };

        tracing::debug!(method = %request.method, path = %request.path, "Sending request");

        let response = match timeout(request.timeout, self.client.send(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return outcome.fail(StepFailure::new(FailureKind::Transport, format!("{:#}", e)))
            }
            Err(_) => {
                return outcome.fail(StepFailure::new(
                    FailureKind::Transport,
                    format!("request timed out after {}ms", request.timeout.as_millis()),
                ))
            }
        };

        outcome.status_code = Some(response.status);
        let parsed = parse_body(&response.body);

        if response.status != step.expect_status {
            outcome.body = parsed.ok();
            return outcome.fail(
                StepFailure::new(
                    FailureKind::UnexpectedStatus,
                    format!(
                        "expected status {} but got {}: {}",
                        step.expect_status,
                        response.status,
                        snippet(&response.body)
                    ),
                )
                .with_expected(step.expect_status.to_string())
                .with_actual(response.status.to_string()),
            );
        }

        let body = match parsed {
            Ok(body) => body,
            Err(e) => {
                return outcome.fail(
                    StepFailure::new(FailureKind::InvalidBody, format!("response is not JSON: {}", e))
                        .with_actual(response.body),
                )
            }
        };

        outcome.failures = step
            .assertions
            .iter()
            .filter_map(|assertion| assertion.check(&body, ctx).err())
            .collect();
        if !outcome.failures.is_empty() {
            outcome.body = Some(body);
            return outcome;
        }

        let mut values = Vec::with_capacity(step.extractions.len());
        for extraction in &step.extractions {
            match extraction.apply(&body, ctx) {
                Ok(value) => values.push((extraction.key().to_string(), value)),
                Err(failure) => {
                    outcome.body = Some(body);
                    return outcome.fail(failure);
                }
            }
        }

        let keys: Vec<String> = values.iter().map(|(k, _)| k.clone()).collect();
        outcome.body = Some(body);
        match ctx.insert_all(values) {
            Ok(()) => {
                outcome.extracted = keys;
                outcome
            }
            Err(e) => outcome.fail(StepFailure::new(FailureKind::ContextConflict, e.to_string())),
        }
    }

    /// Render the request against the current context
    fn prepare(
        &self,
        workflow: &WorkflowSpec,
        step: &StepSpec,
        ctx: &WorkflowContext,
    ) -> Result<HttpRequest, StepFailure> {
        let path = TemplateRenderer::render_str(&step.path, ctx).map_err(unresolved)?;

        let mut headers = Vec::new();
        for (name, template) in &workflow.headers {
            let value = TemplateRenderer::render_str(template, ctx).map_err(unresolved)?;
            set_header(&mut headers, name, value);
        }

        if step.auth {
            if let Some(auth) = &workflow.auth {
                if let Some(token) = ctx.get_text(&auth.token_key) {
                    set_header(&mut headers, &auth.header, format!("{} {}", auth.scheme, token));
                }
            }
        }

        for (name, template) in &step.headers {
            let value = TemplateRenderer::render_str(template, ctx).map_err(unresolved)?;
            set_header(&mut headers, name, value);
        }

        let body = step
            .body
            .as_ref()
            .map(|body| TemplateRenderer::render_value(body, ctx))
            .transpose()
            .map_err(unresolved)?;

        let timeout = step
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        Ok(HttpRequest {
            method: step.method,
            path,
            headers,
            body,
            timeout,
        })
    }
}

/// Responses of such steps carry the bearer token and stay out of the report
fn extracts_auth_token(workflow: &WorkflowSpec, step: &StepSpec) -> bool {
    workflow.auth.as_ref().is_some_and(|auth| {
        step.extractions
            .iter()
            .any(|extraction| extraction.key() == auth.token_key)
    })
}

fn unresolved(error: FlowError) -> StepFailure {
    StepFailure::new(FailureKind::UnresolvedReference, error.to_string())
}

/// Replace a header with the same name, or append it
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(existing) => existing.1 = value,
        None => headers.push((name.to_string(), value)),
    }
}

/// An empty body parses as null
fn parse_body(body: &str) -> Result<Value, serde_json::Error> {
    if body.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::ScriptedClient;
    use crate::types::{Assertion, AuthSpec, Extraction, HttpMethod, StepId};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn workflow() -> WorkflowSpec {
        WorkflowSpec {
            name: "steps".to_string(),
            description: None,
            vars: BTreeMap::new(),
            generate: vec![],
            headers: BTreeMap::from([("xTENANTID".to_string(), "{{tenant}}".to_string())]),
            auth: Some(AuthSpec {
                token_key: "accessToken".to_string(),
                header: "Authorization".to_string(),
                scheme: "Bearer".to_string(),
            }),
            steps: vec![],
        }
    }

    fn step() -> StepSpec {
        StepSpec {
            id: StepId::new("create"),
            name: "Create provider".to_string(),
            method: HttpMethod::Post,
            path: "/api/provider".to_string(),
            headers: BTreeMap::new(),
            body: Some(json!({"name": "{{name}}"})),
            expect_status: 201,
            auth: true,
            assertions: vec![Assertion::Contains {
                pointer: "/message".to_string(),
                value: "created".to_string(),
            }],
            extractions: vec![],
            timeout_secs: None,
        }
    }

    fn context() -> WorkflowContext {
        let mut ctx = WorkflowContext::new();
        ctx.insert("tenant", json!("stage")).unwrap();
        ctx.insert("name", json!("Steven Miller")).unwrap();
        ctx
    }

    fn executor(client: Arc<ScriptedClient>) -> StepExecutor {
        StepExecutor::new(client, Duration::from_secs(5))
    }

    #[test]
    fn test_prepare_merges_headers() {
        let client = Arc::new(ScriptedClient::new());
        let mut ctx = context();
        ctx.insert("accessToken", json!("tok")).unwrap();

        let mut step = step();
        step.headers
            .insert("xtenantid".to_string(), "override".to_string());

        let request = executor(client).prepare(&workflow(), &step, &ctx).unwrap();

        assert_eq!(request.header("Authorization"), Some("Bearer tok"));
        assert_eq!(request.header("XTENANTID"), Some("override"));
        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.body, Some(json!({"name": "Steven Miller"})));
        assert_eq!(request.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_prepare_without_token_or_auth() {
        let client = Arc::new(ScriptedClient::new());
        let ctx = context();
        let exec = executor(client);

        let request = exec.prepare(&workflow(), &step(), &ctx).unwrap();
        assert!(request.header("Authorization").is_none());

        let mut ctx = context();
        ctx.insert("accessToken", json!("tok")).unwrap();
        let mut step = step();
        step.auth = false;
        step.timeout_secs = Some(1);
        let request = exec.prepare(&workflow(), &step, &ctx).unwrap();
        assert!(request.header("Authorization").is_none());
        assert_eq!(request.timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_unresolved_reference_is_not_sent() {
        let client = Arc::new(ScriptedClient::new());
        let mut ctx = WorkflowContext::new();

        let result = executor(client.clone())
            .execute(&workflow(), &step(), &mut ctx)
            .await;

        assert!(!result.passed());
        assert_eq!(result.failures[0].kind, FailureKind::UnresolvedReference);
        assert!(result.status_code.is_none());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_status() {
        let client = Arc::new(
            ScriptedClient::new().reply(400, json!({"message": "Provider already exists"})),
        );
        let mut ctx = context();

        let result = executor(client).execute(&workflow(), &step(), &mut ctx).await;

        assert_eq!(result.status_code, Some(400));
        assert_eq!(result.failures.len(), 1);
        let failure = &result.failures[0];
        assert_eq!(failure.kind, FailureKind::UnexpectedStatus);
        assert_eq!(failure.expected.as_deref(), Some("201"));
        assert_eq!(failure.actual.as_deref(), Some("400"));
        assert!(failure.message.contains("Provider already exists"));
        assert_eq!(result.body, Some(json!({"message": "Provider already exists"})));
    }

    #[tokio::test]
    async fn test_invalid_body() {
        let client = Arc::new(ScriptedClient::new().reply_raw(201, "<html>oops</html>"));
        let mut ctx = context();

        let result = executor(client).execute(&workflow(), &step(), &mut ctx).await;

        assert_eq!(result.failures[0].kind, FailureKind::InvalidBody);
        assert_eq!(result.failures[0].actual.as_deref(), Some("<html>oops</html>"));
        assert!(result.body.is_none());
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let client = Arc::new(ScriptedClient::new().reply_raw(204, ""));
        let mut ctx = context();
        let mut step = step();
        step.expect_status = 204;
        step.assertions.clear();

        let result = executor(client).execute(&workflow(), &step, &mut ctx).await;

        assert!(result.passed());
        assert_eq!(result.body, Some(Value::Null));
    }

    #[tokio::test]
    async fn test_all_assertion_failures_recorded() {
        let client = Arc::new(ScriptedClient::new().reply(201, json!({"message": "nope"})));
        let mut ctx = context();
        let mut step = step();
        step.assertions.push(Assertion::Present {
            pointer: "/id".to_string(),
        });
        step.extractions.push(Extraction::Field {
            key: "id".to_string(),
            pointer: "/id".to_string(),
        });

        let result = executor(client).execute(&workflow(), &step, &mut ctx).await;

        assert_eq!(result.failures.len(), 2);
        assert!(result
            .failures
            .iter()
            .all(|f| f.kind == FailureKind::AssertionFailure));
        assert!(!ctx.contains("id"));
    }

    #[tokio::test]
    async fn test_extraction_merged_on_success() {
        let client = Arc::new(
            ScriptedClient::new().reply(201, json!({"message": "created", "id": "abc"})),
        );
        let mut ctx = context();
        let mut step = step();
        step.extractions.push(Extraction::Field {
            key: "id".to_string(),
            pointer: "/id".to_string(),
        });

        let result = executor(client).execute(&workflow(), &step, &mut ctx).await;

        assert!(result.passed());
        assert_eq!(result.extracted, vec!["id".to_string()]);
        assert_eq!(ctx.get("id"), Some(&json!("abc")));
    }

    #[tokio::test]
    async fn test_token_body_left_out_of_result() {
        let client = Arc::new(
            ScriptedClient::new().reply(200, json!({"access_token": "tok-secret"})),
        );
        let mut ctx = context();
        let mut login = step();
        login.expect_status = 200;
        login.auth = false;
        login.assertions.clear();
        login.extractions.push(Extraction::Field {
            key: "accessToken".to_string(),
            pointer: "/access_token".to_string(),
        });

        let result = executor(client).execute(&workflow(), &login, &mut ctx).await;

        assert!(result.passed());
        assert!(result.body.is_none());
        assert_eq!(result.extracted, vec!["accessToken".to_string()]);
        assert_eq!(ctx.get("accessToken"), Some(&json!("tok-secret")));
        assert!(!serde_json::to_string(&result).unwrap().contains("tok-secret"));
    }

    #[tokio::test]
    async fn test_partial_extraction_not_merged() {
        let client = Arc::new(
            ScriptedClient::new().reply(201, json!({"message": "created", "id": "abc"})),
        );
        let mut ctx = context();
        let mut step = step();
        step.extractions.push(Extraction::Field {
            key: "id".to_string(),
            pointer: "/id".to_string(),
        });
        step.extractions.push(Extraction::Field {
            key: "other".to_string(),
            pointer: "/other".to_string(),
        });

        let result = executor(client).execute(&workflow(), &step, &mut ctx).await;

        assert_eq!(result.failures[0].kind, FailureKind::MissingIdentifier);
        assert!(!ctx.contains("id"));
        assert!(result.extracted.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let client = Arc::new(ScriptedClient::new().fail("connection refused"));
        let mut ctx = context();

        let result = executor(client).execute(&workflow(), &step(), &mut ctx).await;

        assert_eq!(result.failures[0].kind, FailureKind::Transport);
        assert_eq!(result.failures[0].message, "connection refused");
        assert!(result.status_code.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_transport_failure() {
        let client = Arc::new(ScriptedClient::new().hang());
        let mut ctx = context();

        let result = executor(client).execute(&workflow(), &step(), &mut ctx).await;

        assert_eq!(result.failures[0].kind, FailureKind::Transport);
        assert!(result.failures[0].message.contains("timed out after 5000ms"));
    }
}
