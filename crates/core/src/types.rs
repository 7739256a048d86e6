use crate::error::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

/// Unique identifier for a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a workflow step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(pub String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// HTTP method of a step request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered, linear API workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Static values seeded into the context before the first step
    #[serde(default)]
    pub vars: BTreeMap<String, Value>,
    /// Values produced by generators before the first step
    #[serde(default)]
    pub generate: Vec<Generator>,
    /// Header templates sent with every step
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub auth: Option<AuthSpec>,
    pub steps: Vec<StepSpec>,
}

impl WorkflowSpec {
    /// Parse a workflow from a TOML document
    pub fn from_toml_str(content: &str) -> FlowResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a workflow from a TOML file
    pub fn load(path: impl AsRef<Path>) -> FlowResult<Self> {
        let content = std::fs::read_to_string(path).map_err(FlowError::Io)?;
        Self::from_toml_str(&content)
    }

    pub fn step(&self, id: &StepId) -> Option<&StepSpec> {
        self.steps.iter().find(|s| &s.id == id)
    }
}

/// Bearer-token propagation once a login step has produced a token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSpec {
    /// Context key holding the token
    pub token_key: String,
    #[serde(default = "default_auth_header")]
    pub header: String,
    #[serde(default = "default_auth_scheme")]
    pub scheme: String,
}

fn default_auth_header() -> String {
    "Authorization".to_string()
}

fn default_auth_scheme() -> String {
    "Bearer".to_string()
}

/// A single request/validate/extract unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    pub id: StepId,
    pub name: String,
    #[serde(default)]
    pub method: HttpMethod,
    /// Path template, joined onto the client's base URL
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// JSON body template
    #[serde(default)]
    pub body: Option<Value>,
    pub expect_status: u16,
    /// Whether the auth header is attached to this step
    #[serde(default = "default_true")]
    pub auth: bool,
    #[serde(default, rename = "assert")]
    pub assertions: Vec<Assertion>,
    #[serde(default, rename = "extract")]
    pub extractions: Vec<Extraction>,
    /// Overrides the runner's request timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

/// Predicate evaluated against a parsed response body.
///
/// Fields are addressed with JSON Pointer (`/message`, `/data/0/uuid`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assertion {
    /// String at `pointer` contains the rendered `value`
    Contains { pointer: String, value: String },
    /// Value at `pointer` equals the rendered `value`
    Equals { pointer: String, value: Value },
    /// Value at `pointer` exists and is truthy
    Present { pointer: String },
}

/// Derives a new context entry from a parsed response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Extraction {
    /// Copy the value at `pointer`
    Field { key: String, pointer: String },
    /// First element of the array at `collection` whose `match_field` equals
    /// the rendered `equals`; its `select` field is stored
    Lookup {
        key: String,
        collection: String,
        match_field: String,
        equals: String,
        select: String,
    },
}

impl Extraction {
    /// Context key written by this extraction
    pub fn key(&self) -> &str {
        match self {
            Self::Field { key, .. } | Self::Lookup { key, .. } => key,
        }
    }
}

/// Seed value produced before the run starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Generator {
    /// `template` with `{{unique}}` replaced by a token from the unique source
    Unique { key: String, template: String },
    /// Today's date plus `offset_days`
    Date {
        key: String,
        #[serde(default)]
        offset_days: i64,
        #[serde(default = "default_date_format")]
        format: String,
    },
}

impl Generator {
    pub fn key(&self) -> &str {
        match self {
            Self::Unique { key, .. } | Self::Date { key, .. } => key,
        }
    }
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}
