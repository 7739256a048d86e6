//! reqwest implementation of the workflow HTTP client.

use crate::config::ClientConfig;
use crate::error::{HttpError, HttpResult};
use flowprobe_core::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use reqwest::{header, Client, Method};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP client that sends rendered workflow requests.
///
/// Non-success statuses are returned as responses; only transport problems
/// are errors. No retries are attempted.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
    config: Arc<ClientConfig>,
}

impl ReqwestClient {
    /// Create a new client builder.
    pub fn builder() -> ReqwestClientBuilder {
        ReqwestClientBuilder::new()
    }

    /// Create a client from configuration.
    pub fn new(config: ClientConfig) -> HttpResult<Self> {
        let mut headers = header::HeaderMap::new();
        for (name, value) in &config.default_headers {
            let (name, value) = encode_header(name, value)?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a URL for the given path.
    ///
    /// Follows URL join rules: an absolute path replaces the base URL's path.
    fn build_url(&self, path: &str) -> HttpResult<Url> {
        self.config.base_url.join(path).map_err(HttpError::InvalidUrl)
    }

    /// Send a request and read the full response body.
    pub async fn execute(&self, request: &HttpRequest) -> HttpResult<HttpResponse> {
        let url = self.build_url(&request.path)?;
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), url)
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            let (name, value) = encode_header(name, value)?;
            builder = builder.header(name, value);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(HttpError::from_reqwest)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(HttpError::from_reqwest)?;

        debug!(status = status, bytes = body.len(), "Received response");

        Ok(HttpResponse { status, body })
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: &HttpRequest) -> anyhow::Result<HttpResponse> {
        Ok(self.execute(request).await?)
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn encode_header(name: &str, value: &str) -> HttpResult<(header::HeaderName, header::HeaderValue)> {
    let header_name = header::HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| HttpError::InvalidHeader(name.to_string()))?;
    let header_value =
        header::HeaderValue::from_str(value).map_err(|_| HttpError::InvalidHeader(name.to_string()))?;
    Ok((header_name, header_value))
}

/// Builder for creating a ReqwestClient.
pub struct ReqwestClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    default_headers: Vec<(String, String)>,
    user_agent: Option<String>,
}

impl ReqwestClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            default_headers: Vec::new(),
            user_agent: None,
        }
    }

    /// Set the base URL of the service under test.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the client-wide request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a header sent with every request.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Override the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> HttpResult<ReqwestClient> {
        let base_url_str = self
            .base_url
            .ok_or_else(|| HttpError::Config("base_url is required".to_string()))?;

        let base_url = Url::parse(&base_url_str)?;

        let mut config = ClientConfig::new(base_url);
        config.timeout = self.timeout;
        config.default_headers = self.default_headers;
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }

        ReqwestClient::new(config)
    }
}

impl Default for ReqwestClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
