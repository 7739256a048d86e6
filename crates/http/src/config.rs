//! Configuration types for the HTTP client.

use std::time::Duration;
use url::Url;

/// Configuration for [`crate::ReqwestClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL that step paths are joined onto.
    pub base_url: Url,
    /// Client-wide request timeout. Requests may set a shorter one.
    pub timeout: Duration,
    /// Headers sent with every request, before step headers.
    pub default_headers: Vec<(String, String)>,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a new configuration with the given base URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(30),
            default_headers: Vec::new(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("flowprobe/{}", env!("CARGO_PKG_VERSION"))
}
