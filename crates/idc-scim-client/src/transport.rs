//! Resource transport.
//!
//! [`Transport`] is the seam between the typed client and the network: it
//! moves raw JSON to and from a resource path. [`HttpTransport`] is the
//! reqwest implementation; tests substitute an in-memory directory.

use crate::auth::ScimAuth;
use crate::config::ScimConfig;
use crate::error::{ConfigError, ProtocolError, ScimClientError, ScimClientResult};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Media type of every request and response body.
pub const SCIM_CONTENT_TYPE: &str = "application/scim+json";

/// Raw JSON access to directory resources.
///
/// `path` is relative to the SCIM base URL and starts with `/`
/// (`/Users`, `/Groups/{id}`). Responses with no body (204 or empty) yield
/// `None`. A non-success status fails with [`ScimClientError::Protocol`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> ScimClientResult<Option<Value>>;

    async fn post(&self, path: &str, body: &Value) -> ScimClientResult<Option<Value>>;

    async fn put(&self, path: &str, body: &Value) -> ScimClientResult<Option<Value>>;

    async fn patch(&self, path: &str, body: &Value) -> ScimClientResult<Option<Value>>;

    async fn delete(&self, path: &str) -> ScimClientResult<()>;
}

/// Transport over HTTPS with connection reuse.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// SCIM base URL without trailing slash.
    base_url: String,
    auth: ScimAuth,
    http_client: Client,
}

impl HttpTransport {
    /// Build a transport with the configured per-request deadline.
    pub fn new(config: &ScimConfig) -> ScimClientResult<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("idc-scim-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ScimClientError::Config(ConfigError::InvalidValue {
                    var: "http client".to_string(),
                    message: e.to_string(),
                })
            })?;
        Ok(Self::with_http_client(
            config.endpoint(),
            ScimAuth::bearer(config.token()),
            http_client,
        ))
    }

    /// Use a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(base_url: &str, auth: ScimAuth, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            http_client,
        }
    }

    /// Convenience constructor with a default client and timeout.
    pub fn with_token(base_url: &str, token: &str, timeout: Duration) -> ScimClientResult<Self> {
        let config = ScimConfig::new(base_url, token, timeout)?;
        Self::new(&config)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self
            .http_client
            .request(method, url)
            .header(reqwest::header::ACCEPT, SCIM_CONTENT_TYPE);
        self.auth.apply(builder)
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: &Value,
    ) -> ScimClientResult<Option<Value>> {
        debug!(method = %method, path, "SCIM request");
        let bytes = serde_json::to_vec(body)?;
        let response = self
            .request(method, path)
            .header(reqwest::header::CONTENT_TYPE, SCIM_CONTENT_TYPE)
            .body(bytes)
            .send()
            .await?;
        handle_response(response).await
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> ScimClientResult<Option<Value>> {
        debug!(path, ?query, "SCIM GET");
        let mut builder = self.request(Method::GET, path);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        let response = builder.send().await?;
        handle_response(response).await
    }

    async fn post(&self, path: &str, body: &Value) -> ScimClientResult<Option<Value>> {
        self.send_json(Method::POST, path, body).await
    }

    async fn put(&self, path: &str, body: &Value) -> ScimClientResult<Option<Value>> {
        self.send_json(Method::PUT, path, body).await
    }

    async fn patch(&self, path: &str, body: &Value) -> ScimClientResult<Option<Value>> {
        self.send_json(Method::PATCH, path, body).await
    }

    async fn delete(&self, path: &str) -> ScimClientResult<()> {
        debug!(path, "SCIM DELETE");
        let response = self.request(Method::DELETE, path).send().await?;
        handle_response(response).await.map(|_| ())
    }
}

async fn handle_response(response: reqwest::Response) -> ScimClientResult<Option<Value>> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let error = ProtocolError::from_response(status.as_u16(), &body);
        debug!(status = status.as_u16(), error = %error, "SCIM request rejected");
        return Err(error.into());
    }

    if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&body)
        .map(Some)
        .map_err(|e| ScimClientError::ParseError(format!("Failed to parse response: {e}")))
}
