//! Request/response transport.
//!
//! [`Transport`] is the seam between the sync logic and the network. The
//! production implementation is [`HttpTransport`] (reqwest); tests use
//! [`crate::backend::InMemoryBackend`].

use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::AdminConfig;
use crate::error::{Result, SyncError, TransportError};

/// HTTP method of an API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`.
    Get,
    /// `POST`.
    Post,
}

impl Method {
    /// Returns the method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request against the server, relative to its base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path plus optional query string.
    pub path: String,
    /// JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// A `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    /// A `POST` request with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// Status code.
    pub status: u16,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// A response with a JSON body.
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    /// Returns true for statuses in `200..=299`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status <= 299
    }

    /// Decodes the body.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Decode` if the body is not valid JSON for `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| SyncError::Decode(e.to_string()))
    }
}

/// Sends API requests and returns raw responses.
///
/// Only failures that prevent a response from being received are errors;
/// non-2xx statuses are returned as responses.
pub trait Transport: Send + Sync {
    /// Performs one request/response round trip.
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = std::result::Result<ApiResponse, TransportError>> + Send;
}

/// [`Transport`] over HTTP using reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpTransport {
    /// Creates a transport from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` if the configuration is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &AdminConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
            token: config
                .access_token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        })
    }

    /// Resolves a request path against the base URL, keeping any subpath
    /// the server is mounted under.
    fn resolve(&self, path: &str) -> std::result::Result<Url, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path}"))
            .map_err(|e| TransportError::new(format!("invalid request path '{path}': {e}")))
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        let url = self.resolve(&request.path)?;
        debug!(method = %request.method, url = %url, "sending request");

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        debug!(status, bytes = body.len(), "received response");
        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_range() {
        assert!(ApiResponse::json(200, &json!({})).is_success());
        assert!(ApiResponse::json(299, &json!({})).is_success());
        assert!(!ApiResponse::json(199, &json!({})).is_success());
        assert!(!ApiResponse::json(300, &json!({})).is_success());
        assert!(!ApiResponse::json(500, &json!({})).is_success());
    }

    #[test]
    fn decode_invalid_body() {
        let response = ApiResponse {
            status: 200,
            body: b"oops".to_vec(),
        };
        let result: Result<Value> = response.decode();
        assert!(matches!(result, Err(SyncError::Decode(_))));
    }

    #[test]
    fn resolve_keeps_subpath() {
        let config = AdminConfig {
            server_url: "https://example.com/chat/".to_string(),
            ..AdminConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        let url = transport.resolve("/api/v4/channels").unwrap();
        assert_eq!(url.as_str(), "https://example.com/chat/api/v4/channels");
    }

    #[test]
    fn blank_token_is_dropped() {
        let config = AdminConfig {
            access_token: Some("  ".to_string()),
            ..AdminConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert!(transport.token.is_none());
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = AdminConfig {
            server_url: "not a url".to_string(),
            ..AdminConfig::default()
        };
        assert!(matches!(HttpTransport::new(&config), Err(SyncError::Config(_))));
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let config = AdminConfig {
            server_url: "http://127.0.0.1:1".to_string(),
            request_timeout_secs: 2,
            ..AdminConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        let result = transport.send(ApiRequest::get("/api/v4/channels")).await;
        assert!(result.is_err());
    }
}
