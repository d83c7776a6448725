//! Plain HTTP verb client bound to one base URL.
//!
//! `HttpClient` issues GET/POST/PATCH/PUT/DELETE against `host + path`
//! and decodes the JSON response. Non-2xx responses become
//! `ApiError::HttpStatus`; connection and timeout failures become
//! `ApiError::Transport`.

use std::fmt::Display;
use std::time::Duration;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Connect timeout applied to the shared connection pool.
pub const CONNECT_TIMEOUT_SECS: u64 = 15;

/// Default per-request timeout once the connection is established.
pub const READ_TIMEOUT_SECS: u64 = 15;

/// Request body variants accepted by the write verbs.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// Per-call request options: query, extra headers, body and timeout.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Body,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a header, replacing any earlier value with the same (case-insensitive) name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn form<K: Into<String>, V: Into<String>>(
        mut self,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.body = Body::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Build the connection pool shared by every client of one portal.
pub fn build_client() -> Result<Client, ApiError> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()?)
}

/// HTTP client for one base URL.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    url: String,
}

impl HttpClient {
    /// Create a client with its own connection pool
    pub fn new(host: &str, path: &str) -> Result<Self, ApiError> {
        Ok(Self::with_client(build_client()?, host, path))
    }

    /// Create a client that shares an existing connection pool.
    /// The URL is `host + path` with no slash normalisation.
    pub fn with_client(client: Client, host: &str, path: &str) -> Self {
        Self {
            client,
            url: format!("{}{}", host, path),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn resource_url(&self, id: impl Display) -> String {
        format!("{}/{}", self.url, id)
    }

    pub async fn get<T: DeserializeOwned>(&self, options: RequestOptions) -> Result<T, ApiError> {
        self.send(Method::GET, &self.url, options).await
    }

    pub async fn post<T: DeserializeOwned>(&self, options: RequestOptions) -> Result<T, ApiError> {
        self.send(Method::POST, &self.url, options).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        id: impl Display,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.send(Method::PATCH, &self.resource_url(id), options).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        id: impl Display,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.send(Method::PUT, &self.resource_url(id), options).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        id: impl Display,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.send(Method::DELETE, &self.resource_url(id), options).await
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        debug!(method = %method, url = url, "Sending HTTP request");

        let timeout = options
            .timeout
            .unwrap_or(Duration::from_secs(READ_TIMEOUT_SECS));
        let mut request = self.client.request(method.clone(), url).timeout(timeout);

        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request = match options.body {
            Body::Empty => request,
            Body::Json(ref body) => request.json(body),
            Body::Form(ref fields) => request.form(fields),
        };

        let response = request.send().await?;
        let response = Self::check_response(response).await?;
        debug!(method = %method, url = url, status = %response.status(), "Request successful");

        let text = response.text().await?;
        // Empty bodies (e.g. 204 on DELETE) decode as JSON null
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }
}
