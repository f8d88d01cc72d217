//! HTTP client abstraction for the completion API.
//!
//! This module provides a trait-based abstraction over HTTP clients, enabling
//! dependency injection and easy mocking in tests.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;

/// Status and body of an HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP communication with external APIs.
///
/// # Example
///
/// ```ignore
/// use sudothink::http_client::{HttpClient, ReqwestHttpClient};
///
/// let client = ReqwestHttpClient::new();
/// let response = client.post_json(
///     "https://api.example.com/endpoint",
///     &[("Authorization", "Bearer sk-...")],
///     &serde_json::json!({"key": "value"}),
/// ).await?;
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a POST request with a JSON body.
    ///
    /// Non-success statuses are returned as responses, not errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the body cannot be
    /// read.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse>;
}

/// HTTP client implementation using reqwest.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        let response = request.json(body).send().await?;
        let status = response.status().as_u16();
        Ok(HttpResponse {
            status,
            body: response.text().await?,
        })
    }
}
