// src/api/client.rs
//! Pure HTTP client wrapper for Microsoft Graph.
//!
//! This module provides a thin wrapper around reqwest for issuing
//! authenticated GET requests. It captures the status, the throttling hint
//! and the body, and leaves parsing to [`super::parser`].

use std::time::Duration;

use reqwest::{header, Client, Response};

use crate::constants::REQUEST_TIMEOUT;
use crate::error::AppError;

/// Header carrying a per-request correlation id, echoed by the service.
const CLIENT_REQUEST_ID: &str = "client-request-id";

/// A thin wrapper around reqwest Client for Graph requests.
#[derive(Debug, Clone)]
pub struct GraphHttpClient {
    client: Client,
}

impl GraphHttpClient {
    /// Creates a new HTTP client with Graph's default headers.
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers())
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Creates the default headers for Graph requests.
    fn create_headers() -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers
    }

    /// The underlying reqwest client, for token requests.
    pub(crate) fn inner(&self) -> &Client {
        &self.client
    }

    /// Makes an authenticated GET request to an absolute URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The full request URL, including the query string
    /// * `bearer` - The access token
    /// * `extra_headers` - Request-specific headers such as `ConsistencyLevel`
    pub async fn get(
        &self,
        url: &str,
        bearer: &str,
        extra_headers: &[(&'static str, &'static str)],
    ) -> Result<ApiResponse<String>, AppError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        log::debug!("GET {} ({}={})", url, CLIENT_REQUEST_ID, request_id);

        let mut request = self
            .client
            .get(url)
            .bearer_auth(bearer)
            .header(CLIENT_REQUEST_ID, &request_id);

        for (name, value) in extra_headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            log::info!("graph api throttling: GET {}", url);
        }

        extract_response_text(response).await
    }
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: reqwest::StatusCode,
    pub url: String,
    /// Parsed `Retry-After` header (seconds form only).
    pub retry_after: Option<Duration>,
}

/// Reads a `Retry-After` value given in whole or fractional seconds.
pub(crate) fn parse_retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Extracts the response body as text with metadata.
pub async fn extract_response_text(response: Response) -> Result<ApiResponse<String>, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    let retry_after = parse_retry_after(response.headers());
    let text = response.text().await?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
        retry_after,
    })
}
