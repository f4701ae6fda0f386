// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenAI Chat Completions API.
//!
//! Provides [`OpenAiClient`] which handles request construction,
//! authentication, and mapping HTTP failures onto the relay's error taxonomy.
//! It never retries: retry policy belongs to the reply queue.

use std::time::Duration;

use ghostwriter_core::GhostwriterError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};

/// HTTP client for OpenAI API communication.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    model: String,
    endpoint: String,
}

impl OpenAiClient {
    /// Creates a new OpenAI API client.
    ///
    /// `base_url` is the API root (e.g. `https://api.openai.com/v1`);
    /// requests go to `{base_url}/chat/completions`.
    pub fn new(
        api_key: &str,
        model: String,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, GhostwriterError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                GhostwriterError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| GhostwriterError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            model,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    /// Returns the model identifier used for requests.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends a non-streaming completion request and returns the parsed response.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, GhostwriterError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| GhostwriterError::ProviderUnreachable {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "completion response received");

        if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| GhostwriterError::ProviderUnreachable {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
            return serde_json::from_str(&body).map_err(|e| GhostwriterError::ProviderRejected {
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(api_err) => format!(
                "OpenAI API error ({}): {}",
                api_err.error.type_.as_deref().unwrap_or("unknown"),
                api_err.error.message
            ),
            Err(_) => format!("API returned {status}: {body}"),
        };

        if is_transient_error(status) {
            Err(GhostwriterError::ProviderUnreachable {
                message,
                source: None,
            })
        } else {
            Err(GhostwriterError::ProviderRejected {
                message,
                source: None,
            })
        }
    }
}

/// Returns true for HTTP status codes that mean the backend is temporarily unavailable.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}
