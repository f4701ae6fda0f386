// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama provider adapter for the Ghostwriter relay.
//!
//! Talks to a local Ollama server through its native `/api/chat` endpoint.
//! The provider is only available when a server URL is configured.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use ghostwriter_config::model::OllamaConfig;
use ghostwriter_core::error::GhostwriterError;
use ghostwriter_core::traits::{PluginAdapter, ProviderAdapter};
use ghostwriter_core::types::{AdapterType, ChatMessage, HealthStatus};
use tracing::{debug, info};

use crate::types::{ChatRequest, ChatResponse, ErrorResponse, OllamaMessage};

/// Ollama provider implementing [`ProviderAdapter`].
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: Option<String>,
    model: String,
}

impl OllamaProvider {
    /// Creates a provider from the `[ollama]` configuration section.
    pub fn new(config: &OllamaConfig) -> Result<Self, GhostwriterError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GhostwriterError::Config(format!("failed to build HTTP client: {e}")))?;

        let base_url = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| u.trim_end_matches('/').to_string());

        match &base_url {
            Some(url) => info!(url = %url, model = %config.model, "Ollama provider initialized"),
            None => debug!("no Ollama URL configured, local provider disabled"),
        }

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
        })
    }

    /// Returns the configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, base_url: &str, request: &ChatRequest) -> Result<ChatResponse, GhostwriterError> {
        let response = self
            .client
            .post(format!("{base_url}/api/chat"))
            .json(request)
            .send()
            .await
            .map_err(|e| GhostwriterError::ProviderUnreachable {
                message: format!("Ollama request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "Ollama response received");

        if status.is_success() {
            return response
                .json::<ChatResponse>()
                .await
                .map_err(|e| GhostwriterError::ProviderRejected {
                    message: format!("failed to parse Ollama response: {e}"),
                    source: Some(Box::new(e)),
                });
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        let message = format!("Ollama returned {status}: {detail}");

        if matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504) {
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

#[async_trait]
impl PluginAdapter for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, GhostwriterError> {
        let Some(base_url) = &self.base_url else {
            return Ok(HealthStatus::Unhealthy("no server URL configured".into()));
        };
        match self.client.get(format!("{base_url}/api/tags")).send().await {
            Ok(resp) if resp.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(resp) => Ok(HealthStatus::Degraded(format!(
                "server returned {}",
                resp.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), GhostwriterError> {
        debug!("Ollama provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OllamaProvider {
    fn is_available(&self) -> bool {
        self.base_url.is_some()
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<ChatMessage, GhostwriterError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or(GhostwriterError::NoProviderConfigured)?;

        let request = ChatRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream: false,
        };

        let response = self.chat(base_url, &request).await?;
        if response.message.content.is_empty() {
            return Err(GhostwriterError::ProviderRejected {
                message: "Ollama returned an empty reply".into(),
                source: None,
            });
        }

        debug!(
            model = response.model.as_deref().unwrap_or(&self.model),
            done = response.done,
            "Ollama reply generated"
        );
        Ok(ChatMessage::assistant(response.message.content))
    }
}
