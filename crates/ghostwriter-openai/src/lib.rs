// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI provider adapter for the Ghostwriter relay.
//!
//! This crate implements [`ProviderAdapter`] for the OpenAI Chat Completions
//! API. It is the remote backend and takes precedence over the local one
//! whenever an API key is configured.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use ghostwriter_config::model::OpenAiConfig;
use ghostwriter_core::error::GhostwriterError;
use ghostwriter_core::traits::{PluginAdapter, ProviderAdapter};
use ghostwriter_core::types::{AdapterType, ChatMessage, HealthStatus};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{ApiMessage, ChatCompletionRequest};

/// OpenAI provider implementing [`ProviderAdapter`].
///
/// Without an API key the provider is constructed but reports itself
/// unavailable, so the gateway moves on to the next backend.
pub struct OpenAiProvider {
    client: Option<OpenAiClient>,
}

impl OpenAiProvider {
    /// Creates a provider from the `[openai]` configuration section.
    ///
    /// The key is expected to be resolved already (config, then `OPENAI_API_KEY`).
    pub fn new(config: &OpenAiConfig) -> Result<Self, GhostwriterError> {
        let client = match config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(key) => {
                info!(model = %config.model, "OpenAI provider initialized");
                Some(OpenAiClient::new(
                    key,
                    config.model.clone(),
                    &config.base_url,
                    Duration::from_secs(config.request_timeout_secs),
                )?)
            }
            None => {
                debug!("no OpenAI API key configured, remote provider disabled");
                None
            }
        };
        Ok(Self { client })
    }

    fn to_request(client: &OpenAiClient, messages: &[ChatMessage]) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: client.model().to_string(),
            messages: messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.to_string(),
                    content: Some(m.content.clone()),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, GhostwriterError> {
        // No API call: health checks must not spend tokens.
        Ok(match self.client {
            Some(_) => HealthStatus::Healthy,
            None => HealthStatus::Unhealthy("no API key configured".into()),
        })
    }

    async fn shutdown(&self) -> Result<(), GhostwriterError> {
        debug!("OpenAI provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    fn is_available(&self) -> bool {
        self.client.is_some()
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<ChatMessage, GhostwriterError> {
        let client = self
            .client
            .as_ref()
            .ok_or(GhostwriterError::NoProviderConfigured)?;

        let response = client.complete(&Self::to_request(client, messages)).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GhostwriterError::ProviderRejected {
                message: "response contained no choices".into(),
                source: None,
            })?;

        let content = choice
            .message
            .content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| GhostwriterError::ProviderRejected {
                message: "response contained no text content".into(),
                source: None,
            })?;

        debug!(
            model = response.model.as_deref().unwrap_or(client.model()),
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            "OpenAI reply generated"
        );
        Ok(ChatMessage::assistant(content))
    }
}
