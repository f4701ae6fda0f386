// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider-agnostic reply generation.
//!
//! The gateway holds backends in priority order and, on every call, hands
//! the request to the first one that reports itself available. It never
//! retries and never falls through to the next backend after a failure:
//! selection depends on configuration only.

use std::sync::Arc;

use ghostwriter_core::{ChatMessage, GhostwriterError, ProviderAdapter};
use tracing::debug;

/// Ordered list of LLM backends.
pub struct LlmGateway {
    providers: Vec<Arc<dyn ProviderAdapter + Send + Sync>>,
}

impl LlmGateway {
    /// Creates a gateway; earlier providers take precedence.
    pub fn new(providers: Vec<Arc<dyn ProviderAdapter + Send + Sync>>) -> Self {
        Self { providers }
    }

    /// The provider that would serve the next call.
    pub fn select(&self) -> Option<&Arc<dyn ProviderAdapter + Send + Sync>> {
        self.providers.iter().find(|p| p.is_available())
    }

    pub fn has_available_provider(&self) -> bool {
        self.select().is_some()
    }

    /// Names of all configured providers, available or not, in priority order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Generates the assistant reply to `messages`.
    pub async fn generate(&self, messages: &[ChatMessage]) -> Result<ChatMessage, GhostwriterError> {
        let provider = self.select().ok_or(GhostwriterError::NoProviderConfigured)?;
        debug!(
            provider = provider.name(),
            messages = messages.len(),
            "generating reply"
        );
        provider.generate(messages).await
    }
}
