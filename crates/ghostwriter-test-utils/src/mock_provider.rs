// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured replies
//! and failures, enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use ghostwriter_core::traits::adapter::PluginAdapter;
use ghostwriter_core::traits::provider::ProviderAdapter;
use ghostwriter_core::types::{AdapterType, ChatMessage, HealthStatus};
use ghostwriter_core::GhostwriterError;

/// Failure a scripted call should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    /// `ProviderUnreachable`, as for a timeout or connection refusal.
    Unreachable,
    /// `ProviderRejected`, as for an unknown model.
    Rejected,
}

impl ScriptedFailure {
    fn to_error(self) -> GhostwriterError {
        match self {
            Self::Unreachable => GhostwriterError::ProviderUnreachable {
                message: "scripted: backend unreachable".into(),
                source: None,
            },
            Self::Rejected => GhostwriterError::ProviderRejected {
                message: "scripted: request rejected".into(),
                source: None,
            },
        }
    }
}

/// A mock LLM provider that returns pre-configured replies.
///
/// Scripted results are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned. Every request is recorded.
pub struct MockProvider {
    name: String,
    available: AtomicBool,
    delay_ms: AtomicU64,
    script: Mutex<VecDeque<Result<String, ScriptedFailure>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockProvider {
    /// Create an available mock provider with an empty script.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: AtomicBool::new(true),
            delay_ms: AtomicU64::new(0),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Pre-load the given replies.
    pub fn with_responses<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let script = responses.into_iter().map(|r| Ok(r.into())).collect();
        Self {
            script: Mutex::new(script),
            ..self
        }
    }

    /// Set whether the provider reports itself available.
    pub fn with_availability(self, available: bool) -> Self {
        self.set_available(available);
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay every `generate()` call by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Add a reply to the end of the script.
    pub async fn push_response(&self, text: impl Into<String>) {
        self.script.lock().await.push_back(Ok(text.into()));
    }

    /// Add a failure to the end of the script.
    pub async fn push_failure(&self, failure: ScriptedFailure) {
        self.script.lock().await.push_back(Err(failure));
    }

    /// All message lists passed to `generate()`, in call order.
    pub async fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, GhostwriterError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GhostwriterError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<ChatMessage, GhostwriterError> {
        self.requests.lock().await.push(messages.to_vec());

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let next = self.script.lock().await.pop_front();
        match next {
            Some(Ok(text)) => Ok(ChatMessage::assistant(text)),
            Some(Err(failure)) => Err(failure.to_error()),
            None => Ok(ChatMessage::assistant("mock response")),
        }
    }
}
