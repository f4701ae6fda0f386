// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound events
//! and captured outbound messages and typing notifications for assertion in
//! tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use ghostwriter_core::traits::adapter::PluginAdapter;
use ghostwriter_core::traits::channel::ChannelAdapter;
use ghostwriter_core::types::{
    AdapterType, HealthStatus, InboundEvent, MessageId, OutboundMessage,
};
use ghostwriter_core::GhostwriterError;

/// A mock messaging channel for testing.
///
/// Provides three queues:
/// - **inbound**: Events injected via `inject()` are returned by `receive()`
/// - **sent**: Messages passed to `send()` are captured and retrievable via `sent_messages()`
/// - **typing**: Calls to `send_typing()` are captured as `(conversation, link)` pairs
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundEvent>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    typing: Arc<Mutex<Vec<(String, Option<String>)>>>,
    notify: Arc<Notify>,
    closed: AtomicBool,
    fail_sends: AtomicBool,
    fail_typing: AtomicBool,
    next_id: AtomicU64,
}

impl MockChannel {
    /// Create a new mock channel with empty queues.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            typing: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            closed: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            fail_typing: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    /// Inject an inbound event into the receive queue.
    pub async fn inject(&self, event: InboundEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Close the channel: once the injected events are consumed, `receive()`
    /// fails with a "closed" error.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Make `send()` fail until turned off again.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Make `send_typing()` fail until turned off again.
    pub fn fail_typing(&self, fail: bool) {
        self.fail_typing.store(fail, Ordering::SeqCst);
    }

    /// Get all messages that were sent through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Get the count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Get all typing notifications, as `(conversation_id, business_link)`.
    pub async fn typing_notifications(&self) -> Vec<(String, Option<String>)> {
        self.typing.lock().await.clone()
    }

    /// Clear all captured messages and typing notifications.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
        self.typing.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, GhostwriterError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GhostwriterError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn connect(&mut self) -> Result<(), GhostwriterError> {
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, GhostwriterError> {
        loop {
            let notified = self.notify.notified();
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(GhostwriterError::Channel {
                    message: "mock channel closed".into(),
                    source: None,
                });
            }
            // Wait for notification that a new event was injected
            notified.await;
        }
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, GhostwriterError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(GhostwriterError::Channel {
                message: "injected send failure".into(),
                source: None,
            });
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().await.push(msg);
        Ok(MessageId(format!("mock-msg-{id}")))
    }

    async fn send_typing(
        &self,
        conversation_id: &str,
        business_link: Option<&str>,
    ) -> Result<(), GhostwriterError> {
        if self.fail_typing.load(Ordering::SeqCst) {
            return Err(GhostwriterError::Channel {
                message: "injected typing failure".into(),
                source: None,
            });
        }
        self.typing
            .lock()
            .await
            .push((conversation_id.to_string(), business_link.map(String::from)));
        Ok(())
    }
}
