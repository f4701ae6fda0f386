// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete relay with mock channel and provider
//! over a temp SQLite database. Tests drive it with `deliver()` (one inbound
//! event) and `tick()` (one scheduler tick) instead of waiting on the cron
//! schedule.

use std::sync::Arc;

use ghostwriter_config::model::{
    ChatBinding, ChatId, GhostwriterConfig, InstructionSetConfig, StorageConfig,
};
use ghostwriter_core::{
    ChatMessage, GhostwriterError, InboundEvent, ProviderAdapter, StorageAdapter,
};
use ghostwriter_relay::queue::REPLY_QUEUE;
use ghostwriter_relay::{
    BusinessLinkRegistry, HistoryStore, IngestOutcome, Relay, TickOutcome,
};
use ghostwriter_storage::SqliteStorage;
use tokio_util::sync::CancellationToken;

use crate::mock_channel::MockChannel;
use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: GhostwriterConfig,
    responses: Vec<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: GhostwriterConfig::default(),
            responses: Vec::new(),
        }
    }

    /// Start from a full configuration instead of the defaults.
    pub fn with_config(mut self, config: GhostwriterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set mock provider responses.
    pub fn with_mock_responses<I, S>(mut self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.responses = responses.into_iter().map(Into::into).collect();
        self
    }

    /// Sender ids classified as the relay itself.
    pub fn with_own_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.bot.own_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Define an instruction set.
    pub fn with_instruction_set(mut self, id: &str, directives: &[&str]) -> Self {
        self.config.instruction_sets.insert(
            id.to_string(),
            InstructionSetConfig {
                name: id.to_string(),
                description: String::new(),
                instructions: directives.iter().map(|d| d.to_string()).collect(),
            },
        );
        self
    }

    /// Bind conversations to an instruction set.
    pub fn with_binding(mut self, instruction_set: &str, conversation_ids: &[&str]) -> Self {
        self.config.chats.push(ChatBinding {
            instruction_set: instruction_set.to_string(),
            ids: conversation_ids
                .iter()
                .map(|id| ChatId::Text(id.to_string()))
                .collect(),
        });
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.queue.max_attempts = max_attempts;
        self
    }

    pub fn with_replies_per_tick(mut self, replies_per_tick: usize) -> Self {
        self.config.schedule.replies_per_tick = replies_per_tick;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, GhostwriterError> {
        let temp_dir = tempfile::TempDir::new().map_err(GhostwriterError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter + Send + Sync> = Arc::new(storage);
        tracing::debug!(path = %db_path.display(), "test harness storage ready");

        let mock_provider =
            Arc::new(MockProvider::new("mock-provider").with_responses(self.responses));
        let mock_channel = Arc::new(MockChannel::new());

        let relay = Relay::from_config(
            &config,
            storage.clone(),
            mock_channel.clone(),
            vec![mock_provider.clone() as Arc<dyn ProviderAdapter + Send + Sync>],
        )?;

        Ok(TestHarness {
            mock_provider,
            mock_channel,
            storage,
            relay,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// The mock LLM provider.
    pub mock_provider: Arc<MockProvider>,
    /// The mock channel adapter.
    pub mock_channel: Arc<MockChannel>,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter + Send + Sync>,
    /// The relay under test.
    pub relay: Relay,
    /// Effective configuration.
    pub config: GhostwriterConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Ingest one inbound event.
    pub async fn deliver(&self, event: InboundEvent) -> Result<IngestOutcome, GhostwriterError> {
        self.relay.ingestion().ingest(event).await
    }

    /// Ingest a text message from `sender` in `conversation`.
    pub async fn message(
        &self,
        conversation: &str,
        sender: &str,
        text: &str,
    ) -> Result<IngestOutcome, GhostwriterError> {
        self.deliver(InboundEvent {
            conversation_id: Some(conversation.to_string()),
            sender_id: Some(sender.to_string()),
            text: Some(text.to_string()),
            business_link: None,
        })
        .await
    }

    /// Run one scheduler tick.
    pub async fn tick(&self) -> Result<Vec<TickOutcome>, GhostwriterError> {
        self.relay.orchestrator().tick(&CancellationToken::new()).await
    }

    /// Stored history of a conversation.
    pub async fn history(&self, conversation: &str) -> Result<Vec<ChatMessage>, GhostwriterError> {
        HistoryStore::new(self.storage.clone()).read(conversation).await
    }

    /// Stored business link of a conversation.
    pub async fn business_link(
        &self,
        conversation: &str,
    ) -> Result<Option<String>, GhostwriterError> {
        BusinessLinkRegistry::new(self.storage.clone())
            .read(conversation)
            .await
    }

    /// Number of conversations waiting for a reply.
    pub async fn pending(&self) -> Result<u64, GhostwriterError> {
        self.storage.queue_len(REPLY_QUEUE).await
    }
}
