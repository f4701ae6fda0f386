// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reply orchestrator: drains the reply queue on every scheduler tick.
//!
//! For each dequeued conversation it reads the business link, sends a typing
//! notification, reads history, prepends the resolved instructions as system
//! messages, asks the [`LlmGateway`] for a reply, delivers it and records it.
//!
//! Failures never lose a conversation silently:
//! - provider and channel failures requeue it until `max_attempts`
//!   consecutive failures, then drop it with an error log;
//! - storage failures and a missing provider requeue it without consuming
//!   an attempt;
//! - a reply that was delivered but could not be recorded is not retried,
//!   including one whose recording was cut short by the drain timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ghostwriter_config::model::GhostwriterConfig;
use ghostwriter_core::{ChannelAdapter, ChatMessage, GhostwriterError, OutboundMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::gateway::LlmGateway;
use crate::history::HistoryStore;
use crate::instructions::InstructionResolver;
use crate::links::BusinessLinkRegistry;
use crate::locks::ConversationLocks;
use crate::queue::ReplyQueue;
use crate::recording;

/// Tunables of the reply orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Maximum conversations served per tick.
    pub replies_per_tick: usize,
    /// Consecutive failed attempts after which a conversation is dropped.
    pub max_attempts: u32,
    /// Grace period for an in-flight reply once shutdown is requested.
    pub drain_timeout: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &GhostwriterConfig) -> Self {
        Self {
            replies_per_tick: config.schedule.replies_per_tick.max(1),
            max_attempts: config.queue.max_attempts.max(1),
            drain_timeout: Duration::from_secs(config.schedule.drain_timeout_secs),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            replies_per_tick: 1,
            max_attempts: 3,
            drain_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of serving one queue slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The queue was empty.
    Idle,
    /// A reply was generated and delivered.
    Replied { conversation_id: String },
    /// The conversation had no history to answer.
    Skipped { conversation_id: String },
    /// The attempt failed and the conversation is back in the queue.
    Requeued { conversation_id: String },
    /// The conversation failed `attempts` times in a row and was removed.
    Dropped { conversation_id: String, attempts: u32 },
    /// The attempt failed and the conversation could not be put back.
    Undelivered { conversation_id: String },
}

impl TickOutcome {
    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Replied { .. } => "replied",
            Self::Skipped { .. } => "skipped",
            Self::Requeued { .. } => "requeued",
            Self::Dropped { .. } => "dropped",
            Self::Undelivered { .. } => "undelivered",
        }
    }
}

enum Processed {
    Replied,
    EmptyHistory,
}

/// Serves queued conversations.
pub struct ReplyOrchestrator {
    history: HistoryStore,
    links: BusinessLinkRegistry,
    queue: ReplyQueue,
    resolver: Arc<InstructionResolver>,
    gateway: Arc<LlmGateway>,
    channel: Arc<dyn ChannelAdapter + Send + Sync>,
    locks: Arc<ConversationLocks>,
    settings: OrchestratorSettings,
}

impl ReplyOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        history: HistoryStore,
        links: BusinessLinkRegistry,
        queue: ReplyQueue,
        resolver: Arc<InstructionResolver>,
        gateway: Arc<LlmGateway>,
        channel: Arc<dyn ChannelAdapter + Send + Sync>,
        locks: Arc<ConversationLocks>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            history,
            links,
            queue,
            resolver,
            gateway,
            channel,
            locks,
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Runs one tick: serves up to `replies_per_tick` queued conversations.
    ///
    /// Stops early when the queue runs dry (recording [`TickOutcome::Idle`])
    /// or when `cancel` fires between conversations. Only a failure to read
    /// the queue itself is returned as an error.
    pub async fn tick(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<TickOutcome>, GhostwriterError> {
        let mut outcomes = Vec::with_capacity(self.settings.replies_per_tick);

        for _ in 0..self.settings.replies_per_tick {
            if cancel.is_cancelled() {
                break;
            }

            let Some(conversation_id) = self.queue.dequeue().await? else {
                outcomes.push(TickOutcome::Idle);
                break;
            };

            let outcome = self.serve(conversation_id, cancel).await;
            recording::record_reply(outcome.label());
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Processes one dequeued conversation, draining it on shutdown.
    async fn serve(&self, conversation_id: String, cancel: &CancellationToken) -> TickOutcome {
        // Set once the channel accepted the reply; outlives `work`.
        let delivered = AtomicBool::new(false);

        // `None` means the drain timeout elapsed.
        let result = {
            let work = self.process(&conversation_id, &delivered);
            tokio::pin!(work);

            tokio::select! {
                result = &mut work => Some(result),
                _ = cancel.cancelled() => {
                    info!(
                        conversation_id = conversation_id.as_str(),
                        timeout = ?self.settings.drain_timeout,
                        "shutdown requested, waiting for in-flight reply"
                    );
                    tokio::time::timeout(self.settings.drain_timeout, &mut work).await.ok()
                }
            }
        };

        let delivered = delivered.load(Ordering::Acquire);
        match result {
            Some(result) => self.settle(conversation_id, result, delivered).await,
            None if delivered => {
                error!(
                    conversation_id = conversation_id.as_str(),
                    "reply delivered but shutdown interrupted recording it"
                );
                self.reset_attempts(&conversation_id).await;
                TickOutcome::Replied { conversation_id }
            }
            None => {
                warn!(
                    conversation_id = conversation_id.as_str(),
                    "in-flight reply did not finish before shutdown, requeuing"
                );
                self.requeue(conversation_id).await
            }
        }
    }

    async fn process(
        &self,
        conversation_id: &str,
        delivered: &AtomicBool,
    ) -> Result<Processed, GhostwriterError> {
        let _guard = self.locks.lock(conversation_id).await;

        let link = self.links.read(conversation_id).await?;

        if let Err(e) = self
            .channel
            .send_typing(conversation_id, link.as_deref())
            .await
        {
            debug!(conversation_id, error = %e, "typing notification failed");
        }

        let history = self.history.read(conversation_id).await?;
        if history.is_empty() {
            return Ok(Processed::EmptyHistory);
        }

        let directives = self.resolver.resolve(conversation_id);
        let mut messages: Vec<ChatMessage> = Vec::with_capacity(directives.len() + history.len());
        messages.extend(directives.iter().map(|d| ChatMessage::system(d.as_str())));
        messages.extend(history);

        let reply = self.gateway.generate(&messages).await?;

        self.channel
            .send(OutboundMessage {
                conversation_id: conversation_id.to_string(),
                content: reply.content.clone(),
                business_link: link,
            })
            .await?;
        delivered.store(true, Ordering::Release);

        self.history.append(conversation_id, &reply).await?;

        Ok(Processed::Replied)
    }

    async fn settle(
        &self,
        conversation_id: String,
        result: Result<Processed, GhostwriterError>,
        delivered: bool,
    ) -> TickOutcome {
        let id = conversation_id.as_str();
        match result {
            Ok(Processed::Replied) => {
                self.reset_attempts(id).await;
                info!(conversation_id = id, "reply sent");
                TickOutcome::Replied { conversation_id }
            }
            Ok(Processed::EmptyHistory) => {
                debug!(conversation_id = id, "empty history, nothing to answer");
                TickOutcome::Skipped { conversation_id }
            }
            Err(error) if delivered => {
                error!(
                    conversation_id = id,
                    error = %error,
                    "reply delivered but not recorded in history"
                );
                self.reset_attempts(id).await;
                TickOutcome::Replied { conversation_id }
            }
            Err(GhostwriterError::NoProviderConfigured) => {
                error!(conversation_id = id, "no LLM provider available, requeuing");
                self.requeue(conversation_id).await
            }
            Err(error) if error.is_attempt_failure() => {
                let attempts = match self.queue.record_failure(id).await {
                    Ok(attempts) => attempts,
                    Err(e) => {
                        error!(
                            conversation_id = id,
                            error = %e,
                            "failed to record attempt, requeuing"
                        );
                        return self.requeue(conversation_id).await;
                    }
                };

                if attempts >= self.settings.max_attempts {
                    error!(
                        conversation_id = id,
                        attempts,
                        error = %error,
                        "reply failed too many times, dropping conversation from queue"
                    );
                    self.reset_attempts(id).await;
                    TickOutcome::Dropped {
                        conversation_id,
                        attempts,
                    }
                } else {
                    warn!(
                        conversation_id = id,
                        attempts,
                        max_attempts = self.settings.max_attempts,
                        error = %error,
                        "reply attempt failed, requeuing"
                    );
                    self.requeue(conversation_id).await
                }
            }
            Err(error) => {
                error!(conversation_id = id, error = %error, "reply failed, requeuing");
                self.requeue(conversation_id).await
            }
        }
    }

    async fn requeue(&self, conversation_id: String) -> TickOutcome {
        match self.queue.enqueue(&conversation_id).await {
            Ok(_) => TickOutcome::Requeued { conversation_id },
            Err(e) => {
                error!(
                    conversation_id = conversation_id.as_str(),
                    error = %e,
                    "failed to requeue conversation"
                );
                TickOutcome::Undelivered { conversation_id }
            }
        }
    }

    async fn reset_attempts(&self, conversation_id: &str) {
        if let Err(e) = self.queue.clear_attempts(conversation_id).await {
            warn!(conversation_id, error = %e, "failed to clear attempt counter");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use ghostwriter_core::{ProviderAdapter, Role, StorageAdapter};
    use ghostwriter_test_utils::{MockChannel, MockProvider, MockStorage, ScriptedFailure, StorageOp};

    use crate::instructions::Binding;

    struct Fixture {
        storage: Arc<MockStorage>,
        channel: Arc<MockChannel>,
        provider: Arc<MockProvider>,
        history: HistoryStore,
        links: BusinessLinkRegistry,
        queue: ReplyQueue,
        orchestrator: ReplyOrchestrator,
    }

    fn fixture(settings: OrchestratorSettings) -> Fixture {
        let storage = Arc::new(MockStorage::new());
        let channel = Arc::new(MockChannel::new());
        let provider = Arc::new(MockProvider::new("openai"));

        let history = HistoryStore::new(storage.clone());
        let links = BusinessLinkRegistry::new(storage.clone());
        let queue = ReplyQueue::new(storage.clone(), true);

        let mut sets = BTreeMap::new();
        sets.insert("default".to_string(), vec!["be human".to_string()]);
        sets.insert("terse".to_string(), vec!["be terse".to_string()]);
        let resolver = InstructionResolver::new(
            vec![Binding {
                instruction_set: "terse".into(),
                conversation_ids: vec!["42".into()],
            }],
            sets,
        );

        let orchestrator = ReplyOrchestrator::new(
            history.clone(),
            links.clone(),
            queue.clone(),
            Arc::new(resolver),
            Arc::new(LlmGateway::new(vec![
                provider.clone() as Arc<dyn ProviderAdapter + Send + Sync>,
            ])),
            channel.clone(),
            Arc::new(ConversationLocks::new()),
            settings,
        );

        Fixture {
            storage,
            channel,
            provider,
            history,
            links,
            queue,
            orchestrator,
        }
    }

    async fn seed(f: &Fixture, conversation_id: &str, text: &str) {
        f.history
            .append(conversation_id, &ChatMessage::user(text))
            .await
            .unwrap();
        f.queue.enqueue(conversation_id).await.unwrap();
    }

    async fn tick(f: &Fixture) -> Vec<TickOutcome> {
        f.orchestrator.tick(&CancellationToken::new()).await.unwrap()
    }

    #[tokio::test]
    async fn empty_queue_is_idle() {
        let f = fixture(OrchestratorSettings::default());
        assert_eq!(tick(&f).await, vec![TickOutcome::Idle]);
        assert_eq!(f.provider.call_count().await, 0);
        assert_eq!(f.channel.sent_count().await, 0);
    }

    #[tokio::test]
    async fn reply_uses_instructions_then_history() {
        let f = fixture(OrchestratorSettings::default());
        seed(&f, "42", "hello").await;
        f.provider.push_response("hi").await;

        assert_eq!(
            tick(&f).await,
            vec![TickOutcome::Replied {
                conversation_id: "42".into()
            }]
        );

        assert_eq!(
            f.provider.requests().await,
            vec![vec![ChatMessage::system("be terse"), ChatMessage::user("hello")]]
        );
        let sent = f.channel.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].conversation_id, "42");
        assert_eq!(sent[0].content, "hi");
        assert_eq!(sent[0].business_link, None);

        assert_eq!(
            f.history.read("42").await.unwrap(),
            vec![ChatMessage::user("hello"), ChatMessage::assistant("hi")]
        );
        assert!(f.queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn business_link_routes_typing_and_reply() {
        let f = fixture(OrchestratorSettings::default());
        seed(&f, "7", "hello").await;
        f.links.save("7", "T2").await.unwrap();

        tick(&f).await;

        assert_eq!(
            f.channel.typing_notifications().await,
            vec![("7".to_string(), Some("T2".to_string()))]
        );
        assert_eq!(f.channel.sent_messages().await[0].business_link.as_deref(), Some("T2"));
    }

    #[tokio::test]
    async fn typing_failure_is_swallowed() {
        let f = fixture(OrchestratorSettings::default());
        seed(&f, "7", "hello").await;
        f.channel.fail_typing(true);

        assert!(matches!(tick(&f).await[0], TickOutcome::Replied { .. }));
        assert_eq!(f.channel.sent_count().await, 1);
    }

    #[tokio::test]
    async fn one_conversation_per_tick_by_default() {
        let f = fixture(OrchestratorSettings::default());
        seed(&f, "a", "one").await;
        seed(&f, "b", "two").await;

        tick(&f).await;
        assert_eq!(f.queue.len().await.unwrap(), 1);
        assert_eq!(f.channel.sent_messages().await[0].conversation_id, "a");
    }

    #[tokio::test]
    async fn replies_per_tick_serves_several() {
        let f = fixture(OrchestratorSettings {
            replies_per_tick: 3,
            ..OrchestratorSettings::default()
        });
        seed(&f, "a", "one").await;
        seed(&f, "b", "two").await;

        let outcomes = tick(&f).await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[2], TickOutcome::Idle);
        assert_eq!(f.channel.sent_count().await, 2);
    }

    #[tokio::test]
    async fn empty_history_is_skipped() {
        let f = fixture(OrchestratorSettings::default());
        f.queue.enqueue("ghost").await.unwrap();

        assert_eq!(
            tick(&f).await,
            vec![TickOutcome::Skipped {
                conversation_id: "ghost".into()
            }]
        );
        assert_eq!(f.provider.call_count().await, 0);
    }

    #[tokio::test]
    async fn provider_failure_requeues_then_drops() {
        let f = fixture(OrchestratorSettings {
            max_attempts: 2,
            ..OrchestratorSettings::default()
        });
        seed(&f, "42", "hello").await;
        f.provider.push_failure(ScriptedFailure::Unreachable).await;
        f.provider.push_failure(ScriptedFailure::Rejected).await;

        assert_eq!(
            tick(&f).await,
            vec![TickOutcome::Requeued {
                conversation_id: "42".into()
            }]
        );
        assert_eq!(f.queue.attempts("42").await.unwrap(), 1);

        assert_eq!(
            tick(&f).await,
            vec![TickOutcome::Dropped {
                conversation_id: "42".into(),
                attempts: 2
            }]
        );
        assert!(f.queue.is_empty().await.unwrap());
        assert_eq!(f.queue.attempts("42").await.unwrap(), 0);
        assert_eq!(f.channel.sent_count().await, 0);
        assert_eq!(f.history.read("42").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn success_resets_attempts() {
        let f = fixture(OrchestratorSettings::default());
        seed(&f, "42", "hello").await;
        f.provider.push_failure(ScriptedFailure::Unreachable).await;

        tick(&f).await;
        assert_eq!(f.queue.attempts("42").await.unwrap(), 1);

        assert!(matches!(tick(&f).await[0], TickOutcome::Replied { .. }));
        assert_eq!(f.queue.attempts("42").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn send_failure_counts_as_attempt() {
        let f = fixture(OrchestratorSettings::default());
        seed(&f, "42", "hello").await;
        f.channel.fail_sends(true);

        assert!(matches!(tick(&f).await[0], TickOutcome::Requeued { .. }));
        assert_eq!(f.queue.attempts("42").await.unwrap(), 1);
        // Nothing was delivered, so nothing was recorded.
        assert_eq!(f.history.read("42").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_provider_requeues_without_attempt() {
        let f = fixture(OrchestratorSettings::default());
        seed(&f, "42", "hello").await;
        f.provider.set_available(false);

        assert!(matches!(tick(&f).await[0], TickOutcome::Requeued { .. }));
        assert_eq!(f.queue.attempts("42").await.unwrap(), 0);
        assert_eq!(f.queue.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn storage_failure_requeues() {
        let f = fixture(OrchestratorSettings::default());
        seed(&f, "42", "hello").await;
        f.storage.fail(StorageOp::ReadList).await;

        assert!(matches!(tick(&f).await[0], TickOutcome::Requeued { .. }));
        assert_eq!(f.queue.attempts("42").await.unwrap(), 0);
        assert_eq!(f.storage.queue_len("queue:reply").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_requeue_is_undelivered() {
        let f = fixture(OrchestratorSettings::default());
        seed(&f, "42", "hello").await;
        f.storage.fail(StorageOp::ReadList).await;
        f.storage.fail(StorageOp::PushQueue).await;

        assert_eq!(
            tick(&f).await,
            vec![TickOutcome::Undelivered {
                conversation_id: "42".into()
            }]
        );
    }

    #[tokio::test]
    async fn delivered_but_unrecorded_reply_is_not_retried() {
        let f = fixture(OrchestratorSettings::default());
        seed(&f, "42", "hello").await;
        f.storage.fail(StorageOp::AppendToList).await;

        assert!(matches!(tick(&f).await[0], TickOutcome::Replied { .. }));
        assert_eq!(f.channel.sent_count().await, 1);
        assert!(f.queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn queue_read_failure_is_returned() {
        let f = fixture(OrchestratorSettings::default());
        f.storage.fail(StorageOp::PopQueue).await;

        let err = f
            .orchestrator
            .tick(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GhostwriterError::Storage { .. }));
    }

    #[tokio::test]
    async fn cancelled_tick_serves_nothing() {
        let f = fixture(OrchestratorSettings::default());
        seed(&f, "42", "hello").await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(f.orchestrator.tick(&cancel).await.unwrap().is_empty());
        assert_eq!(f.queue.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn shutdown_mid_tick_drains_in_flight_reply() {
        let f = fixture(OrchestratorSettings {
            drain_timeout: Duration::from_secs(5),
            ..OrchestratorSettings::default()
        });
        seed(&f, "42", "hello").await;
        f.provider.set_delay(Duration::from_millis(100));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        assert!(matches!(
            f.orchestrator.tick(&cancel).await.unwrap()[0],
            TickOutcome::Replied { .. }
        ));
        assert_eq!(f.channel.sent_count().await, 1);
    }

    #[tokio::test]
    async fn shutdown_mid_tick_requeues_after_drain_timeout() {
        let f = fixture(OrchestratorSettings {
            drain_timeout: Duration::from_millis(20),
            ..OrchestratorSettings::default()
        });
        seed(&f, "42", "hello").await;
        f.provider.set_delay(Duration::from_secs(10));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        assert_eq!(
            f.orchestrator.tick(&cancel).await.unwrap(),
            vec![TickOutcome::Requeued {
                conversation_id: "42".into()
            }]
        );
        assert_eq!(f.channel.sent_count().await, 0);
        assert_eq!(f.queue.len().await.unwrap(), 1);
        let history = f.history.read("42").await.unwrap();
        assert!(history.iter().all(|m| m.role == Role::User));
    }

    #[tokio::test]
    async fn drain_timeout_after_send_does_not_resend() {
        let f = fixture(OrchestratorSettings {
            drain_timeout: Duration::from_millis(20),
            ..OrchestratorSettings::default()
        });
        seed(&f, "42", "hello").await;
        f.provider.push_response("hi").await;
        // The reply goes out, then recording it hangs past the drain timeout.
        f.storage
            .stall(StorageOp::AppendToList, Duration::from_secs(10))
            .await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        assert_eq!(
            f.orchestrator.tick(&cancel).await.unwrap(),
            vec![TickOutcome::Replied {
                conversation_id: "42".into()
            }]
        );
        assert_eq!(f.channel.sent_count().await, 1);
        assert!(f.queue.is_empty().await.unwrap());

        f.storage.heal().await;
        assert_eq!(tick(&f).await, vec![TickOutcome::Idle]);
        assert_eq!(f.channel.sent_count().await, 1);
    }
}
