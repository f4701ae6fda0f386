// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion of inbound events into history, link registry and reply queue.

use std::sync::Arc;

use ghostwriter_core::{ChatMessage, GhostwriterError, InboundEvent, Role};
use tracing::debug;

use crate::classifier::SenderClassifier;
use crate::history::HistoryStore;
use crate::links::BusinessLinkRegistry;
use crate::locks::ConversationLocks;
use crate::queue::ReplyQueue;
use crate::recording;

/// What ingestion did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The event carried no text; only its business link (if any) was kept.
    NoText,
    /// A message from the relay's own identity, recorded as an assistant turn.
    SelfEcho,
    /// A user message, recorded and queued for a reply.
    Queued,
    /// A user message, recorded; the conversation was already pending.
    AlreadyQueued,
}

/// Consumes inbound events.
pub struct IngestionHandler {
    history: HistoryStore,
    links: BusinessLinkRegistry,
    queue: ReplyQueue,
    classifier: Arc<dyn SenderClassifier>,
    locks: Arc<ConversationLocks>,
}

impl IngestionHandler {
    pub fn new(
        history: HistoryStore,
        links: BusinessLinkRegistry,
        queue: ReplyQueue,
        classifier: Arc<dyn SenderClassifier>,
        locks: Arc<ConversationLocks>,
    ) -> Self {
        Self {
            history,
            links,
            queue,
            classifier,
            locks,
        }
    }

    /// Records `event` and queues its conversation when a reply is due.
    ///
    /// The business link is saved even when the event has no text. Empty
    /// text counts as no text. Events without an author are treated as user
    /// messages.
    pub async fn ingest(&self, event: InboundEvent) -> Result<IngestOutcome, GhostwriterError> {
        let Some(conversation_id) = event.conversation_id else {
            return Err(GhostwriterError::MalformedEvent(
                "event has no conversation id".into(),
            ));
        };

        if let Some(token) = event.business_link.as_deref() {
            self.links.save(&conversation_id, token).await?;
        }

        let Some(text) = event.text.filter(|t| !t.is_empty()) else {
            debug!(
                conversation_id = conversation_id.as_str(),
                "event without text, nothing to record"
            );
            return Ok(IngestOutcome::NoText);
        };

        let from_self = event
            .sender_id
            .as_deref()
            .is_some_and(|sender| self.classifier.is_self(sender));
        let role = if from_self { Role::Assistant } else { Role::User };

        let _guard = self.locks.lock(&conversation_id).await;

        let length = self
            .history
            .append(&conversation_id, &ChatMessage::new(role, text))
            .await?;
        recording::record_ingested(&role.to_string());

        if from_self {
            debug!(
                conversation_id = conversation_id.as_str(),
                length,
                "recorded self-echo"
            );
            return Ok(IngestOutcome::SelfEcho);
        }

        let outcome = if self.queue.enqueue(&conversation_id).await? {
            IngestOutcome::Queued
        } else {
            IngestOutcome::AlreadyQueued
        };
        debug!(
            conversation_id = conversation_id.as_str(),
            length,
            ?outcome,
            "recorded user message"
        );
        Ok(outcome)
    }
}
