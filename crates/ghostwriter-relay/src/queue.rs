// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reply queue: conversations waiting for the next tick.
//!
//! Pending conversation ids live in the FIFO `queue:reply`. While enabled,
//! deduplication keeps a conversation at most once in the queue no matter
//! how many messages arrive before it is served. Consecutive failed reply
//! attempts are counted under `attempts:<id>`.

use std::sync::Arc;

use ghostwriter_core::{GhostwriterError, StorageAdapter};
use tracing::debug;

/// Name of the queue holding conversations awaiting a reply.
pub const REPLY_QUEUE: &str = "queue:reply";

fn attempts_key(conversation_id: &str) -> String {
    format!("attempts:{conversation_id}")
}

/// FIFO of conversation ids awaiting reply generation.
#[derive(Clone)]
pub struct ReplyQueue {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    dedupe: bool,
}

impl ReplyQueue {
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>, dedupe: bool) -> Self {
        Self { storage, dedupe }
    }

    /// Appends the conversation to the tail of the queue.
    ///
    /// Returns `false` when deduplication absorbed the call because the
    /// conversation was already pending.
    pub async fn enqueue(&self, conversation_id: &str) -> Result<bool, GhostwriterError> {
        if self.dedupe {
            let added = self
                .storage
                .push_queue_unique(REPLY_QUEUE, conversation_id)
                .await?;
            if !added {
                debug!(conversation_id, "conversation already pending");
            }
            Ok(added)
        } else {
            self.storage.push_queue(REPLY_QUEUE, conversation_id).await?;
            Ok(true)
        }
    }

    /// Takes the oldest pending conversation, or `None` when the queue is idle.
    pub async fn dequeue(&self) -> Result<Option<String>, GhostwriterError> {
        self.storage.pop_queue(REPLY_QUEUE).await
    }

    /// Number of pending entries.
    pub async fn len(&self) -> Result<u64, GhostwriterError> {
        self.storage.queue_len(REPLY_QUEUE).await
    }

    pub async fn is_empty(&self) -> Result<bool, GhostwriterError> {
        Ok(self.len().await? == 0)
    }

    /// Increments the failed-attempt counter and returns the new count.
    ///
    /// Only the orchestrator calls this, while holding the conversation lock,
    /// so the read-modify-write does not race.
    pub async fn record_failure(&self, conversation_id: &str) -> Result<u32, GhostwriterError> {
        let key = attempts_key(conversation_id);
        let previous = self
            .storage
            .get(&key)
            .await?
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(0);
        let attempts = previous.saturating_add(1);
        self.storage.set(&key, &attempts.to_string()).await?;
        Ok(attempts)
    }

    /// Current failed-attempt count (0 when none recorded).
    pub async fn attempts(&self, conversation_id: &str) -> Result<u32, GhostwriterError> {
        Ok(self
            .storage
            .get(&attempts_key(conversation_id))
            .await?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0))
    }

    /// Resets the failed-attempt counter after a success or a drop.
    pub async fn clear_attempts(&self, conversation_id: &str) -> Result<(), GhostwriterError> {
        self.storage.delete(&attempts_key(conversation_id)).await
    }
}
