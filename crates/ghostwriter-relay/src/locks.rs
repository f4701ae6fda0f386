// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation mutual exclusion.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per conversation id, created on first use.
///
/// Ingestion holds the lock across append and enqueue; the orchestrator
/// holds it from reading history until the reply is recorded. An entry is
/// evicted when its last guard drops with nobody waiting, so the map only
/// holds conversations that are busy right now.
#[derive(Debug, Default)]
pub struct ConversationLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Exclusive access to one conversation, released on drop.
#[derive(Debug)]
pub struct ConversationGuard<'a> {
    locks: &'a ConversationLocks,
    conversation_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `conversation_id`.
    pub async fn lock(&self, conversation_id: &str) -> ConversationGuard<'_> {
        // Clone the Arc out so the shard guard is released before awaiting.
        let mutex = self
            .locks
            .entry(conversation_id.to_string())
            .or_default()
            .clone();
        let guard = mutex.lock_owned().await;
        ConversationGuard {
            locks: self,
            conversation_id: conversation_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of conversations currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for ConversationGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The map's own reference is the only one left: no holder, no waiter.
        // Waiters clone under the shard lock, so this cannot race them.
        self.locks
            .locks
            .remove_if(&self.conversation_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
