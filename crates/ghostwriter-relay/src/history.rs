// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation message history on top of the storage port.
//!
//! Each conversation owns an append-only list under `conversation:<id>`.
//! Entries are JSON-encoded [`ChatMessage`]s and are never rewritten.

use std::sync::Arc;

use ghostwriter_core::{ChatMessage, GhostwriterError, StorageAdapter};

/// Storage key holding the history of `conversation_id`.
pub fn history_key(conversation_id: &str) -> String {
    format!("conversation:{conversation_id}")
}

/// Append-only, insertion-ordered message log per conversation.
#[derive(Clone)]
pub struct HistoryStore {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
}

impl HistoryStore {
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>) -> Self {
        Self { storage }
    }

    /// Appends `message` to the conversation and returns the new history length.
    pub async fn append(
        &self,
        conversation_id: &str,
        message: &ChatMessage,
    ) -> Result<u64, GhostwriterError> {
        let encoded = serde_json::to_string(message).map_err(GhostwriterError::storage)?;
        self.storage
            .append_to_list(&history_key(conversation_id), &encoded)
            .await
    }

    /// Returns the full history in append order; empty for unknown conversations.
    ///
    /// An entry that does not decode is reported as a storage error.
    pub async fn read(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, GhostwriterError> {
        let key = history_key(conversation_id);
        self.storage
            .read_list(&key)
            .await?
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                serde_json::from_str(raw).map_err(|e| {
                    GhostwriterError::storage(format!("corrupt entry {index} in `{key}`: {e}"))
                })
            })
            .collect()
    }
}
