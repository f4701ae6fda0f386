// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Business-link registry: the delegated session token last seen per conversation.

use std::sync::Arc;

use ghostwriter_core::{GhostwriterError, StorageAdapter};

fn link_key(conversation_id: &str) -> String {
    format!("link:{conversation_id}")
}

/// Remembers the most recent business-link token of each conversation.
///
/// Tokens are opaque. Saving always overwrites; nothing ever clears a link.
#[derive(Clone)]
pub struct BusinessLinkRegistry {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
}

impl BusinessLinkRegistry {
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>) -> Self {
        Self { storage }
    }

    pub async fn save(&self, conversation_id: &str, token: &str) -> Result<(), GhostwriterError> {
        self.storage.set(&link_key(conversation_id), token).await
    }

    pub async fn read(&self, conversation_id: &str) -> Result<Option<String>, GhostwriterError> {
        self.storage.get(&link_key(conversation_id)).await
    }
}
