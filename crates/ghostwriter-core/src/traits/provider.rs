// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for LLM backends (OpenAI, Ollama, etc.).

use async_trait::async_trait;

use crate::error::GhostwriterError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ChatMessage;

/// Adapter for a language-model backend.
///
/// Backends accept an ordered list of role-tagged messages and return
/// exactly one reply. Model identifiers and endpoints stay inside the
/// adapter.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Returns true when the backend is configured well enough to be called.
    fn is_available(&self) -> bool;

    /// Generates a reply for the given conversation.
    ///
    /// The returned message always has [`Role::Assistant`](crate::types::Role::Assistant).
    async fn generate(&self, messages: &[ChatMessage]) -> Result<ChatMessage, GhostwriterError>;
}
