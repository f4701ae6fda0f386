// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama `/api/chat` request/response types.

use serde::{Deserialize, Serialize};

/// A non-streaming request to `/api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    /// Always `false`: the relay needs the complete reply in one response.
    pub stream: bool,
}

/// A chat message in Ollama's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// Response body of a non-streaming `/api/chat` call.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: Option<String>,
    pub message: OllamaMessage,
    #[serde(default)]
    pub done: bool,
}

/// Error body returned by the Ollama server (`{"error": "..."}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
