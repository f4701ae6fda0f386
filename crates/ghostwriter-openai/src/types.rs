// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI Chat Completions API request/response types.

use serde::{Deserialize, Serialize};

/// A request to the `/chat/completions` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    /// Model identifier (e.g., "gpt-4o-mini").
    pub model: String,

    /// Conversation messages, oldest first.
    pub messages: Vec<ApiMessage>,
}

/// A single message in the API wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Role: "system", "user", or "assistant".
    pub role: String,

    /// Text content. The API sends `null` for tool-call-only replies.
    #[serde(default)]
    pub content: Option<String>,
}

/// A non-streaming response from `/chat/completions`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Completion identifier.
    #[serde(default)]
    pub id: Option<String>,

    /// Model that produced the completion.
    #[serde(default)]
    pub model: Option<String>,

    /// Candidate replies; only the first is used.
    pub choices: Vec<Choice>,
}

/// One candidate reply.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ApiMessage,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Error response body from the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Error details within an [`ApiErrorResponse`].
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,

    #[serde(rename = "type", default)]
    pub type_: Option<String>,
}
