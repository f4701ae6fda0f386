// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Ghostwriter relay.

use thiserror::Error;

/// The primary error type used across all Ghostwriter adapter traits and relay operations.
#[derive(Debug, Error)]
pub enum GhostwriterError {
    /// Configuration errors (unknown instruction set, bad cron expression, missing secrets).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An inbound event that cannot be attributed to any conversation.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// Neither a remote credential nor a local endpoint is configured.
    #[error("no LLM provider configured")]
    NoProviderConfigured,

    /// The backend could not be reached (network failure, timeout, overload).
    #[error("provider unreachable: {message}")]
    ProviderUnreachable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend answered with an error (invalid request, unknown model).
    #[error("provider rejected request: {message}")]
    ProviderRejected {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Messaging gateway errors (connection failure, send failure).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GhostwriterError {
    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Storage { source: err.into() }
    }

    /// Returns true for per-call failures of a single reply attempt.
    ///
    /// These count against the retry budget of a queued conversation.
    pub fn is_attempt_failure(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnreachable { .. }
                | Self::ProviderRejected { .. }
                | Self::Channel { .. }
                | Self::Timeout { .. }
        )
    }
}
