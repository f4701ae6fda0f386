// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait: the key/value, list and queue port used by the relay.

use async_trait::async_trait;

use crate::error::GhostwriterError;
use crate::traits::adapter::PluginAdapter;

/// Adapter for persistence backends.
///
/// Every operation is atomic for its own key only. Callers must not assume
/// transactions spanning several keys.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connections).
    async fn initialize(&self) -> Result<(), GhostwriterError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), GhostwriterError>;

    // --- Key/value ---

    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, GhostwriterError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), GhostwriterError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), GhostwriterError>;

    // --- Lists ---

    /// Appends `value` to the list under `key` and returns the new length.
    async fn append_to_list(&self, key: &str, value: &str) -> Result<u64, GhostwriterError>;

    /// Returns the list under `key` in insertion order (empty if absent).
    async fn read_list(&self, key: &str) -> Result<Vec<String>, GhostwriterError>;

    // --- Queues ---

    /// Pushes `value` to the tail of the named queue.
    async fn push_queue(&self, queue_name: &str, value: &str) -> Result<(), GhostwriterError>;

    /// Pushes `value` unless it is already pending in the named queue.
    ///
    /// Returns `false` when the value was already pending.
    async fn push_queue_unique(
        &self,
        queue_name: &str,
        value: &str,
    ) -> Result<bool, GhostwriterError>;

    /// Pops the head of the named queue; `None` when the queue is empty.
    async fn pop_queue(&self, queue_name: &str) -> Result<Option<String>, GhostwriterError>;

    /// Returns the number of pending entries in the named queue.
    async fn queue_len(&self, queue_name: &str) -> Result<u64, GhostwriterError>;
}
