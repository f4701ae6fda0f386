// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage adapter for deterministic testing.
//!
//! `MockStorage` implements `StorageAdapter` over plain collections. Individual
//! operations can be switched to fail or to stall, which is how tests exercise
//! the relay's storage error and shutdown paths.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use ghostwriter_core::traits::adapter::PluginAdapter;
use ghostwriter_core::traits::storage::StorageAdapter;
use ghostwriter_core::types::{AdapterType, HealthStatus};
use ghostwriter_core::GhostwriterError;

/// Storage operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    Get,
    Set,
    Delete,
    AppendToList,
    ReadList,
    /// Both plain and unique pushes.
    PushQueue,
    PopQueue,
    QueueLen,
}

#[derive(Default)]
struct State {
    kv: HashMap<String, String>,
    lists: HashMap<String, Vec<String>>,
    queues: HashMap<String, VecDeque<String>>,
    failing: HashSet<StorageOp>,
    stalls: HashMap<StorageOp, Duration>,
    closed: bool,
}

impl State {
    fn check(&self, op: StorageOp) -> Result<(), GhostwriterError> {
        if self.failing.contains(&op) {
            return Err(GhostwriterError::storage(format!(
                "injected {op:?} failure"
            )));
        }
        Ok(())
    }
}

/// An in-memory storage port.
#[derive(Default)]
pub struct MockStorage {
    state: Mutex<State>,
}

impl MockStorage {
    /// Create an empty store with no failures injected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `op` fail with a storage error.
    pub async fn fail(&self, op: StorageOp) {
        self.state.lock().await.failing.insert(op);
    }

    /// Delay every subsequent call of `op` by `delay` before it runs.
    pub async fn stall(&self, op: StorageOp, delay: Duration) {
        self.state.lock().await.stalls.insert(op, delay);
    }

    /// Remove all injected failures and stalls.
    pub async fn heal(&self) {
        let mut state = self.state.lock().await;
        state.failing.clear();
        state.stalls.clear();
    }

    async fn pause(&self, op: StorageOp) {
        let delay = self.state.lock().await.stalls.get(&op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// Whether `close()` has been called.
    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Snapshot of a queue, oldest first.
    pub async fn queue_snapshot(&self, queue_name: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .queues
            .get(queue_name)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PluginAdapter for MockStorage {
    fn name(&self) -> &str {
        "mock-storage"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, GhostwriterError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GhostwriterError> {
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for MockStorage {
    async fn initialize(&self) -> Result<(), GhostwriterError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), GhostwriterError> {
        self.state.lock().await.closed = true;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, GhostwriterError> {
        self.pause(StorageOp::Get).await;
        let state = self.state.lock().await;
        state.check(StorageOp::Get)?;
        Ok(state.kv.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), GhostwriterError> {
        self.pause(StorageOp::Set).await;
        let mut state = self.state.lock().await;
        state.check(StorageOp::Set)?;
        state.kv.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), GhostwriterError> {
        self.pause(StorageOp::Delete).await;
        let mut state = self.state.lock().await;
        state.check(StorageOp::Delete)?;
        state.kv.remove(key);
        Ok(())
    }

    async fn append_to_list(&self, key: &str, value: &str) -> Result<u64, GhostwriterError> {
        self.pause(StorageOp::AppendToList).await;
        let mut state = self.state.lock().await;
        state.check(StorageOp::AppendToList)?;
        let list = state.lists.entry(key.to_string()).or_default();
        list.push(value.to_string());
        Ok(list.len() as u64)
    }

    async fn read_list(&self, key: &str) -> Result<Vec<String>, GhostwriterError> {
        self.pause(StorageOp::ReadList).await;
        let state = self.state.lock().await;
        state.check(StorageOp::ReadList)?;
        Ok(state.lists.get(key).cloned().unwrap_or_default())
    }

    async fn push_queue(&self, queue_name: &str, value: &str) -> Result<(), GhostwriterError> {
        self.pause(StorageOp::PushQueue).await;
        let mut state = self.state.lock().await;
        state.check(StorageOp::PushQueue)?;
        state
            .queues
            .entry(queue_name.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn push_queue_unique(
        &self,
        queue_name: &str,
        value: &str,
    ) -> Result<bool, GhostwriterError> {
        self.pause(StorageOp::PushQueue).await;
        let mut state = self.state.lock().await;
        state.check(StorageOp::PushQueue)?;
        let queue = state.queues.entry(queue_name.to_string()).or_default();
        if queue.iter().any(|v| v == value) {
            return Ok(false);
        }
        queue.push_back(value.to_string());
        Ok(true)
    }

    async fn pop_queue(&self, queue_name: &str) -> Result<Option<String>, GhostwriterError> {
        self.pause(StorageOp::PopQueue).await;
        let mut state = self.state.lock().await;
        state.check(StorageOp::PopQueue)?;
        Ok(state
            .queues
            .get_mut(queue_name)
            .and_then(VecDeque::pop_front))
    }

    async fn queue_len(&self, queue_name: &str) -> Result<u64, GhostwriterError> {
        self.pause(StorageOp::QueueLen).await;
        let state = self.state.lock().await;
        state.check(StorageOp::QueueLen)?;
        Ok(state.queues.get(queue_name).map_or(0, |q| q.len() as u64))
    }
}
