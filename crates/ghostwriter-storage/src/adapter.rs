// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use ghostwriter_config::model::StorageConfig;
use ghostwriter_core::{AdapterType, GhostwriterError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::{self, Database};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all operations to the query
/// modules. The database is lazily opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](StorageAdapter::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, GhostwriterError> {
        self.db.get().ok_or_else(|| GhostwriterError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, GhostwriterError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GhostwriterError> {
        if let Some(db) = self.db.get() {
            database::checkpoint(db.connection()).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), GhostwriterError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| GhostwriterError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), GhostwriterError> {
        let db = self.db()?;
        database::checkpoint(db.connection()).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, GhostwriterError> {
        queries::kv::get(self.db()?, key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), GhostwriterError> {
        queries::kv::set(self.db()?, key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), GhostwriterError> {
        queries::kv::delete(self.db()?, key).await
    }

    async fn append_to_list(&self, key: &str, value: &str) -> Result<u64, GhostwriterError> {
        queries::lists::append(self.db()?, key, value).await
    }

    async fn read_list(&self, key: &str) -> Result<Vec<String>, GhostwriterError> {
        queries::lists::read(self.db()?, key).await
    }

    async fn push_queue(&self, queue_name: &str, value: &str) -> Result<(), GhostwriterError> {
        queries::queue::push(self.db()?, queue_name, value).await
    }

    async fn push_queue_unique(
        &self,
        queue_name: &str,
        value: &str,
    ) -> Result<bool, GhostwriterError> {
        queries::queue::push_unique(self.db()?, queue_name, value).await
    }

    async fn pop_queue(&self, queue_name: &str) -> Result<Option<String>, GhostwriterError> {
        queries::queue::pop(self.db()?, queue_name).await
    }

    async fn queue_len(&self, queue_name: &str) -> Result<u64, GhostwriterError> {
        queries::queue::len(self.db()?, queue_name).await
    }
}
