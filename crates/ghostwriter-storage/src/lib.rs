// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Ghostwriter relay.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and the key/value, list and queue
//! primitives behind [`StorageAdapter`](ghostwriter_core::StorageAdapter).
//!
//! All writes are serialized through `tokio-rusqlite`'s single background
//! thread. Query modules accept `&Database` and go through
//! `database.connection().call()`; do not open extra connections for writes.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
