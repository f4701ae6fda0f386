// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Ghostwriter integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockStorage`] - In-memory storage port with per-operation failure injection
//! - [`MockProvider`] - Mock LLM provider with scripted replies and failures
//! - [`MockChannel`] - Mock messaging channel with event injection and capture
//! - [`TestHarness`] - A relay over temp SQLite storage and the mocks above

pub mod harness;
pub mod mock_channel;
pub mod mock_provider;
pub mod mock_storage;

pub use harness::TestHarness;
pub use mock_channel::MockChannel;
pub use mock_provider::{MockProvider, ScriptedFailure};
pub use mock_storage::{MockStorage, StorageOp};
