// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Ghostwriter relay.
//!
//! This crate provides the port traits, error type, and common message types
//! shared by every other crate in the workspace. Channel, provider, and
//! storage adapters all implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::GhostwriterError;
pub use types::{
    AdapterType, ChatMessage, HealthStatus, InboundEvent, MessageId, OutboundMessage, Role,
};

pub use traits::{ChannelAdapter, PluginAdapter, ProviderAdapter, StorageAdapter};
