// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for messaging platform integrations (Telegram, etc.).

use async_trait::async_trait;

use crate::error::GhostwriterError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{InboundEvent, MessageId, OutboundMessage};

/// Adapter for the messaging gateway.
///
/// Channel adapters deliver inbound platform events to the relay and expose
/// the "send message" primitive used by the reply orchestrator.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Establishes a connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), GhostwriterError>;

    /// Receives the next inbound event from the channel.
    async fn receive(&self) -> Result<InboundEvent, GhostwriterError>;

    /// Sends a message, through the business link when one is set.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, GhostwriterError>;

    /// Shows a "typing" indicator in the conversation.
    async fn send_typing(
        &self,
        conversation_id: &str,
        business_link: Option<&str>,
    ) -> Result<(), GhostwriterError>;
}
