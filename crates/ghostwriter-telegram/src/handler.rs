// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of Telegram updates into channel-agnostic [`InboundEvent`]s.
//!
//! Business messages (sent or received by a connected business account) go
//! through [`to_inbound_event`]. Nothing is filtered here: text-less and
//! self-authored events are the relay's call.

use ghostwriter_core::types::InboundEvent;
use teloxide::types::{Message, MessageKind};

/// Converts a Telegram message into an [`InboundEvent`].
///
/// The chat id becomes the conversation id, the author's user id the sender,
/// and the business connection id (if any) the business link.
pub fn to_inbound_event(msg: &Message) -> InboundEvent {
    InboundEvent {
        conversation_id: Some(msg.chat.id.0.to_string()),
        sender_id: msg.from.as_ref().map(|u| u.id.0.to_string()),
        text: msg.text().map(str::to_string),
        business_link: match &msg.kind {
            MessageKind::Common(common) => common.business_connection_id.as_ref().map(|b| b.0.clone()),
            _ => None,
        },
    }
}
