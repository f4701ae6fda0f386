// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram gateway for the Ghostwriter relay.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling for business messages, plain-text replies, and typing
//! notifications, both optionally routed through a business connection.
//! Messages sent to the bot directly are not relayed.

pub mod handler;

use async_trait::async_trait;
use ghostwriter_config::model::TelegramConfig;
use ghostwriter_core::error::GhostwriterError;
use ghostwriter_core::traits::{ChannelAdapter, PluginAdapter};
use ghostwriter_core::types::{AdapterType, HealthStatus, InboundEvent, MessageId, OutboundMessage};
use teloxide::dispatching::{ShutdownToken, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{BusinessConnectionId, ChatAction};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capacity of the buffer between the polling task and [`ChannelAdapter::receive`].
const INBOUND_BUFFER: usize = 100;

/// Telegram channel adapter implementing [`ChannelAdapter`].
pub struct TelegramChannel {
    bot: Bot,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundEvent>>,
    inbound_tx: mpsc::Sender<InboundEvent>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
    shutdown_token: Option<ShutdownToken>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, GhostwriterError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            GhostwriterError::Config(
                "telegram.bot_token (or TELEGRAM_BOT_TOKEN) is required".into(),
            )
        })?;

        if token.trim().is_empty() {
            return Err(GhostwriterError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);

        Ok(Self {
            bot: Bot::new(token),
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
            shutdown_token: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

/// Parses a conversation id back into a Telegram chat id.
fn parse_chat_id(conversation_id: &str) -> Result<ChatId, GhostwriterError> {
    conversation_id
        .parse::<i64>()
        .map(ChatId)
        .map_err(|e| GhostwriterError::Channel {
            message: format!("invalid chat id `{conversation_id}`: {e}"),
            source: None,
        })
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, GhostwriterError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), GhostwriterError> {
        debug!("Telegram channel shutting down");
        if let Some(token) = &self.shutdown_token {
            match token.shutdown() {
                Ok(stopped) => stopped.await,
                Err(_) => debug!("dispatcher was not running"),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    async fn connect(&mut self) -> Result<(), GhostwriterError> {
        if self.polling_handle.is_some() {
            return Ok(()); // Already connected
        }

        let handler = update_handler(self.inbound_tx.clone());
        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|_| async {}) // Silently ignore other update kinds
            .build();
        self.shutdown_token = Some(dispatcher.shutdown_token());

        info!("starting Telegram long polling");
        self.polling_handle = Some(tokio::spawn(async move {
            dispatcher.dispatch().await;
        }));
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, GhostwriterError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| GhostwriterError::Channel {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, GhostwriterError> {
        let chat_id = parse_chat_id(&msg.conversation_id)?;

        let mut request = self.bot.send_message(chat_id, msg.content);
        if let Some(link) = msg.business_link {
            request = request.business_connection_id(BusinessConnectionId(link));
        }

        let sent = request.await.map_err(|e| GhostwriterError::Channel {
            message: format!("failed to send message: {e}"),
            source: Some(Box::new(e)),
        })?;

        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn send_typing(
        &self,
        conversation_id: &str,
        business_link: Option<&str>,
    ) -> Result<(), GhostwriterError> {
        let chat_id = parse_chat_id(conversation_id)?;

        let mut request = self.bot.send_chat_action(chat_id, ChatAction::Typing);
        if let Some(link) = business_link {
            request = request.business_connection_id(BusinessConnectionId(link.to_string()));
        }

        request.await.map_err(|e| GhostwriterError::Channel {
            message: format!("failed to send typing indicator: {e}"),
            source: Some(Box::new(e)),
        })?;

        Ok(())
    }
}

/// Routes business messages to the relay; every other update is ignored.
fn update_handler(tx: mpsc::Sender<InboundEvent>) -> UpdateHandler<teloxide::RequestError> {
    Update::filter_business_message().endpoint(move |msg: Message| {
        let tx = tx.clone();
        async move {
            forward(&tx, &msg).await;
            respond(())
        }
    })
}

/// Hands a polled message to the relay, dropping it if the receiver is gone.
async fn forward(tx: &mpsc::Sender<InboundEvent>, msg: &Message) {
    let event = handler::to_inbound_event(msg);
    debug!(
        chat_id = msg.chat.id.0,
        business = event.business_link.is_some(),
        has_text = event.text.is_some(),
        "inbound Telegram message"
    );
    if tx.send(event).await.is_err() {
        warn!("inbound channel closed, dropping message");
    }
}
