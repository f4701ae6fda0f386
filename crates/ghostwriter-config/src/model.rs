// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Ghostwriter relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Id of the instruction set used for conversations without a binding.
pub const DEFAULT_INSTRUCTION_SET: &str = "default";

/// Top-level Ghostwriter configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GhostwriterConfig {
    /// Bot identity and logging settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Telegram gateway settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Remote (OpenAI-compatible) backend settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Local (Ollama) backend settings.
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Reply scheduler settings.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Reply queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Conversation to instruction set bindings.
    #[serde(default)]
    pub chats: Vec<ChatBinding>,

    /// Instruction sets keyed by id.
    #[serde(default)]
    pub instruction_sets: BTreeMap<String, InstructionSetConfig>,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Sender ids that belong to the account the relay speaks for.
    ///
    /// Messages from these senders are recorded as assistant turns and
    /// never queued for a reply.
    #[serde(default)]
    pub own_ids: Vec<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            own_ids: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram gateway configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Falls back to `TELEGRAM_BOT_TOKEN`.
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// OpenAI-compatible backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. Falls back to `OPENAI_API_KEY`; `None` disables this backend.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for chat completions.
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// API base URL, without the `/chat/completions` suffix.
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_openai_model(),
            base_url: default_openai_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// Ollama backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaConfig {
    /// Ollama server URL. Falls back to `OLLAMA_URI`; `None` disables this backend.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Model name. Falls back to `OLLAMA_MODEL`.
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: default_ollama_model(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

pub(crate) fn default_ollama_model() -> String {
    "llama3".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable SQLite WAL mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("ghostwriter").join("ghostwriter.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("ghostwriter.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Reply scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Cron expression for reply ticks (five fields, minute resolution).
    #[serde(default = "default_cron")]
    pub cron: String,

    /// IANA timezone the cron expression is evaluated in. Falls back to `TZ`.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Maximum number of conversations answered per tick.
    #[serde(default = "default_replies_per_tick")]
    pub replies_per_tick: usize,

    /// Seconds an in-flight tick may keep running after shutdown is requested.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            timezone: default_timezone(),
            replies_per_tick: default_replies_per_tick(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_cron() -> String {
    "*/7 * * * *".to_string()
}

pub(crate) fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_replies_per_tick() -> usize {
    1
}

fn default_drain_timeout_secs() -> u64 {
    30
}

/// Reply queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Skip enqueueing a conversation that is already pending.
    #[serde(default = "default_dedupe")]
    pub dedupe: bool,

    /// Consecutive failed attempts after which a conversation is dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dedupe: default_dedupe(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_dedupe() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

/// Platform chat id as written in config: a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ChatId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Binds a group of conversations to one instruction set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatBinding {
    /// Id of the instruction set (key under `[instruction_sets]`).
    pub instruction_set: String,

    /// Conversation ids bound to the set.
    #[serde(default)]
    pub ids: Vec<ChatId>,
}

/// A named, ordered list of directives injected as system messages.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InstructionSetConfig {
    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Directives, in the order they are sent to the model.
    #[serde(default)]
    pub instructions: Vec<String>,
}
