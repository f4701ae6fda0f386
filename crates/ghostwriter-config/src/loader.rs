// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ghostwriter.toml` > `~/.config/ghostwriter/ghostwriter.toml`
//! > `/etc/ghostwriter/ghostwriter.toml` with environment variable overrides via the
//! `GHOSTWRITER_` prefix. Conventional unprefixed variables (`OPENAI_API_KEY`,
//! `TELEGRAM_BOT_TOKEN`, ...) fill in values the files leave unset.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::{GhostwriterConfig, default_ollama_model, default_timezone};

/// Sections addressable through `GHOSTWRITER_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "bot", "telegram", "openai", "ollama", "storage", "schedule", "queue",
];

/// System-wide configuration path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/ghostwriter/ghostwriter.toml";

/// Local configuration file name, looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "ghostwriter.toml";

/// Returns the per-user configuration path (`~/.config/ghostwriter/ghostwriter.toml`).
pub fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("ghostwriter").join(LOCAL_CONFIG_FILE))
        .unwrap_or_default()
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ghostwriter/ghostwriter.toml` (system-wide)
/// 3. `~/.config/ghostwriter/ghostwriter.toml` (user XDG config)
/// 4. `./ghostwriter.toml` (local directory)
/// 5. `GHOSTWRITER_*` environment variables
///
/// Unprefixed fallback variables are applied last, only where a value is unset.
pub fn load_config() -> Result<GhostwriterConfig, figment::Error> {
    let mut config: GhostwriterConfig = build_figment().extract()?;
    apply_env_fallbacks(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<GhostwriterConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GhostwriterConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GhostwriterConfig, figment::Error> {
    let mut config: GhostwriterConfig = Figment::new()
        .merge(Serialized::defaults(GhostwriterConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()?;
    apply_env_fallbacks(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(GhostwriterConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Fill unset values from the conventional unprefixed environment variables.
///
/// `lookup` resolves a variable name; empty values count as unset.
/// `TELEGRAM_OWN_ID` is appended to `bot.own_ids` rather than replacing it.
pub fn apply_env_fallbacks<F>(config: &mut GhostwriterConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if config.telegram.bot_token.is_none() {
        config.telegram.bot_token = var("TELEGRAM_BOT_TOKEN");
    }
    if let Some(own_id) = var("TELEGRAM_OWN_ID")
        && !config.bot.own_ids.contains(&own_id)
    {
        config.bot.own_ids.push(own_id);
    }
    if config.openai.api_key.is_none() {
        config.openai.api_key = var("OPENAI_API_KEY");
    }
    if config.ollama.base_url.is_none() {
        config.ollama.base_url = var("OLLAMA_URI");
    }
    if config.ollama.model == default_ollama_model()
        && let Some(model) = var("OLLAMA_MODEL")
    {
        config.ollama.model = model;
    }
    // POSIX `TZ` may hold a file path or offset rule; only IANA names apply.
    if config.schedule.timezone == default_timezone()
        && let Some(tz) = var("TZ").filter(|tz| tz.parse::<chrono_tz::Tz>().is_ok())
    {
        config.schedule.timezone = tz;
    }
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Only the leading section name is turned into a dot, so
/// `GHOSTWRITER_TELEGRAM_BOT_TOKEN` maps to `telegram.bot_token` and
/// `GHOSTWRITER_SCHEDULE_REPLIES_PER_TICK` to `schedule.replies_per_tick`.
fn env_provider() -> Env {
    Env::prefixed("GHOSTWRITER_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
