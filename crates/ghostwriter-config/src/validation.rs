// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as dangling instruction-set references, cron syntax, and timezone names.
//! Findings that should not stop the relay are returned separately by
//! [`config_warnings`] so the caller can log them once tracing is installed.

use std::collections::HashMap;
use std::str::FromStr;

use crate::diagnostic::{ConfigError, ConfigWarning, closest_match};
use crate::model::{DEFAULT_INSTRUCTION_SET, GhostwriterConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &GhostwriterConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::EmptyDatabasePath);
    }

    if let Err(e) = croner::Cron::from_str(&config.schedule.cron) {
        errors.push(ConfigError::InvalidSchedule {
            field: "cron",
            value: config.schedule.cron.clone(),
            reason: e.to_string(),
        });
    }

    if config.schedule.timezone.parse::<chrono_tz::Tz>().is_err() {
        errors.push(ConfigError::InvalidSchedule {
            field: "timezone",
            value: config.schedule.timezone.clone(),
            reason: "not a known IANA timezone".to_string(),
        });
    }

    if config.schedule.replies_per_tick < 1 {
        errors.push(ConfigError::ZeroTunable {
            key: "schedule.replies_per_tick",
        });
    }

    if config.queue.max_attempts < 1 {
        errors.push(ConfigError::ZeroTunable {
            key: "queue.max_attempts",
        });
    }

    let defined = config
        .instruction_sets
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    for (index, chat) in config.chats.iter().enumerate() {
        if !config.instruction_sets.contains_key(&chat.instruction_set) {
            errors.push(ConfigError::UnknownInstructionSet {
                index,
                instruction_set: chat.instruction_set.clone(),
                suggestion: closest_match(
                    &chat.instruction_set,
                    config.instruction_sets.keys().map(String::as_str),
                ),
                defined: defined.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Non-fatal findings, in configuration order.
///
/// A conversation listed under several `[[chats]]` entries keeps the first
/// binding; each later one is reported here.
pub fn config_warnings(config: &GhostwriterConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if !config.instruction_sets.contains_key(DEFAULT_INSTRUCTION_SET) {
        warnings.push(ConfigWarning::MissingDefaultSet);
    }

    let mut bound: HashMap<String, &str> = HashMap::new();
    for chat in &config.chats {
        for id in &chat.ids {
            let key = id.to_string();
            match bound.get(&key) {
                Some(kept) => warnings.push(ConfigWarning::DuplicateBinding {
                    conversation_id: key,
                    kept: kept.to_string(),
                    ignored: chat.instruction_set.clone(),
                }),
                None => {
                    bound.insert(key, &chat.instruction_set);
                }
            }
        }
    }

    warnings
}
