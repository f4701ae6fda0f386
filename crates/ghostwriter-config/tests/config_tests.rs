// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Ghostwriter configuration system.

use std::io::Write;

use ghostwriter_config::diagnostic::{ConfigError, ConfigWarning, closest_match};
use ghostwriter_config::model::GhostwriterConfig;
use ghostwriter_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_ghostwriter_config() {
    let toml = r#"
[bot]
own_ids = ["777"]
log_level = "debug"

[telegram]
bot_token = "123:ABC"

[openai]
api_key = "sk-123"
model = "gpt-4o"
base_url = "http://localhost:9999/v1"
request_timeout_secs = 10

[ollama]
base_url = "http://localhost:11434"
model = "mistral"

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[schedule]
cron = "*/5 * * * *"
timezone = "Europe/Rome"
replies_per_tick = 2
drain_timeout_secs = 5

[queue]
dedupe = false
max_attempts = 5

[[chats]]
instruction_set = "friends"
ids = [123, "456"]

[instruction_sets.default]
name = "Default"
description = "Fallback"
instructions = ["be natural"]

[instruction_sets.friends]
name = "Friends"
description = "Casual tone"
instructions = ["be casual", "use slang"]
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.bot.own_ids, vec!["777"]);
    assert_eq!(config.bot.log_level, "debug");
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.openai.api_key.as_deref(), Some("sk-123"));
    assert_eq!(config.openai.model, "gpt-4o");
    assert_eq!(config.openai.request_timeout_secs, 10);
    assert_eq!(
        config.ollama.base_url.as_deref(),
        Some("http://localhost:11434")
    );
    assert_eq!(config.ollama.model, "mistral");
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.schedule.cron, "*/5 * * * *");
    assert_eq!(config.schedule.timezone, "Europe/Rome");
    assert_eq!(config.schedule.replies_per_tick, 2);
    assert_eq!(config.schedule.drain_timeout_secs, 5);
    assert!(!config.queue.dedupe);
    assert_eq!(config.queue.max_attempts, 5);
    assert_eq!(config.chats.len(), 1);
    assert_eq!(config.chats[0].ids.len(), 2);
    assert_eq!(config.instruction_sets.len(), 2);
    assert_eq!(
        config.instruction_sets["friends"].instructions,
        vec!["be casual", "use slang"]
    );
}

/// Unknown field in [schedule] section produces an UnknownField error.
#[test]
fn unknown_field_in_schedule_produces_error() {
    let toml = r#"
[schedule]
crn = "* * * * *"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("crn"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.bot.log_level, "info");
    assert!(config.telegram.bot_token.is_none());
    assert!(config.openai.api_key.is_none());
    assert_eq!(config.openai.model, "gpt-4o-mini");
    assert!(config.ollama.base_url.is_none());
    assert!(config.storage.wal_mode);
    assert_eq!(config.schedule.cron, "*/7 * * * *");
    assert!(config.chats.is_empty());
    assert!(config.instruction_sets.is_empty());
}

/// Dotted keys (as produced by the GHOSTWRITER_ env provider) override TOML.
#[test]
fn dotted_override_wins_over_toml() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: GhostwriterConfig = Figment::new()
        .merge(Serialized::defaults(GhostwriterConfig::default()))
        .merge(Toml::string("[schedule]\nreplies_per_tick = 2\n"))
        .merge(("schedule.replies_per_tick", 4))
        .merge(("telegram.bot_token", "xyz-from-env"))
        .extract()
        .expect("should merge env override");

    assert_eq!(config.schedule.replies_per_tick, 4);
    assert_eq!(config.telegram.bot_token.as_deref(), Some("xyz-from-env"));
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: GhostwriterConfig = Figment::new()
        .merge(Serialized::defaults(GhostwriterConfig::default()))
        .merge(Toml::file("/nonexistent/path/ghostwriter.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.schedule.replies_per_tick, 1);
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[agent]
name = "debug"
"#;

    let err = load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("agent"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Unknown key "own_id" in [bot] produces an UnknownKey with suggestion `own_ids`.
#[test]
fn diagnostic_error_includes_unknown_key_and_suggestion() {
    let toml = r#"
[bot]
own_id = ["1"]
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, section, suggestion, valid_keys, .. } if {
            key == "own_id"
                && section == "[bot]"
                && suggestion.as_deref() == Some("own_ids")
                && valid_keys.contains("log_level")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'own_id' with suggestion 'own_ids', got: {errors:?}"
    );
}

#[test]
fn diagnostic_no_suggestion_for_distant_typo() {
    assert!(closest_match("zzzzzz", ["dedupe", "max_attempts"]).is_none());
}

/// Invalid type (string where number expected) produces clear message.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[queue]
max_attempts = "three"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("max_attempts"))),
        "error should point at queue.max_attempts, got: {errors:?}"
    );
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "crn".to_string(),
        section: "[schedule]".to_string(),
        suggestion: Some("cron".to_string()),
        valid_keys: "cron, timezone, replies_per_tick, drain_timeout_secs".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some(), "should have diagnostic code");
    let help = error.help().expect("should have help text").to_string();
    assert!(help.contains("did you mean `cron`"), "got: {help}");
    assert!(help.contains("[schedule] accepts"), "got: {help}");

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("crn"), "rendered report should mention the key");
}

/// Bindings pointing at unknown sets are rejected before any traffic.
#[test]
fn validation_catches_dangling_binding() {
    let toml = r#"
[[chats]]
instruction_set = "missing"
ids = [1]
"#;

    let errors = load_and_validate_str(toml).expect_err("dangling binding should fail");
    assert!(errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownInstructionSet { index: 0, instruction_set, .. } if instruction_set == "missing")
    }));
}

/// A `[[chats]]` entry without `instruction_set` names the table in the error.
#[test]
fn binding_without_instruction_set_is_reported() {
    let toml = r#"
[[chats]]
ids = [1]
"#;

    let errors = load_and_validate_str(toml).expect_err("binding needs a set");
    assert!(errors.iter().any(|e| {
        matches!(e, ConfigError::MissingKey { key, section } if key == "instruction_set" && section == "[[chats]]")
    }), "got: {errors:?}");
}

/// Repeating a conversation across bindings loads, with a warning for the later one.
#[test]
fn duplicate_binding_loads_with_warning() {
    let toml = r#"
[instruction_sets.default]
instructions = []

[instruction_sets.work]
instructions = ["formal"]

[[chats]]
instruction_set = "default"
ids = [42]

[[chats]]
instruction_set = "work"
ids = ["42", 7]
"#;

    let config = load_and_validate_str(toml).expect("duplicate binding is not fatal");
    assert_eq!(
        ghostwriter_config::config_warnings(&config),
        vec![ConfigWarning::DuplicateBinding {
            conversation_id: "42".into(),
            kept: "default".into(),
            ignored: "work".into(),
        }]
    );
}

/// The shipped example configuration is valid.
#[test]
fn example_config_validates() {
    let example = include_str!("../../../ghostwriter.example.toml");
    let config = load_and_validate_str(example).expect("example config should validate");
    assert_eq!(config.instruction_sets["default"].instructions.len(), 5);
}

/// An explicit `--config` path is loaded and validated.
#[test]
fn load_and_validate_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "[schedule]\ncron = \"*/2 * * * *\"\n\n[instruction_sets.default]\ninstructions = [\"hi\"]"
    )
    .expect("write config");

    let config = load_and_validate_path(file.path()).expect("explicit path should load");
    assert_eq!(config.schedule.cron, "*/2 * * * *");
    assert_eq!(config.instruction_sets["default"].instructions, vec!["hi"]);
}

#[test]
fn missing_explicit_path_is_an_error() {
    let errors = load_and_validate_path(std::path::Path::new("/nonexistent/ghostwriter.toml"))
        .expect_err("missing file should be reported");
    assert!(matches!(&errors[0], ConfigError::Other(msg) if msg.contains("does not exist")));
}
