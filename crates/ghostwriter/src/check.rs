// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ghostwriter check` command implementation.
//!
//! Runs offline checks against an already validated configuration: which
//! LLM backend would answer, whether the gateway has a token, when the
//! next tick fires, and whether the database opens.

use std::time::{Duration, Instant};

use ghostwriter_config::config_warnings;
use ghostwriter_config::model::GhostwriterConfig;
use ghostwriter_core::GhostwriterError;
use ghostwriter_relay::{LlmGateway, Schedule};

use crate::serve::build_providers;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `ghostwriter check` command.
///
/// Fails when any check fails; warnings are reported but do not fail.
pub async fn run_check(config: &GhostwriterConfig) -> Result<(), GhostwriterError> {
    let results = vec![
        check_provider(config),
        check_telegram(config),
        check_identities(config),
        check_instructions(config),
        check_schedule(config),
        check_database(&config.storage.database_path).await,
    ];

    println!();
    println!("  ghostwriter check");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    for result in &results {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => {
                fail_count += 1;
                "[FAIL]"
            }
        };
        println!(
            "    {tag} {:<20} {} ({}ms)",
            result.name,
            result.message,
            result.duration.as_millis()
        );
    }
    println!();

    if fail_count > 0 {
        return Err(GhostwriterError::Config(format!(
            "{fail_count} check(s) failed"
        )));
    }
    println!("  All checks passed.");
    println!();
    Ok(())
}

/// Report which backend the gateway would select.
fn check_provider(config: &GhostwriterConfig) -> CheckResult {
    let start = Instant::now();
    let providers = match build_providers(config) {
        Ok(providers) => providers,
        Err(e) => return CheckResult::new("LLM provider", CheckStatus::Fail, e.to_string(), start),
    };
    let gateway = LlmGateway::new(providers);

    match gateway.select() {
        Some(provider) => CheckResult::new(
            "LLM provider",
            CheckStatus::Pass,
            format!("{} selected", provider.name()),
            start,
        ),
        None => CheckResult::new(
            "LLM provider",
            CheckStatus::Fail,
            "none configured (set OPENAI_API_KEY or OLLAMA_URI)",
            start,
        ),
    }
}

fn check_telegram(config: &GhostwriterConfig) -> CheckResult {
    let start = Instant::now();
    match config.telegram.bot_token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => {
            CheckResult::new("Telegram", CheckStatus::Pass, "bot token set", start)
        }
        _ => CheckResult::new(
            "Telegram",
            CheckStatus::Fail,
            "no bot token (set TELEGRAM_BOT_TOKEN)",
            start,
        ),
    }
}

/// Without own identities every business-side message counts as a user turn.
fn check_identities(config: &GhostwriterConfig) -> CheckResult {
    let start = Instant::now();
    if config.bot.own_ids.is_empty() {
        CheckResult::new(
            "Own identities",
            CheckStatus::Warn,
            "none configured (set TELEGRAM_OWN_ID)",
            start,
        )
    } else {
        CheckResult::new(
            "Own identities",
            CheckStatus::Pass,
            format!("{} configured", config.bot.own_ids.len()),
            start,
        )
    }
}

fn check_instructions(config: &GhostwriterConfig) -> CheckResult {
    let start = Instant::now();
    let sets = config.instruction_sets.len();
    let bound: usize = config.chats.iter().map(|c| c.ids.len()).sum();
    let summary = format!("{sets} set(s), {bound} bound conversation(s)");

    let warnings = config_warnings(config);
    if warnings.is_empty() {
        return CheckResult::new("Instructions", CheckStatus::Pass, summary, start);
    }
    let detail: Vec<String> = warnings.iter().map(ToString::to_string).collect();
    CheckResult::new(
        "Instructions",
        CheckStatus::Warn,
        format!("{summary}; {}", detail.join("; ")),
        start,
    )
}

fn check_schedule(config: &GhostwriterConfig) -> CheckResult {
    let start = Instant::now();
    let next = Schedule::from_config(&config.schedule).and_then(|schedule| {
        let next = schedule.next_after(chrono::Utc::now())?;
        Ok(next.with_timezone(&schedule.timezone()))
    });

    match next {
        Ok(next) => CheckResult::new(
            "Schedule",
            CheckStatus::Pass,
            format!("next tick at {}", next.format("%Y-%m-%d %H:%M %Z")),
            start,
        ),
        Err(e) => CheckResult::new("Schedule", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Check database file exists and can be opened.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();

    if !std::path::Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new(
                "Database",
                CheckStatus::Fail,
                format!("open failed: {e}"),
                start,
            );
        }
    };

    let query_result: Result<(), tokio_rusqlite::Error> = conn
        .call(|conn| {
            conn.execute_batch("SELECT 1")?;
            Ok(())
        })
        .await;

    match query_result {
        Ok(()) => CheckResult::new("Database", CheckStatus::Pass, "connected", start),
        Err(e) => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("query failed: {e}"),
            start,
        ),
    }
}
