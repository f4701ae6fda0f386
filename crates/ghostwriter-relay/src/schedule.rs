// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cron-driven tick scheduling.
//!
//! The scheduler sleeps until the next occurrence of the configured cron
//! expression (evaluated in the configured timezone) and then runs one
//! orchestrator tick. Ticks never overlap: the next occurrence is computed
//! only after the previous tick returns.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use croner::Cron;
use ghostwriter_config::model::ScheduleConfig;
use ghostwriter_core::GhostwriterError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::orchestrator::{ReplyOrchestrator, TickOutcome};

/// A parsed cron expression bound to a timezone.
#[derive(Debug, Clone)]
pub struct Schedule {
    cron: Cron,
    timezone: Tz,
}

impl Schedule {
    pub fn new(expression: &str, timezone: &str) -> Result<Self, GhostwriterError> {
        let cron = Cron::from_str(expression).map_err(|e| {
            GhostwriterError::Config(format!("invalid cron expression `{expression}`: {e}"))
        })?;
        let timezone = timezone
            .parse::<Tz>()
            .map_err(|e| GhostwriterError::Config(format!("invalid timezone `{timezone}`: {e}")))?;
        Ok(Self { cron, timezone })
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self, GhostwriterError> {
        Self::new(&config.cron, &config.timezone)
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First occurrence strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, GhostwriterError> {
        let local = now.with_timezone(&self.timezone);
        self.cron
            .find_next_occurrence(&local, false)
            .map(|next| next.with_timezone(&Utc))
            .map_err(|e| GhostwriterError::Internal(format!("no upcoming cron occurrence: {e}")))
    }

    /// How long to sleep from `now` until the next occurrence.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Result<Duration, GhostwriterError> {
        let next = self.next_after(now)?;
        Ok((next - now).to_std().unwrap_or(Duration::ZERO))
    }
}

/// Runs orchestrator ticks on `schedule` until `cancel` fires.
pub async fn run_scheduler(
    schedule: Schedule,
    orchestrator: Arc<ReplyOrchestrator>,
    cancel: CancellationToken,
) -> Result<(), GhostwriterError> {
    info!(timezone = %schedule.timezone(), "reply scheduler started");

    loop {
        let now = Utc::now();
        let delay = schedule.delay_from(now)?;
        debug!(next_tick_in = ?delay, "waiting for next tick");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => break,
        }

        match orchestrator.tick(&cancel).await {
            Ok(outcomes) => {
                let served = outcomes
                    .iter()
                    .filter(|o| !matches!(o, TickOutcome::Idle))
                    .count();
                debug!(served, "tick complete");
            }
            Err(e) => error!(error = %e, "tick failed"),
        }
    }

    info!("reply scheduler stopped");
    Ok(())
}
