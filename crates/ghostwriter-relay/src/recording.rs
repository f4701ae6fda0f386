// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder these are no-ops.

use metrics::describe_counter;

/// Register all relay metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "ghostwriter_messages_ingested_total",
        "Inbound messages appended to a conversation history"
    );
    describe_counter!(
        "ghostwriter_replies_total",
        "Conversations processed by the reply orchestrator, by outcome"
    );
}

/// Record an ingested message.
pub fn record_ingested(role: &str) {
    metrics::counter!("ghostwriter_messages_ingested_total", "role" => role.to_string())
        .increment(1);
}

/// Record the outcome of one processed conversation.
pub fn record_reply(outcome: &'static str) {
    metrics::counter!("ghostwriter_replies_total", "outcome" => outcome).increment(1);
}
