// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end integration tests for the complete Ghostwriter relay.
//!
//! Each test creates an isolated TestHarness with temp SQLite and mock
//! adapters. Tests are independent and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use ghostwriter_config::model::{GhostwriterConfig, StorageConfig};
use ghostwriter_core::{
    ChatMessage, InboundEvent, ProviderAdapter, Role, StorageAdapter,
};
use ghostwriter_relay::{IngestOutcome, Relay, TickOutcome};
use ghostwriter_storage::SqliteStorage;
use ghostwriter_test_utils::{MockChannel, MockProvider, ScriptedFailure, TestHarness};
use tokio_util::sync::CancellationToken;

fn linked(conversation: &str, sender: &str, text: &str, link: &str) -> InboundEvent {
    InboundEvent {
        conversation_id: Some(conversation.into()),
        sender_id: Some(sender.into()),
        text: Some(text.into()),
        business_link: Some(link.into()),
    }
}

// ---- Reply pipeline ----

#[tokio::test]
async fn bound_conversation_gets_directives_and_reply() {
    let harness = TestHarness::builder()
        .with_instruction_set("terse", &["be terse"])
        .with_binding("terse", &["42"])
        .with_mock_responses(["hi"])
        .build()
        .await
        .unwrap();

    assert_eq!(
        harness.message("42", "1001", "hello").await.unwrap(),
        IngestOutcome::Queued
    );

    let outcomes = harness.tick().await.unwrap();
    assert_eq!(
        outcomes,
        vec![TickOutcome::Replied {
            conversation_id: "42".into()
        }]
    );

    // The model saw the directive first, then the history.
    let requests = harness.mock_provider.requests().await;
    assert_eq!(
        requests,
        vec![vec![ChatMessage::system("be terse"), ChatMessage::user("hello")]]
    );

    let sent = harness.mock_channel.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].conversation_id, "42");
    assert_eq!(sent[0].content, "hi");

    let history = harness.history("42").await.unwrap();
    assert_eq!(
        history,
        vec![ChatMessage::user("hello"), ChatMessage::assistant("hi")]
    );
    assert_eq!(harness.pending().await.unwrap(), 0);
}

#[tokio::test]
async fn unbound_conversation_uses_default_set() {
    let harness = TestHarness::builder()
        .with_instruction_set("default", &["be kind", "answer in English"])
        .build()
        .await
        .unwrap();

    harness.message("7", "1001", "ciao").await.unwrap();
    harness.tick().await.unwrap();

    let requests = harness.mock_provider.requests().await;
    assert_eq!(
        requests[0],
        vec![
            ChatMessage::system("be kind"),
            ChatMessage::system("answer in English"),
            ChatMessage::user("ciao"),
        ]
    );
}

#[tokio::test]
async fn replies_follow_arrival_order_one_per_tick() {
    let harness = TestHarness::builder()
        .with_mock_responses(["to A", "to B"])
        .build()
        .await
        .unwrap();

    harness.message("A", "1", "first").await.unwrap();
    harness.message("B", "2", "second").await.unwrap();

    harness.tick().await.unwrap();
    assert_eq!(harness.mock_channel.sent_count().await, 1);
    assert_eq!(harness.pending().await.unwrap(), 1);

    harness.tick().await.unwrap();
    let sent = harness.mock_channel.sent_messages().await;
    let targets: Vec<&str> = sent.iter().map(|m| m.conversation_id.as_str()).collect();
    assert_eq!(targets, vec!["A", "B"]);
    assert_eq!(harness.tick().await.unwrap(), vec![TickOutcome::Idle]);
}

// ---- Business links ----

#[tokio::test]
async fn latest_business_link_routes_the_reply() {
    let harness = TestHarness::builder().build().await.unwrap();

    harness.deliver(linked("42", "1001", "one", "T1")).await.unwrap();
    harness.deliver(linked("42", "1001", "two", "T2")).await.unwrap();
    assert_eq!(
        harness.business_link("42").await.unwrap().as_deref(),
        Some("T2")
    );

    harness.tick().await.unwrap();

    let sent = harness.mock_channel.sent_messages().await;
    assert_eq!(sent[0].business_link.as_deref(), Some("T2"));
    assert_eq!(
        harness.mock_channel.typing_notifications().await,
        vec![("42".to_string(), Some("T2".to_string()))]
    );
}

#[tokio::test]
async fn textless_event_only_records_link() {
    let harness = TestHarness::builder().build().await.unwrap();

    let outcome = harness
        .deliver(InboundEvent {
            conversation_id: Some("42".into()),
            business_link: Some("T1".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(outcome, IngestOutcome::NoText);
    assert!(harness.history("42").await.unwrap().is_empty());
    assert_eq!(harness.pending().await.unwrap(), 0);
    assert_eq!(
        harness.business_link("42").await.unwrap().as_deref(),
        Some("T1")
    );
}

// ---- Role classification and queueing ----

#[tokio::test]
async fn own_messages_are_history_but_not_queued() {
    let harness = TestHarness::builder()
        .with_own_ids(["777"])
        .build()
        .await
        .unwrap();

    assert_eq!(
        harness.message("42", "777", "I'll get back to you").await.unwrap(),
        IngestOutcome::SelfEcho
    );
    harness.message("42", "1001", "thanks").await.unwrap();

    let history = harness.history("42").await.unwrap();
    assert_eq!(history[0].role, Role::Assistant);
    assert_eq!(history[1].role, Role::User);
    assert_eq!(harness.pending().await.unwrap(), 1);
}

#[tokio::test]
async fn burst_of_messages_yields_one_reply() {
    let harness = TestHarness::builder()
        .with_replies_per_tick(5)
        .build()
        .await
        .unwrap();

    assert_eq!(
        harness.message("42", "1001", "hey").await.unwrap(),
        IngestOutcome::Queued
    );
    assert_eq!(
        harness.message("42", "1001", "are you there?").await.unwrap(),
        IngestOutcome::AlreadyQueued
    );
    assert_eq!(harness.pending().await.unwrap(), 1);

    harness.tick().await.unwrap();
    assert_eq!(harness.mock_channel.sent_count().await, 1);

    // Both user turns reached the model in one request.
    let requests = harness.mock_provider.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].len(), 2);
}

// ---- Failure handling ----

#[tokio::test]
async fn failing_backend_requeues_then_drops() {
    let harness = TestHarness::builder()
        .with_max_attempts(2)
        .build()
        .await
        .unwrap();
    harness.mock_provider.push_failure(ScriptedFailure::Unreachable).await;
    harness.mock_provider.push_failure(ScriptedFailure::Rejected).await;

    harness.message("42", "1001", "hello").await.unwrap();

    assert_eq!(
        harness.tick().await.unwrap(),
        vec![TickOutcome::Requeued {
            conversation_id: "42".into()
        }]
    );
    assert_eq!(harness.pending().await.unwrap(), 1);

    assert_eq!(
        harness.tick().await.unwrap(),
        vec![TickOutcome::Dropped {
            conversation_id: "42".into(),
            attempts: 2
        }]
    );
    assert_eq!(harness.pending().await.unwrap(), 0);
    assert_eq!(harness.mock_channel.sent_count().await, 0);

    // History is untouched by failed attempts.
    assert_eq!(harness.history("42").await.unwrap().len(), 1);
}

#[tokio::test]
async fn recovered_backend_answers_on_next_tick() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.mock_provider.push_failure(ScriptedFailure::Unreachable).await;
    harness.mock_provider.push_response("sorry for the wait").await;

    harness.message("42", "1001", "hello").await.unwrap();
    harness.tick().await.unwrap();
    harness.tick().await.unwrap();

    let sent = harness.mock_channel.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].content, "sorry for the wait");
}

#[tokio::test]
async fn unavailable_backend_keeps_conversation_queued() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.mock_provider.set_available(false);

    harness.message("42", "1001", "hello").await.unwrap();
    for _ in 0..5 {
        harness.tick().await.unwrap();
    }

    // No attempt is counted, so nothing is ever dropped.
    assert_eq!(harness.pending().await.unwrap(), 1);
    assert_eq!(harness.mock_provider.call_count().await, 0);
}

// ---- Run loop ----

#[tokio::test]
async fn run_ingests_until_channel_closes() {
    let harness = TestHarness::builder().build().await.unwrap();

    harness.mock_channel.inject(linked("42", "1001", "hello", "T1")).await;
    harness.mock_channel.inject(linked("43", "1002", "hey", "T9")).await;
    harness.mock_channel.close().await;

    tokio::time::timeout(
        Duration::from_secs(5),
        harness.relay.run(CancellationToken::new()),
    )
    .await
    .expect("relay did not stop")
    .unwrap();

    assert_eq!(harness.history("42").await.unwrap().len(), 1);
    assert_eq!(harness.history("43").await.unwrap().len(), 1);
    assert_eq!(harness.pending().await.unwrap(), 2);
}

#[tokio::test]
async fn queue_and_history_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = GhostwriterConfig::default();
    config.storage = StorageConfig {
        database_path: dir.path().join("gw.db").to_string_lossy().to_string(),
        wal_mode: true,
    };

    // First process: ingest only.
    {
        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await.unwrap();
        let provider: Arc<dyn ProviderAdapter + Send + Sync> = Arc::new(MockProvider::new("mock"));
        let relay = Relay::from_config(
            &config,
            storage.clone(),
            Arc::new(MockChannel::new()),
            vec![provider],
        )
        .unwrap();

        relay
            .ingestion()
            .ingest(linked("42", "1001", "hello", "T1"))
            .await
            .unwrap();
        storage.close().await.unwrap();
    }

    // Second process: the pending reply goes out.
    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await.unwrap();
    let channel = Arc::new(MockChannel::new());
    let provider = Arc::new(MockProvider::new("mock").with_responses(["welcome back"]));
    let relay = Relay::from_config(
        &config,
        storage.clone(),
        channel.clone(),
        vec![provider.clone() as Arc<dyn ProviderAdapter + Send + Sync>],
    )
    .unwrap();

    let outcomes = relay
        .orchestrator()
        .tick(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        outcomes,
        vec![TickOutcome::Replied {
            conversation_id: "42".into()
        }]
    );

    let sent = channel.sent_messages().await;
    assert_eq!(sent[0].content, "welcome back");
    assert_eq!(sent[0].business_link.as_deref(), Some("T1"));
    assert_eq!(provider.requests().await[0], vec![ChatMessage::user("hello")]);
}
