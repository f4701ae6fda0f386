// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation relay engine for Ghostwriter.
//!
//! The [`Relay`] wires two independent triggers to shared, storage-backed
//! state:
//! - inbound events from the channel adapter, each ingested by its own task
//!   into history, the business-link registry and the reply queue;
//! - cron ticks, on which the [`ReplyOrchestrator`] drains the queue and
//!   answers through the [`LlmGateway`].
//!
//! Per-conversation locks keep the two from interleaving on one conversation.

pub mod classifier;
pub mod gateway;
pub mod history;
pub mod ingestion;
pub mod instructions;
pub mod links;
pub mod locks;
pub mod orchestrator;
pub mod queue;
pub mod recording;
pub mod schedule;
pub mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use ghostwriter_config::model::GhostwriterConfig;
use ghostwriter_core::{
    ChannelAdapter, GhostwriterError, InboundEvent, ProviderAdapter, StorageAdapter,
};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

pub use classifier::{OwnIdentities, SenderClassifier};
pub use gateway::LlmGateway;
pub use history::HistoryStore;
pub use ingestion::{IngestOutcome, IngestionHandler};
pub use instructions::InstructionResolver;
pub use links::BusinessLinkRegistry;
pub use locks::{ConversationGuard, ConversationLocks};
pub use orchestrator::{OrchestratorSettings, ReplyOrchestrator, TickOutcome};
pub use queue::ReplyQueue;
pub use schedule::Schedule;

/// The assembled relay: ingestion, orchestrator and scheduler over one storage.
pub struct Relay {
    ingestion: Arc<IngestionHandler>,
    orchestrator: Arc<ReplyOrchestrator>,
    gateway: Arc<LlmGateway>,
    channel: Arc<dyn ChannelAdapter + Send + Sync>,
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    schedule: Schedule,
    drain_timeout: Duration,
}

impl Relay {
    /// Assembles the relay from already-initialized adapters.
    ///
    /// The channel must be connected; storage must be initialized.
    pub fn new(
        config: &GhostwriterConfig,
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        channel: Arc<dyn ChannelAdapter + Send + Sync>,
        gateway: LlmGateway,
        classifier: Arc<dyn SenderClassifier>,
    ) -> Result<Self, GhostwriterError> {
        let schedule = Schedule::from_config(&config.schedule)?;
        let settings = OrchestratorSettings::from_config(config);

        let history = HistoryStore::new(storage.clone());
        let links = BusinessLinkRegistry::new(storage.clone());
        let queue = ReplyQueue::new(storage.clone(), config.queue.dedupe);
        let locks = Arc::new(ConversationLocks::new());
        let gateway = Arc::new(gateway);

        let ingestion = Arc::new(IngestionHandler::new(
            history.clone(),
            links.clone(),
            queue.clone(),
            classifier,
            locks.clone(),
        ));
        let orchestrator = Arc::new(ReplyOrchestrator::new(
            history,
            links,
            queue,
            Arc::new(InstructionResolver::from_config(config)),
            gateway.clone(),
            channel.clone(),
            locks,
            settings,
        ));

        Ok(Self {
            ingestion,
            orchestrator,
            gateway,
            channel,
            storage,
            schedule,
            drain_timeout: settings.drain_timeout,
        })
    }

    /// Assembles the relay with providers in priority order and the
    /// configured own identities as sender classifier.
    pub fn from_config(
        config: &GhostwriterConfig,
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        channel: Arc<dyn ChannelAdapter + Send + Sync>,
        providers: Vec<Arc<dyn ProviderAdapter + Send + Sync>>,
    ) -> Result<Self, GhostwriterError> {
        let own = OwnIdentities::from_config(&config.bot);
        if own.is_empty() {
            warn!("bot.own_ids is empty, every message will be treated as a user message");
        }
        Self::new(
            config,
            storage,
            channel,
            LlmGateway::new(providers),
            Arc::new(own),
        )
    }

    pub fn ingestion(&self) -> &Arc<IngestionHandler> {
        &self.ingestion
    }

    pub fn orchestrator(&self) -> &Arc<ReplyOrchestrator> {
        &self.orchestrator
    }

    pub fn gateway(&self) -> &Arc<LlmGateway> {
        &self.gateway
    }

    /// Runs the relay until `cancel` fires or the channel closes.
    ///
    /// Fails immediately with [`GhostwriterError::NoProviderConfigured`] when
    /// no backend is available. On the way out, in-flight ingestion tasks and
    /// the current tick are drained and storage is closed.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), GhostwriterError> {
        let Some(provider) = self.gateway.select() else {
            error!("no LLM provider configured, refusing to start");
            return Err(GhostwriterError::NoProviderConfigured);
        };
        info!(
            provider = provider.name(),
            channel = self.channel.name(),
            storage = self.storage.name(),
            "relay running"
        );

        let stop = cancel.child_token();
        let tracker = TaskTracker::new();
        let mut scheduler = tokio::spawn(schedule::run_scheduler(
            self.schedule.clone(),
            self.orchestrator.clone(),
            stop.clone(),
        ));
        let mut scheduler_finished = false;

        loop {
            tokio::select! {
                event = self.channel.receive() => {
                    match event {
                        Ok(event) => {
                            let ingestion = self.ingestion.clone();
                            tracker.spawn(async move { handle_event(&ingestion, event).await });
                        }
                        Err(e) => {
                            error!(error = %e, "channel receive error");
                            // If the channel is closed, break out of the loop.
                            if e.to_string().contains("closed") {
                                break;
                            }
                        }
                    }
                }
                result = &mut scheduler => {
                    scheduler_finished = true;
                    match result {
                        Ok(Ok(())) => warn!("scheduler exited unexpectedly"),
                        Ok(Err(e)) => error!(error = %e, "scheduler failed"),
                        Err(e) => error!(error = %e, "scheduler task panicked"),
                    }
                    break;
                }
                _ = stop.cancelled() => {
                    info!("shutdown signal received, stopping relay");
                    break;
                }
            }
        }

        stop.cancel();
        shutdown::drain_tasks(&tracker, self.drain_timeout).await;

        if !scheduler_finished {
            match scheduler.await {
                Ok(Ok(())) => debug!("scheduler stopped"),
                Ok(Err(e)) => error!(error = %e, "scheduler failed"),
                Err(e) => error!(error = %e, "scheduler task panicked"),
            }
        }

        if let Err(e) = self.channel.shutdown().await {
            warn!(error = %e, "channel shutdown failed");
        }
        self.storage.close().await?;

        info!("relay stopped");
        Ok(())
    }
}

/// Ingests one event; failures are isolated to the event.
async fn handle_event(ingestion: &IngestionHandler, event: InboundEvent) {
    match ingestion.ingest(event).await {
        Ok(outcome) => debug!(?outcome, "event ingested"),
        Err(GhostwriterError::MalformedEvent(reason)) => {
            warn!(reason = reason.as_str(), "dropping malformed event");
        }
        Err(e) => error!(error = %e, "failed to ingest event"),
    }
}
