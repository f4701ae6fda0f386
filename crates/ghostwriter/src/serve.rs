// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ghostwriter serve` command implementation.
//!
//! Opens SQLite storage, builds the provider chain (remote before local),
//! connects the Telegram gateway and runs the relay until a shutdown signal.

use std::sync::Arc;

use ghostwriter_config::model::GhostwriterConfig;
use ghostwriter_core::{ChannelAdapter, GhostwriterError, ProviderAdapter, StorageAdapter};
use ghostwriter_relay::{Relay, recording, shutdown};
use ghostwriter_storage::SqliteStorage;
use ghostwriter_telegram::TelegramChannel;
use tracing::{info, warn};

#[cfg(feature = "openai")]
use ghostwriter_openai::OpenAiProvider;

#[cfg(feature = "ollama")]
use ghostwriter_ollama::OllamaProvider;

/// Runs the `ghostwriter serve` command.
pub async fn run_serve(config: GhostwriterConfig) -> Result<(), GhostwriterError> {
    init_tracing(&config.bot.log_level);

    info!("starting ghostwriter serve");
    log_config_warnings(&config);

    recording::register_metrics();

    // Initialize storage.
    let storage = {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        Arc::new(storage)
    };

    let providers = build_providers(&config)?;

    let mut telegram = TelegramChannel::new(&config.telegram)?;
    telegram.connect().await?;

    let relay = Relay::from_config(&config, storage, Arc::new(telegram), providers)?;

    // Install signal handler.
    let cancel = shutdown::install_signal_handler();

    relay.run(cancel).await?;

    info!("ghostwriter serve stopped");
    Ok(())
}

/// Logs non-fatal configuration findings. Returns how many were logged.
pub(crate) fn log_config_warnings(config: &GhostwriterConfig) -> usize {
    let warnings = ghostwriter_config::config_warnings(config);
    for warning in &warnings {
        warn!("{warning}");
    }
    warnings.len()
}

/// Builds the provider chain in precedence order: remote, then local.
///
/// Providers without credentials are still constructed; they report
/// themselves unavailable and the gateway skips them.
#[cfg_attr(
    not(all(feature = "openai", feature = "ollama")),
    allow(unused_mut, unused_variables)
)]
pub(crate) fn build_providers(
    config: &GhostwriterConfig,
) -> Result<Vec<Arc<dyn ProviderAdapter + Send + Sync>>, GhostwriterError> {
    let mut providers: Vec<Arc<dyn ProviderAdapter + Send + Sync>> = Vec::new();

    #[cfg(feature = "openai")]
    providers.push(Arc::new(OpenAiProvider::new(&config.openai)?));

    #[cfg(feature = "ollama")]
    providers.push(Arc::new(OllamaProvider::new(&config.ollama)?));

    Ok(providers)
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ghostwriter={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
