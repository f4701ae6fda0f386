// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of message authors as the relay's own identity or a user.

use std::collections::HashSet;

use ghostwriter_config::model::BotConfig;

/// Decides whether a sender id belongs to the relay itself.
///
/// Messages from self are recorded as assistant turns and never queued.
pub trait SenderClassifier: Send + Sync {
    fn is_self(&self, sender_id: &str) -> bool;
}

impl<F> SenderClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_self(&self, sender_id: &str) -> bool {
        self(sender_id)
    }
}

/// Default classifier: a fixed set of own identities.
#[derive(Debug, Clone, Default)]
pub struct OwnIdentities {
    ids: HashSet<String>,
}

impl OwnIdentities {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(config.own_ids.iter().cloned())
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl SenderClassifier for OwnIdentities {
    fn is_self(&self, sender_id: &str) -> bool {
        self.ids.contains(sender_id)
    }
}
