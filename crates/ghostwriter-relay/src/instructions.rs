// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of the instruction set that applies to a conversation.

use std::collections::BTreeMap;

use ghostwriter_config::model::{DEFAULT_INSTRUCTION_SET, GhostwriterConfig};
use tracing::warn;

/// Conversation ids bound to one instruction set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub instruction_set: String,
    pub conversation_ids: Vec<String>,
}

/// Maps conversation ids to ordered directives.
///
/// Built once at startup from configuration and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct InstructionResolver {
    bindings: Vec<Binding>,
    sets: BTreeMap<String, Vec<String>>,
}

impl InstructionResolver {
    pub fn new(bindings: Vec<Binding>, sets: BTreeMap<String, Vec<String>>) -> Self {
        Self { bindings, sets }
    }

    pub fn from_config(config: &GhostwriterConfig) -> Self {
        let bindings = config
            .chats
            .iter()
            .map(|chat| Binding {
                instruction_set: chat.instruction_set.clone(),
                conversation_ids: chat.ids.iter().map(ToString::to_string).collect(),
            })
            .collect();
        let sets = config
            .instruction_sets
            .iter()
            .map(|(id, set)| (id.clone(), set.instructions.clone()))
            .collect();
        Self::new(bindings, sets)
    }

    /// Returns the directives for `conversation_id`.
    ///
    /// The first binding listing the conversation wins. Unbound conversations
    /// get the `default` set, and with no default set they get no directives.
    pub fn resolve(&self, conversation_id: &str) -> &[String] {
        let bound = self
            .bindings
            .iter()
            .find(|b| b.conversation_ids.iter().any(|id| id == conversation_id));

        if let Some(binding) = bound {
            match self.sets.get(&binding.instruction_set) {
                Some(directives) => return directives,
                None => warn!(
                    conversation_id,
                    instruction_set = binding.instruction_set.as_str(),
                    "binding references an unknown instruction set, using default"
                ),
            }
        }

        self.sets
            .get(DEFAULT_INSTRUCTION_SET)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostwriter_config::model::{ChatBinding, ChatId, InstructionSetConfig};
    use tracing_test::traced_test;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn resolver() -> InstructionResolver {
        let mut sets = BTreeMap::new();
        sets.insert("default".to_string(), strings(&["be human", "be brief"]));
        sets.insert("terse".to_string(), strings(&["be terse"]));
        InstructionResolver::new(
            vec![Binding {
                instruction_set: "terse".into(),
                conversation_ids: strings(&["100", "200"]),
            }],
            sets,
        )
    }

    #[test]
    fn bound_conversation_gets_its_set() {
        assert_eq!(resolver().resolve("200"), ["be terse"]);
    }

    #[test]
    fn unbound_conversation_gets_default() {
        assert_eq!(resolver().resolve("999"), ["be human", "be brief"]);
    }

    #[test]
    fn no_default_means_no_directives() {
        let resolver = InstructionResolver::new(Vec::new(), BTreeMap::new());
        assert!(resolver.resolve("999").is_empty());
    }

    #[test]
    fn first_binding_wins() {
        let mut sets = BTreeMap::new();
        sets.insert("a".to_string(), strings(&["from a"]));
        sets.insert("b".to_string(), strings(&["from b"]));
        let resolver = InstructionResolver::new(
            vec![
                Binding {
                    instruction_set: "a".into(),
                    conversation_ids: strings(&["1"]),
                },
                Binding {
                    instruction_set: "b".into(),
                    conversation_ids: strings(&["1"]),
                },
            ],
            sets,
        );
        assert_eq!(resolver.resolve("1"), ["from a"]);
    }

    #[test]
    #[traced_test]
    fn dangling_binding_falls_back_to_default() {
        let mut sets = BTreeMap::new();
        sets.insert("default".to_string(), strings(&["fallback"]));
        let resolver = InstructionResolver::new(
            vec![Binding {
                instruction_set: "missing".into(),
                conversation_ids: strings(&["1"]),
            }],
            sets,
        );
        assert_eq!(resolver.resolve("1"), ["fallback"]);
        assert!(logs_contain("unknown instruction set"));
    }

    #[test]
    fn from_config_stringifies_numeric_ids() {
        let mut config = GhostwriterConfig::default();
        config.instruction_sets.insert(
            "friends".into(),
            InstructionSetConfig {
                name: "Friends".into(),
                description: String::new(),
                instructions: strings(&["be casual"]),
            },
        );
        config.chats.push(ChatBinding {
            instruction_set: "friends".into(),
            ids: vec![ChatId::Number(-100123), ChatId::Text("42".into())],
        });

        let resolver = InstructionResolver::from_config(&config);
        assert_eq!(resolver.resolve("-100123"), ["be casual"]);
        assert_eq!(resolver.resolve("42"), ["be casual"]);
    }
}
