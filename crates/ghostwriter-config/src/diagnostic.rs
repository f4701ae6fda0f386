// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup diagnostics for `ghostwriter.toml`.
//!
//! Deserialization failures from figment and semantic failures from
//! [`crate::validation`] both end up as [`ConfigError`]s, which miette
//! renders with the offending line highlighted when the file is known.
//! Non-fatal findings are [`ConfigWarning`]s and are logged once tracing
//! is up.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::fmt;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::model::DEFAULT_INSTRUCTION_SET;

/// Jaro-Winkler score above which a near miss is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A fatal configuration problem.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {section}")]
    #[diagnostic(
        code(ghostwriter::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), section, valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Human-readable section, e.g. `[schedule]` or `[[chats]]`.
        section: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a {section} key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(ghostwriter::config::invalid_type), help("`{key}` expects {expected}"))]
    InvalidType {
        /// Dotted path, e.g. `queue.max_attempts`.
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// Only `[[chats]]` entries have a key without a default.
    #[error("{section} entry is missing `{key}`")]
    #[diagnostic(
        code(ghostwriter::config::missing_key),
        help("every {section} entry needs `{key} = \"<id>\"` naming an [instruction_sets.<id>] table")
    )]
    MissingKey { key: String, section: String },

    #[error("chats[{index}] is bound to instruction set `{instruction_set}`, which is not defined")]
    #[diagnostic(
        code(ghostwriter::config::unknown_instruction_set),
        help("{}", unknown_set_help(suggestion.as_deref(), defined))
    )]
    UnknownInstructionSet {
        index: usize,
        instruction_set: String,
        suggestion: Option<String>,
        /// Comma-separated ids of the defined sets.
        defined: String,
    },

    #[error("schedule.{field} `{value}` is invalid: {reason}")]
    #[diagnostic(
        code(ghostwriter::config::schedule),
        help("{}", schedule_help(field))
    )]
    InvalidSchedule {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("`{key}` must be at least 1")]
    #[diagnostic(code(ghostwriter::config::zero_tunable))]
    ZeroTunable { key: &'static str },

    #[error("storage.database_path is empty")]
    #[diagnostic(
        code(ghostwriter::config::database_path),
        help("point it at a writable file, e.g. `ghostwriter.db`")
    )]
    EmptyDatabasePath,

    #[error("configuration error: {0}")]
    #[diagnostic(code(ghostwriter::config::other))]
    Other(String),
}

/// A configuration finding that does not stop the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Unbound conversations will be answered without directives.
    MissingDefaultSet,
    /// A later `[[chats]]` entry repeats a conversation; the first binding wins.
    DuplicateBinding {
        conversation_id: String,
        kept: String,
        ignored: String,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDefaultSet => write!(
                f,
                "no `{DEFAULT_INSTRUCTION_SET}` instruction set configured; unbound conversations get no instructions"
            ),
            Self::DuplicateBinding {
                conversation_id,
                kept,
                ignored,
            } => write!(
                f,
                "conversation `{conversation_id}` is bound to `{kept}` and `{ignored}`; `{kept}` applies"
            ),
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, section: &str, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {section} accepts: {valid_keys}"),
        None => format!("{section} accepts: {valid_keys}"),
    }
}

fn unknown_set_help(suggestion: Option<&str>, defined: &str) -> String {
    match (suggestion, defined.is_empty()) {
        (Some(s), _) => format!("did you mean `{s}`? defined sets: {defined}"),
        (None, true) => "no [instruction_sets.<id>] tables are defined".to_string(),
        (None, false) => format!("defined sets: {defined}"),
    }
}

fn schedule_help(field: &str) -> &'static str {
    match field {
        "cron" => "five fields, minute first; the default is `*/7 * * * *`",
        "timezone" => "use an IANA name such as `UTC` or `Europe/Rome`",
        _ => "see the [schedule] section of ghostwriter.example.toml",
    }
}

/// Converts a figment failure into diagnostics, one per underlying error.
///
/// `toml_sources` are `(path, content)` pairs used to point at the
/// offending line.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let (span, src) = locate(&error, &error.path, field, toml_sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    section: section_label(&error.path),
                    suggestion: closest_match(field, expected.iter().copied()),
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.to_string(),
                section: section_label(&error.path),
            },
            Kind::InvalidType(actual, expected) => {
                let (section, field) = match error.path.split_last() {
                    Some((field, section)) => (section, field.as_str()),
                    None => (&[][..], ""),
                };
                let (span, src) = locate(&error, section, field, toml_sources);
                ConfigError::InvalidType {
                    key: error.path.join("."),
                    found: actual.to_string(),
                    expected: expected.clone(),
                    span,
                    src,
                }
            }
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// Human-readable name of the table a figment path points into.
fn section_label(path: &[String]) -> String {
    match path.first().map(String::as_str) {
        None => "the top level".to_string(),
        Some("chats") => "[[chats]]".to_string(),
        Some("instruction_sets") => match path.get(1) {
            Some(id) => format!("[instruction_sets.{id}]"),
            None => "[instruction_sets]".to_string(),
        },
        Some(section) => format!("[{section}]"),
    }
}

fn locate(
    error: &figment::Error,
    section: &[String],
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline sources carry no file metadata; fall back to the only one given.
    let source = match origin {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    source
        .and_then(|(path, content)| {
            let offset = find_key_offset(content, section, field)?;
            Some((
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(path, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Byte offset of `field` inside the table named by `section`.
///
/// `section` is a figment path: `["schedule"]` matches `[schedule]`,
/// `["instruction_sets", "default"]` matches `[instruction_sets.default]`,
/// and `["chats", "1"]` matches the second `[[chats]]` header. An empty
/// path searches the lines before the first header. The search stops at
/// the next header, so a key of the same name in a later table is never
/// reported.
pub fn find_key_offset(content: &str, section: &[String], field: &str) -> Option<usize> {
    let name: Vec<&str> = section
        .iter()
        .map(String::as_str)
        .filter(|s| s.parse::<usize>().is_err())
        .collect();
    let name = name.join(".");
    let mut remaining_matches = section
        .iter()
        .find_map(|s| s.parse::<usize>().ok())
        .unwrap_or(0);

    let mut in_section = name.is_empty();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            if in_section {
                return None;
            }
            let header = trimmed.trim_start_matches('[').trim_end_matches(']').trim();
            if header == name {
                if remaining_matches == 0 {
                    in_section = true;
                } else {
                    remaining_matches -= 1;
                }
            }
        } else if in_section {
            let indent = line.len() - line.trim_start().len();
            if let Some(after) = line.trim_start().strip_prefix(field)
                && after.trim_start().starts_with('=')
            {
                return Some(offset + indent);
            }
        }
        offset += line.len();
    }
    None
}

/// Closest candidate to `unknown` by Jaro-Winkler similarity, if close enough.
pub fn closest_match<'a>(
    unknown: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    candidates
        .into_iter()
        .map(|c| (strsim::jaro_winkler(unknown, c), c))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.to_string())
}

/// Renders every error to stderr, followed by a count.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
    let noun = if errors.len() == 1 { "error" } else { "errors" };
    eprintln!("ghostwriter: {} configuration {noun}, not starting", errors.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn closest_match_picks_best_candidate() {
        let keys = ["cron", "timezone", "replies_per_tick", "drain_timeout_secs"];
        assert_eq!(
            closest_match("replies_per_tik", keys),
            Some("replies_per_tick".to_string())
        );
        assert_eq!(closest_match("zzzzzz", ["dedupe", "max_attempts"]), None);
    }

    #[test]
    fn offset_in_plain_section() {
        let content = "[bot]\nlog_level = \"info\"\n\n[schedule]\ncrn = \"* * * * *\"\n";
        let o = find_key_offset(content, &path(&["schedule"]), "crn").unwrap();
        assert_eq!(&content[o..o + 3], "crn");
    }

    #[test]
    fn offset_ignores_prefix_matches() {
        let content = "[queue]\ndedupe_all = true\n";
        assert_eq!(find_key_offset(content, &path(&["queue"]), "dedupe"), None);
    }

    #[test]
    fn offset_stays_inside_its_table() {
        let content = "[bot]\nlog_level = \"info\"\n[queue]\nmax_attempts = 3\n";
        assert_eq!(find_key_offset(content, &path(&["bot"]), "max_attempts"), None);
    }

    #[test]
    fn offset_in_nth_array_table() {
        let content = "[[chats]]\nids = [1]\ninstruction_set = \"a\"\n\n[[chats]]\n  ids = [2]\n";
        let o = find_key_offset(content, &path(&["chats", "1"]), "ids").unwrap();
        assert_eq!(&content[o..o + 9], "ids = [2]");
    }

    #[test]
    fn offset_in_dotted_table() {
        let content = "[instruction_sets.default]\ninstructions = []\n\n[instruction_sets.work]\nnmae = \"w\"\n";
        let o = find_key_offset(content, &path(&["instruction_sets", "work"]), "nmae").unwrap();
        assert_eq!(&content[o..o + 4], "nmae");
    }

    #[test]
    fn top_level_search_ends_at_first_header() {
        let content = "stray = 1\n[bot]\nother = 2\n";
        assert_eq!(find_key_offset(content, &[], "stray"), Some(0));
        assert_eq!(find_key_offset(content, &[], "other"), None);
    }

    #[test]
    fn section_labels_match_toml_syntax() {
        assert_eq!(section_label(&path(&["chats", "0"])), "[[chats]]");
        assert_eq!(
            section_label(&path(&["instruction_sets", "default"])),
            "[instruction_sets.default]"
        );
        assert_eq!(section_label(&path(&["queue"])), "[queue]");
        assert_eq!(section_label(&[]), "the top level");
    }

    #[test]
    fn unknown_set_help_lists_defined_sets() {
        let error = ConfigError::UnknownInstructionSet {
            index: 0,
            instruction_set: "frends".into(),
            suggestion: Some("friends".into()),
            defined: "default, friends".into(),
        };
        let help = error.help().unwrap().to_string();
        assert!(help.contains("did you mean `friends`"));
        assert!(help.contains("default, friends"));
    }

    #[test]
    fn warnings_read_as_sentences() {
        let warning = ConfigWarning::DuplicateBinding {
            conversation_id: "42".into(),
            kept: "friends".into(),
            ignored: "work".into(),
        };
        assert_eq!(
            warning.to_string(),
            "conversation `42` is bound to `friends` and `work`; `friends` applies"
        );
    }
}
