// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern-based command classification.
//!
//! Inbound text is matched against an ordered list of rules; the first rule
//! whose pattern matches builds the [`Command`]. Text that matches nothing is a
//! free-form message for the completion pipeline.

use std::sync::LazyLock;

use parley_core::ParleyError;
use regex::{Captures, Regex};
use strum::{Display, EnumString};
use tracing::debug;

/// Per-message profile overrides given with `/ask key=value ... text`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub topic: Option<String>,
    pub agent: Option<String>,
    pub model: Option<String>,
    pub language: Option<String>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        self.topic.is_none() && self.agent.is_none() && self.model.is_none() && self.language.is_none()
    }
}

/// The closed set of intents an inbound message can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    ShowProfile,
    SwitchTopic { topic: String },
    ListThreads,
    SwitchAgent { agent: String },
    /// `more` continues the previous listing with its next page.
    ListModels { more: bool },
    SelectModel { model_id: String },
    SyncModels,
    SetLanguage { language: String },
    History { limit: Option<usize> },
    Search { keyword: String },
    SetAutoReply { enabled: bool },
    ShowContinuation,
    ShowDocument,
    FreeForm { text: String, overrides: Overrides },
}

impl Command {
    pub fn intent(&self) -> Intent {
        match self {
            Self::Help => Intent::Help,
            Self::ShowProfile => Intent::ShowProfile,
            Self::SwitchTopic { .. } => Intent::SwitchTopic,
            Self::ListThreads => Intent::ListThreads,
            Self::SwitchAgent { .. } => Intent::SwitchAgent,
            Self::ListModels { .. } => Intent::ListModels,
            Self::SelectModel { .. } => Intent::SelectModel,
            Self::SyncModels => Intent::SyncModels,
            Self::SetLanguage { .. } => Intent::SetLanguage,
            Self::History { .. } => Intent::History,
            Self::Search { .. } => Intent::Search,
            Self::SetAutoReply { .. } => Intent::SetAutoReply,
            Self::ShowContinuation => Intent::ShowContinuation,
            Self::ShowDocument => Intent::ShowDocument,
            Self::FreeForm { .. } => Intent::FreeForm,
        }
    }
}

/// Tag of a [`Command`], used for logging and rule bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    Help,
    ShowProfile,
    SwitchTopic,
    ListThreads,
    SwitchAgent,
    ListModels,
    SelectModel,
    SyncModels,
    SetLanguage,
    History,
    Search,
    SetAutoReply,
    ShowContinuation,
    ShowDocument,
    FreeForm,
}

type Builder = fn(&Captures<'_>) -> Result<Command, ParleyError>;

struct Rule {
    intent: Intent,
    pattern: Regex,
    build: Builder,
}

/// `/name`, optionally addressed as `/name@bot`, followed by an optional argument.
fn command_pattern(name: &str) -> Regex {
    Regex::new(&format!(r"(?si)^/{name}(?:@[A-Za-z0-9_]+)?(?:\s+(?P<arg>.*?))?\s*$"))
        .expect("command pattern is a valid regex")
}

fn arg<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    caps.name("arg").map(|m| m.as_str().trim()).filter(|s| !s.is_empty())
}

/// First whitespace-separated word of the argument.
fn first_word<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    arg(caps).and_then(|a| a.split_whitespace().next())
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    let rule = |intent, name: &str, build: Builder| Rule {
        intent,
        pattern: command_pattern(name),
        build,
    };
    vec![
        rule(Intent::Help, "start", |_| Ok(Command::Help)),
        rule(Intent::Help, "help", |_| Ok(Command::Help)),
        rule(Intent::SwitchTopic, "topic", |c| {
            Ok(match first_word(c) {
                Some(topic) => Command::SwitchTopic {
                    topic: topic.to_string(),
                },
                None => Command::ShowProfile,
            })
        }),
        rule(Intent::ListThreads, "topics", |_| Ok(Command::ListThreads)),
        rule(Intent::SwitchAgent, "agent", |c| {
            Ok(match first_word(c) {
                Some(agent) => Command::SwitchAgent {
                    agent: agent.to_string(),
                },
                None => Command::ShowProfile,
            })
        }),
        rule(Intent::ListModels, "models", |c| {
            match first_word(c).map(str::to_lowercase).as_deref() {
                None => Ok(Command::ListModels { more: false }),
                Some("more" | "next") => Ok(Command::ListModels { more: true }),
                Some(_) => Err(ParleyError::Validation("Usage: /models [more]".into())),
            }
        }),
        rule(Intent::SelectModel, "model", |c| {
            Ok(match first_word(c) {
                Some(model_id) => Command::SelectModel {
                    model_id: model_id.to_string(),
                },
                None => Command::ShowProfile,
            })
        }),
        rule(Intent::SyncModels, "sync_models", |_| Ok(Command::SyncModels)),
        rule(Intent::SetLanguage, "lang", |c| {
            Ok(match first_word(c) {
                Some(language) => Command::SetLanguage {
                    language: language.to_lowercase(),
                },
                None => Command::ShowProfile,
            })
        }),
        rule(Intent::History, "history", |c| match first_word(c) {
            None => Ok(Command::History { limit: None }),
            Some(n) => match n.parse::<usize>() {
                Ok(limit) if limit > 0 => Ok(Command::History { limit: Some(limit) }),
                _ => Err(ParleyError::Validation(
                    "Usage: /history [n] where n is a positive number".into(),
                )),
            },
        }),
        rule(Intent::Search, "search", |c| match arg(c) {
            Some(keyword) => Ok(Command::Search {
                keyword: keyword.to_string(),
            }),
            None => Err(ParleyError::Validation("Usage: /search <keyword>".into())),
        }),
        rule(Intent::SetAutoReply, "mode", |c| {
            match first_word(c).map(str::to_lowercase).as_deref() {
                Some("on") => Ok(Command::SetAutoReply { enabled: true }),
                Some("off") => Ok(Command::SetAutoReply { enabled: false }),
                _ => Err(ParleyError::Validation("Usage: /mode on|off".into())),
            }
        }),
        rule(Intent::ShowContinuation, "continue", |_| Ok(Command::ShowContinuation)),
        rule(Intent::ShowDocument, "doc", |_| Ok(Command::ShowDocument)),
        rule(Intent::FreeForm, "ask", |c| {
            let Some(rest) = arg(c) else {
                return Err(ParleyError::Validation(
                    "Usage: /ask [model=<id>] [agent=<name>] [topic=<name>] [lang=<code>] <message>"
                        .into(),
                ));
            };
            parse_overrides(rest)
        }),
    ]
});

/// Splits leading `key=value` tokens off `/ask` arguments.
fn parse_overrides(rest: &str) -> Result<Command, ParleyError> {
    let mut overrides = Overrides::default();
    let mut remaining = rest;
    loop {
        let trimmed = remaining.trim_start();
        let token_end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let token = &trimmed[..token_end];
        let Some((key, value)) = token.split_once('=') else {
            remaining = trimmed;
            break;
        };
        if value.is_empty() {
            return Err(ParleyError::Validation(format!("Override `{key}` needs a value")));
        }
        let slot = match key.to_lowercase().as_str() {
            "model" => &mut overrides.model,
            "agent" => &mut overrides.agent,
            "topic" => &mut overrides.topic,
            "lang" | "language" => &mut overrides.language,
            _ => {
                remaining = trimmed;
                break;
            }
        };
        *slot = Some(value.to_string());
        remaining = &trimmed[token_end..];
    }

    let text = remaining.trim();
    if text.is_empty() {
        return Err(ParleyError::Validation("Usage: /ask [key=value ...] <message>".into()));
    }
    Ok(Command::FreeForm {
        text: text.to_string(),
        overrides,
    })
}

/// Classifies inbound text into a [`Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRouter;

impl CommandRouter {
    pub fn new() -> Self {
        Self
    }

    /// Returns the command for `text`, or a `Validation` error carrying usage
    /// guidance when a known command is missing a required argument.
    pub fn classify(&self, text: &str) -> Result<Command, ParleyError> {
        let trimmed = text.trim();
        if trimmed.starts_with('/') {
            for rule in RULES.iter() {
                if let Some(caps) = rule.pattern.captures(trimmed) {
                    let command = (rule.build)(&caps)?;
                    debug!(rule = %rule.intent, intent = %command.intent(), "command classified");
                    return Ok(command);
                }
            }
        }
        Ok(Command::FreeForm {
            text: trimmed.to_string(),
            overrides: Overrides::default(),
        })
    }
}
