// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command dispatch.
//!
//! State-mutating commands validate their target, persist it, append a
//! system-role audit message and confirm. Free-form messages are recorded
//! before any completion is attempted, so a failed generation never loses
//! the user's input.

use parley_completion::{ReplyRequest, discover_models, render_continuation};
use parley_core::types::{DocumentRef, HistoryQuery};
use parley_core::{ChatId, ParleyError, Role, ThreadKey};
use parley_router::{Command, Overrides};
use tracing::{info, warn};

use crate::{Bridge, format};

const DEFAULT_HISTORY: usize = 10;
const MAX_HISTORY: usize = 50;
const SEARCH_LIMIT: usize = 10;
const MAX_TOPIC_CHARS: usize = 64;
const CHOOSE_MODEL_STEP: &str = "choose_model";
const MODEL_PAGE: usize = 10;

impl Bridge {
    /// Executes `command` for `chat_id` and returns the reply text.
    pub async fn dispatch(&self, chat_id: ChatId, command: Command) -> Result<String, ParleyError> {
        match command {
            Command::Help => Ok(format::HELP.to_string()),
            Command::ShowProfile => self.show_profile(chat_id).await,
            Command::SwitchTopic { topic } => self.switch_topic(chat_id, &topic).await,
            Command::ListThreads => {
                let current = self.storage.get_current_topic(chat_id).await?;
                let threads = self.storage.list_threads(Some(chat_id)).await?;
                Ok(format::threads(&threads, &current))
            }
            Command::SwitchAgent { agent } => self.switch_agent(chat_id, &agent).await,
            Command::ListModels { more } => self.list_models(chat_id, more).await,
            Command::SelectModel { model_id } => self.select_model(chat_id, &model_id).await,
            Command::SyncModels => self.sync_models().await,
            Command::SetLanguage { language } => self.set_language(chat_id, &language).await,
            Command::History { limit } => {
                let topic = self.storage.get_current_topic(chat_id).await?;
                let query = HistoryQuery {
                    chat_id,
                    topic: Some(topic.clone()),
                    limit: limit.unwrap_or(DEFAULT_HISTORY).min(MAX_HISTORY),
                };
                let history = self.storage.get_history(&query).await?;
                Ok(format::messages(
                    &format!("History of {topic}:"),
                    &history,
                    "No messages in this topic yet.",
                ))
            }
            Command::Search { keyword } => {
                let found = self.storage.search(chat_id, &keyword, SEARCH_LIMIT).await?;
                Ok(format::messages(
                    &format!("Messages matching \"{keyword}\":"),
                    &found,
                    &format!("No messages match \"{keyword}\"."),
                ))
            }
            Command::SetAutoReply { enabled } => self.set_auto_reply(chat_id, enabled).await,
            Command::ShowContinuation => {
                let topic = self.storage.get_current_topic(chat_id).await?;
                let ctx = self
                    .storage
                    .continue_context(chat_id, &topic, self.config.storage.context_window)
                    .await?;
                Ok(render_continuation(&ctx, None))
            }
            Command::ShowDocument => {
                let topic = self.storage.get_current_topic(chat_id).await?;
                let document = self.storage.get_active_document(chat_id, &topic).await?;
                Ok(format::document(document.as_ref()))
            }
            Command::FreeForm { text, overrides } => self.free_form(chat_id, &text, &overrides).await,
        }
    }

    async fn show_profile(&self, chat_id: ChatId) -> Result<String, ParleyError> {
        let profile = self
            .resolver
            .resolve(self.storage.as_ref(), chat_id, &Overrides::default())
            .await?;
        let auto_reply = self.storage.get_auto_reply(chat_id, &profile.topic).await?;
        Ok(format::profile(&profile, auto_reply))
    }

    async fn switch_topic(&self, chat_id: ChatId, topic: &str) -> Result<String, ParleyError> {
        validate_topic(topic)?;
        let previous = self.storage.get_current_topic(chat_id).await?;
        if previous == topic {
            return Ok(format!("Already in topic {topic}."));
        }
        self.storage.set_current_topic(chat_id, topic).await?;
        let agent = self.storage.get_selected_agent(chat_id, topic).await?;
        self.audit(chat_id, topic, &agent, &format!("Topic switched from {previous} to {topic}"))
            .await?;
        info!(chat_id = chat_id.0, from = %previous, to = topic, "topic switched");
        Ok(format!("Switched to topic {topic}."))
    }

    async fn switch_agent(&self, chat_id: ChatId, agent: &str) -> Result<String, ParleyError> {
        self.require_agent(agent)?;
        let topic = self.storage.get_current_topic(chat_id).await?;
        self.storage.set_selected_agent(chat_id, &topic, agent).await?;
        self.audit(chat_id, &topic, agent, &format!("Agent set to {agent}")).await?;
        info!(chat_id = chat_id.0, topic = %topic, agent, "agent switched");
        Ok(format!("Agent for {topic} is now {agent}."))
    }

    async fn list_models(&self, chat_id: ChatId, more: bool) -> Result<String, ParleyError> {
        let topic = self.storage.get_current_topic(chat_id).await?;
        let selected = self.storage.get_selected_model(chat_id, &topic).await?;
        let models = self.catalog.list();

        let start = if more {
            self.storage.get_page_cursor(chat_id, &topic).await? + MODEL_PAGE
        } else {
            0
        };
        if more && start >= models.len() {
            return Ok("No more models. Use /models to start from the top.".to_string());
        }
        let end = (start + MODEL_PAGE).min(models.len());

        // Numbers stay absolute across pages, so the whole listing is cached.
        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        self.storage.set_candidates(chat_id, &topic, &ids).await?;
        self.storage.set_page_cursor(chat_id, &topic, start).await?;
        self.storage.set_nav_step(chat_id, &topic, CHOOSE_MODEL_STEP).await?;
        Ok(format::models(
            &models[start..end],
            start + 1,
            &selected,
            end < models.len(),
        ))
    }

    async fn select_model(&self, chat_id: ChatId, requested: &str) -> Result<String, ParleyError> {
        let topic = self.storage.get_current_topic(chat_id).await?;

        // A number picks from the last listing shown in this topic.
        let choosing = self.storage.get_nav_step(chat_id, &topic).await?.as_deref()
            == Some(CHOOSE_MODEL_STEP);
        let model_id = match requested.parse::<usize>() {
            Ok(n) if n > 0 && choosing => self
                .storage
                .get_candidates(chat_id, &topic)
                .await?
                .get(n - 1)
                .cloned()
                .unwrap_or_else(|| requested.to_string()),
            _ => requested.to_string(),
        };
        self.require_model(&model_id)?;

        self.storage.set_selected_model(chat_id, &topic, &model_id).await?;
        self.storage.set_nav_step(chat_id, &topic, "").await?;
        let agent = self.storage.get_selected_agent(chat_id, &topic).await?;
        self.audit(chat_id, &topic, &agent, &format!("Model set to {model_id}"))
            .await?;
        info!(chat_id = chat_id.0, topic = %topic, model = %model_id, "model selected");
        Ok(format!("Model for {topic} is now {model_id}."))
    }

    async fn sync_models(&self) -> Result<String, ParleyError> {
        let seeds = self.config.completion.catalog_seeds();

        let found = match discover_models(
            self.gateway.provider().as_ref(),
            &seeds,
            self.config.completion.request_timeout(),
        )
        .await
        {
            Ok(found) => found,
            Err(ParleyError::Disabled) => {
                return Ok("Model sync needs a completion credential.".to_string());
            }
            Err(e) => return Err(e),
        };

        if found.is_empty() {
            warn!(probed = seeds.len(), "model sync found no working model");
            return Ok("No model answered; the catalog is unchanged.".to_string());
        }
        let count = found.len();
        self.catalog.replace(found).await?;
        Ok(format!("Model catalog refreshed: {count} model(s) available."))
    }

    async fn set_language(&self, chat_id: ChatId, language: &str) -> Result<String, ParleyError> {
        self.require_language(language)?;
        let topic = self.storage.get_current_topic(chat_id).await?;
        self.storage.set_language(chat_id, &topic, language).await?;
        let agent = self.storage.get_selected_agent(chat_id, &topic).await?;
        self.audit(chat_id, &topic, &agent, &format!("Language set to {language}"))
            .await?;
        Ok(format!("Replies in {topic} will use language {language}."))
    }

    async fn set_auto_reply(&self, chat_id: ChatId, enabled: bool) -> Result<String, ParleyError> {
        let topic = self.storage.get_current_topic(chat_id).await?;
        self.storage.set_auto_reply(chat_id, &topic, enabled).await?;
        let agent = self.storage.get_selected_agent(chat_id, &topic).await?;
        let state = if enabled { "on" } else { "off" };
        self.audit(chat_id, &topic, &agent, &format!("Auto-reply turned {state}"))
            .await?;
        Ok(format!("Auto-reply is {state} in {topic}."))
    }

    async fn free_form(
        &self,
        chat_id: ChatId,
        text: &str,
        overrides: &Overrides,
    ) -> Result<String, ParleyError> {
        if let Some(topic) = overrides.topic.as_deref() {
            validate_topic(topic)?;
        }
        if let Some(agent) = overrides.agent.as_deref() {
            self.require_agent(agent)?;
        }
        if let Some(model) = overrides.model.as_deref() {
            self.require_model(model)?;
        }
        if let Some(language) = overrides.language.as_deref() {
            self.require_language(&language.to_lowercase())?;
        }

        let profile = self
            .resolver
            .resolve(self.storage.as_ref(), chat_id, overrides)
            .await?;
        let stored = self
            .storage
            .append(chat_id, &profile.topic, Role::User, text, &profile.agent)
            .await?;

        if !self.gateway.is_enabled() {
            return Ok(format::user_error(&ParleyError::Disabled));
        }
        if !self.storage.get_auto_reply(chat_id, &profile.topic).await? {
            return Ok(format!(
                "Saved. Auto-reply is off in {} (/mode on to enable).",
                profile.topic
            ));
        }

        let ctx = self
            .storage
            .continue_context(chat_id, &profile.topic, self.config.storage.context_window)
            .await?
            .with_identity(&profile.agent, &profile.model);
        let extra_context = self
            .storage
            .get_active_document(chat_id, &profile.topic)
            .await?
            .map(|doc| format::document_context(&doc));

        let waited = self
            .limiter
            .acquire(&ThreadKey::new(chat_id, profile.topic.clone()))
            .await;

        let request = ReplyRequest {
            model_id: profile.model.clone(),
            topic: profile.topic.clone(),
            agent: profile.agent.clone(),
            language: profile.language.clone(),
            user_input: text.to_string(),
            context_summary: render_continuation(&ctx, Some(stored.seq)),
            extra_context,
        };
        let reply = self.gateway.generate_reply(&request).await?;

        self.storage
            .append(chat_id, &profile.topic, Role::Assistant, &reply.text, &profile.agent)
            .await?;
        info!(
            chat_id = chat_id.0,
            topic = %profile.topic,
            model = %profile.model,
            attempts = reply.attempts,
            waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
            "reply generated"
        );
        Ok(reply.text)
    }

    /// Downloads, ingests and activates an attached document for the current topic.
    pub(crate) async fn attach_document(
        &self,
        chat_id: ChatId,
        document: &DocumentRef,
    ) -> Result<String, ParleyError> {
        let bytes = self.channel.download_file(&document.file_id).await?;
        let file_name = document.file_name.as_deref().unwrap_or("document");
        let record = self.ingestor.ingest(file_name, &bytes).await?;

        let topic = self.storage.get_current_topic(chat_id).await?;
        self.storage.set_active_document(chat_id, &topic, &record).await?;
        let agent = self.storage.get_selected_agent(chat_id, &topic).await?;
        self.audit(
            chat_id,
            &topic,
            &agent,
            &format!("Active document set to {}", record.title),
        )
        .await?;
        Ok(format!(
            "Document saved: {} ({}). It will be used as reference in {topic}.",
            record.title, record.category
        ))
    }

    async fn audit(&self, chat_id: ChatId, topic: &str, agent: &str, note: &str) -> Result<(), ParleyError> {
        self.storage
            .append(chat_id, topic, Role::System, note, agent)
            .await?;
        Ok(())
    }

    fn require_model(&self, model_id: &str) -> Result<(), ParleyError> {
        if self.catalog.find_by_id(model_id).is_some() {
            return Ok(());
        }
        Err(ParleyError::Validation(format!(
            "Unknown model `{model_id}`. Use /models to see the available models."
        )))
    }

    fn require_agent(&self, agent: &str) -> Result<(), ParleyError> {
        let known = if self.config.agents.is_empty() {
            agent == self.config.agent.default_agent
        } else {
            self.config.agent_spec(agent).is_some()
        };
        if known {
            return Ok(());
        }
        let names: Vec<&str> = if self.config.agents.is_empty() {
            vec![self.config.agent.default_agent.as_str()]
        } else {
            self.config.agents.iter().map(|a| a.name.as_str()).collect()
        };
        Err(ParleyError::Validation(format!(
            "Unknown agent `{agent}`. Available: {}.",
            names.join(", ")
        )))
    }

    fn require_language(&self, language: &str) -> Result<(), ParleyError> {
        if self.config.agent.languages.iter().any(|l| l == language) {
            return Ok(());
        }
        Err(ParleyError::Validation(format!(
            "Unsupported language `{language}`. Available: {}.",
            self.config.agent.languages.join(", ")
        )))
    }
}

fn validate_topic(topic: &str) -> Result<(), ParleyError> {
    let valid = !topic.is_empty()
        && topic.chars().count() <= MAX_TOPIC_CHARS
        && topic
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ParleyError::Validation(format!(
            "Invalid topic `{topic}`. Use up to {MAX_TOPIC_CHARS} letters, digits, '-', '_' or '.'."
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names_are_validated() {
        assert!(validate_topic("research").is_ok());
        assert!(validate_topic("연구-2").is_ok());
        assert!(validate_topic("*").is_err());
        assert!(validate_topic("").is_err());
        assert!(validate_topic(&"x".repeat(65)).is_err());
    }
}
