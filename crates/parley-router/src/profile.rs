// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session profile resolution.
//!
//! Each of topic, agent, model and language resolves independently:
//! per-message override, then the stored topic state, then the configured default.

use parley_core::{ChatId, ParleyError, Profile, StorageAdapter};

use crate::command::Overrides;

/// Resolves the `(topic, agent, model, language)` tuple for one inbound message.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileResolver;

impl ProfileResolver {
    pub fn new() -> Self {
        Self
    }

    /// The topic is resolved first (override, chat's current topic, default);
    /// the other fields are then read from that topic's state.
    pub async fn resolve(
        &self,
        store: &dyn StorageAdapter,
        chat_id: ChatId,
        overrides: &Overrides,
    ) -> Result<Profile, ParleyError> {
        let topic = match non_blank(&overrides.topic) {
            Some(topic) => topic.to_string(),
            None => store.get_current_topic(chat_id).await?,
        };
        let agent = match non_blank(&overrides.agent) {
            Some(agent) => agent.to_string(),
            None => store.get_selected_agent(chat_id, &topic).await?,
        };
        let model = match non_blank(&overrides.model) {
            Some(model) => model.to_string(),
            None => store.get_selected_model(chat_id, &topic).await?,
        };
        let language = match non_blank(&overrides.language) {
            Some(language) => language.to_lowercase(),
            None => store.get_language(chat_id, &topic).await?,
        };
        Ok(Profile {
            topic,
            agent,
            model,
            language,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
