// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`ProviderAdapter`] over an OpenAI-compatible chat completions endpoint.

use async_trait::async_trait;
use parley_config::model::CompletionConfig;
use parley_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, Role, TokenUsage,
};
use parley_core::{ParleyError, PluginAdapter, ProviderAdapter};
use secrecy::SecretString;
use tracing::info;

use crate::client::OpenAiCompatClient;
use crate::types::{ChatMessage, ChatRequest};

pub struct OpenAiCompatProvider {
    client: OpenAiCompatClient,
}

impl OpenAiCompatProvider {
    /// Builds the provider from `[completion]`. Blank keys are ignored; with no
    /// key left the provider reports itself disabled.
    pub fn new(config: &CompletionConfig) -> Result<Self, ParleyError> {
        let credentials: Vec<SecretString> = [&config.api_key, &config.fallback_api_key]
            .into_iter()
            .flatten()
            .filter(|key| !key.trim().is_empty())
            .map(|key| SecretString::from(key.trim().to_string()))
            .collect();

        info!(
            base_url = %config.base_url,
            credentials = credentials.len(),
            "completion provider initialized"
        );

        let client =
            OpenAiCompatClient::new(config.base_url.clone(), credentials, config.request_timeout())?;
        Ok(Self { client })
    }

    pub fn with_client(client: OpenAiCompatClient) -> Self {
        Self { client }
    }

    fn to_chat_request(request: &ProviderRequest) -> ChatRequest {
        let system = request.system_prompt.as_ref().map(|prompt| ChatMessage {
            role: Role::System.to_string(),
            content: Some(prompt.clone()),
        });
        let messages = system
            .into_iter()
            .chain(request.messages.iter().map(|m| ChatMessage {
                role: m.role.to_string(),
                content: Some(m.content.clone()),
            }))
            .collect();

        ChatRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        if self.client.has_credentials() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(
                "no completion credential configured".into(),
            ))
        }
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatProvider {
    fn is_enabled(&self) -> bool {
        self.client.has_credentials()
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ParleyError> {
        let chat_request = Self::to_chat_request(&request);
        let response = self.client.complete(&chat_request).await?;

        Ok(ProviderResponse {
            content: response.text(),
            model: response.model.clone().unwrap_or(request.model),
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            id: response.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::types::ProviderMessage;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String, key: Option<&str>) -> CompletionConfig {
        CompletionConfig {
            api_key: key.map(str::to_string),
            base_url,
            ..CompletionConfig::default()
        }
    }

    #[test]
    fn blank_keys_leave_provider_disabled() {
        let provider =
            OpenAiCompatProvider::new(&config("http://localhost".into(), Some("  "))).unwrap();
        assert!(!provider.is_enabled());
        let provider =
            OpenAiCompatProvider::new(&config("http://localhost".into(), Some("sk"))).unwrap();
        assert!(provider.is_enabled());
    }

    #[tokio::test]
    async fn system_prompt_is_sent_first() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-x",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "hi"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new(&config(server.uri(), Some("sk"))).unwrap();
        let response = provider
            .complete(ProviderRequest {
                model: "gpt-x".into(),
                system_prompt: Some("be brief".into()),
                messages: vec![ProviderMessage {
                    role: Role::User,
                    content: "hello".into(),
                }],
                max_tokens: 32,
            })
            .await
            .unwrap();

        assert_eq!(response.content, "hi");
        assert_eq!(response.model, "gpt-x");
        assert!(response.usage.is_none());
    }

    #[tokio::test]
    async fn health_reports_missing_credentials() {
        let provider = OpenAiCompatProvider::new(&config("http://localhost".into(), None)).unwrap();
        assert!(matches!(
            provider.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
    }
}
