// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible chat completion endpoints.
//!
//! The client makes exactly one logical attempt per call. Within that attempt
//! it walks its credential list: a 401/403 on one credential moves straight to
//! the next one, and only the last refusal is returned. Retry and backoff
//! belong to the gateway, not to the client.

use std::time::Duration;

use parley_core::ParleyError;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, ChatRequest, ChatResponse};

/// HTTP client for a chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Vec<SecretString>,
    timeout: Duration,
}

impl OpenAiCompatClient {
    /// Creates a client for `base_url` trying `credentials` in order.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Vec<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ParleyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ParleyError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            credentials,
            timeout,
        })
    }

    /// True when at least one credential is configured.
    pub fn has_credentials(&self) -> bool {
        !self.credentials.is_empty()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends one completion request.
    pub async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ParleyError> {
        if self.credentials.is_empty() {
            return Err(ParleyError::Disabled);
        }

        let mut last_error = None;
        for (index, credential) in self.credentials.iter().enumerate() {
            match self.send_with(credential, request).await {
                Err(ParleyError::Provider {
                    status: Some(status @ (401 | 403)),
                    message,
                    ..
                }) if index + 1 < self.credentials.len() => {
                    warn!(status, credential = index, "credential refused, trying fallback");
                    last_error = Some(ParleyError::provider(message, Some(status)));
                }
                other => return other,
            }
        }

        Err(last_error.unwrap_or(ParleyError::Disabled))
    }

    async fn send_with(
        &self,
        credential: &SecretString,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ParleyError> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(credential.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ParleyError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    ParleyError::Provider {
                        message: format!("HTTP request failed: {e}"),
                        status: None,
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        debug!(status = %status, model = %request.model, "completion response received");

        let body = response.text().await.map_err(|e| ParleyError::Provider {
            message: format!("failed to read response body: {e}"),
            status: Some(status.as_u16()),
            source: Some(Box::new(e)),
        })?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| ParleyError::Provider {
                message: format!("failed to parse API response: {e}"),
                status: Some(status.as_u16()),
                source: Some(Box::new(e)),
            });
        }

        let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(api_err) => match api_err.error.code_str() {
                Some(code) => format!("API error {status} ({code}): {}", api_err.error.message),
                None => format!("API error {status}: {}", api_err.error.message),
            },
            Err(_) => format!("API returned {status}: {body}"),
        };
        Err(ParleyError::provider(message, Some(status.as_u16())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str, keys: &[&str]) -> OpenAiCompatClient {
        OpenAiCompatClient::new(
            format!("{base_url}/v1/chat/completions"),
            keys.iter().map(|k| SecretString::from(k.to_string())).collect(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gpt-x".into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: Some("Hello".into()),
            }],
            max_tokens: 64,
        }
    }

    fn success_body() -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-x",
            "choices": [{"message": {"role": "assistant", "content": "Hi there!"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
        })
    }

    #[tokio::test]
    async fn complete_success_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-primary"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server.uri(), &["sk-primary"])
            .complete(&request())
            .await
            .unwrap();
        assert_eq!(response.text(), "Hi there!");
        assert_eq!(response.id.as_deref(), Some("chatcmpl-1"));
    }

    #[tokio::test]
    async fn refused_credential_falls_back_to_next() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer sk-primary"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"message": "no access to model", "type": "permission_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer sk-backup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server.uri(), &["sk-primary", "sk-backup"])
            .complete(&request())
            .await
            .unwrap();
        assert_eq!(response.text(), "Hi there!");
    }

    #[tokio::test]
    async fn all_credentials_refused_returns_last_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .expect(2)
            .mount(&server)
            .await;

        let err = client(&server.uri(), &["a", "b"])
            .complete(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Provider { status: Some(401), .. }));
    }

    #[tokio::test]
    async fn server_error_is_not_retried_by_client() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": {"message": "overloaded", "code": "server_busy"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server.uri(), &["a", "b"])
            .complete(&request())
            .await
            .unwrap_err();
        match err {
            ParleyError::Provider { status, message, .. } => {
                assert_eq!(status, Some(503));
                assert!(message.contains("server_busy"));
                assert!(message.contains("overloaded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(success_body())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new(
            format!("{}/v1/chat/completions", server.uri()),
            vec![SecretString::from("k".to_string())],
            Duration::from_millis(50),
        )
        .unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ParleyError::Timeout { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn no_credentials_is_disabled() {
        let c = client("http://127.0.0.1:9", &[]);
        assert!(!c.has_credentials());
        assert!(matches!(
            c.complete(&request()).await.unwrap_err(),
            ParleyError::Disabled
        ));
    }
}
