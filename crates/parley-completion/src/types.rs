// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for OpenAI-compatible chat completion endpoints.

use serde::{Deserialize, Serialize};

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Successful response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<ApiUsage>,
}

impl ChatResponse {
    /// Text of the first choice, empty when the endpoint returned none.
    pub fn text(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ApiUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default, rename = "type")]
    pub type_: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

impl ApiError {
    /// `code` rendered as text, whether the endpoint sent a string or a number.
    pub fn code_str(&self) -> Option<String> {
        match &self.code {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_text_from_first_choice() {
        let body = serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-x",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hi"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        });
        let parsed: ChatResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.text(), "Hi");
        assert_eq!(parsed.usage.unwrap().total_tokens, 4);
    }

    #[test]
    fn response_without_choices_or_usage() {
        let parsed: ChatResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.text(), "");
        assert!(parsed.usage.is_none());
    }

    #[test]
    fn error_code_accepts_string_or_number() {
        let s: ApiErrorResponse = serde_json::from_str(
            r#"{"error": {"message": "no", "type": "invalid_request_error", "code": "model_not_found"}}"#,
        )
        .unwrap();
        assert_eq!(s.error.code_str().as_deref(), Some("model_not_found"));

        let n: ApiErrorResponse =
            serde_json::from_str(r#"{"error": {"message": "no", "code": 403}}"#).unwrap();
        assert_eq!(n.error.code_str().as_deref(), Some("403"));
    }
}
