/*
 * @file chat.rs
 * @brief OpenAI-compatible chat client
 * @author Kevin Thomas
 * @date 2025
 *
 * MIT License
 *
 * Copyright (c) 2025 Kevin Thomas
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Chat-completion adapter.
//!
//! [`ChatClient`] is the seam the agent talks to; [`OpenAiCompatClient`]
//! is the HTTPS implementation for any OpenAI-compatible provider.

use std::env;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::ChatError;
use crate::message::Message;

/// Something that turns an assembled message list into assistant text.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends `messages` to `model` and returns the reply, whitespace-trimmed.
    ///
    /// # Errors
    /// Transport, authentication and decoding failures are returned as-is;
    /// implementations do not retry.
    async fn complete(&self, model: &str, messages: &[Message]) -> Result<String, ChatError>;
}

/// Client for `POST {api_base}/chat/completions`.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    api_base: String,
    api_key_env: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAiCompatClient {
    /// Creates a client for `api_base`, reading the bearer key from `api_key_env`.
    ///
    /// The key is looked up on every call, so a missing credential only
    /// surfaces when the first request is made.
    pub fn new(api_base: impl Into<String>, api_key_env: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            api_key_env: api_key_env.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.api_base.clone(), config.api_key_env.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    fn api_key(&self) -> Result<String, ChatError> {
        env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ChatError::MissingApiKey(self.api_key_env.clone()))
    }
}

#[async_trait]
impl ChatClient for OpenAiCompatClient {
    async fn complete(&self, model: &str, messages: &[Message]) -> Result<String, ChatError> {
        let api_key = self.api_key()?;
        tracing::debug!(model, messages = messages.len(), "sending chat completion");

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&ChatCompletionRequest { model, messages })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        parse_completion(&body)
    }
}

/// Extracts the first choice's text from a completion body.
fn parse_completion(body: &str) -> Result<String, ChatError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|err| ChatError::Malformed(err.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| ChatError::Malformed("response contained no message content".into()))
}

/// Prefers the provider's `error.message`, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_completion_trims_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  The Colosseum.\n"}},
                      {"message":{"role":"assistant","content":"ignored"}}]}"#;
        assert_eq!(parse_completion(body).expect("content"), "The Colosseum.");
    }

    #[test]
    fn parse_completion_rejects_empty_choices() {
        let err = parse_completion(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, ChatError::Malformed(_)));
    }

    #[test]
    fn parse_completion_rejects_null_content() {
        let err = parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap_err();
        assert!(matches!(err, ChatError::Malformed(_)));
    }

    #[test]
    fn parse_completion_rejects_non_json() {
        assert!(matches!(
            parse_completion("<html>bad gateway</html>"),
            Err(ChatError::Malformed(_))
        ));
    }

    #[test]
    fn error_message_prefers_provider_text() {
        let body = r#"{"error":{"message":"API key not valid","code":400}}"#;
        assert_eq!(error_message(body), "API key not valid");
        assert_eq!(error_message(" upstream timeout "), "upstream timeout");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = OpenAiCompatClient::new("https://example.test/v1/", "KEY");
        assert_eq!(client.endpoint(), "https://example.test/v1/chat/completions");
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = OpenAiCompatClient::new("http://127.0.0.1:9", "GUIDI_TEST_UNSET_KEY_4F2A");
        let err = client
            .complete("model", &[Message::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::MissingApiKey(ref name) if name == "GUIDI_TEST_UNSET_KEY_4F2A"));
    }
}
