// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion model adapter.
//!
//! One trait, one concrete implementation against the Anthropic messages
//! API. Failures come back as typed [`CompletionError`] values so the
//! composer can match on them instead of catching blindly.

use anyhow::Context;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::CompletionError;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Request envelope handed to a completion model.
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub max_tokens: usize,
    pub temperature: f32,
}

/// Trait implemented by concrete completion models.
pub trait CompletionModel: Send + Sync {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, CompletionError>;
}

/// Anthropic messages API client.
///
/// The request timeout doubles as the answer deadline: a slow model is
/// indistinguishable from a failed one and both end in the template path.
pub struct AnthropicModel {
    api_key: String,
    model: String,
    client: Client,
}

impl AnthropicModel {
    pub fn new(api_key: String, model: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build completion HTTP client")?;

        Ok(Self {
            api_key,
            model,
            client,
        })
    }
}

impl CompletionModel for AnthropicModel {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, CompletionError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(self.api_key.trim())
            .map_err(|err| CompletionError::Http(anyhow::Error::new(err)))?;
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![MessageTurn {
                role: "user",
                content: vec![ContentBlock {
                    kind: "text",
                    text: request.prompt,
                }],
            }],
        };

        let response = self
            .client
            .post(MESSAGES_URL)
            .headers(headers)
            .json(&body)
            .send()
            .map_err(|err| CompletionError::Http(anyhow::Error::new(err)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .map_err(|err| CompletionError::Http(anyhow::Error::new(err)))?;
        extract_text(parsed)
    }
}

fn extract_text(response: MessagesResponse) -> Result<String, CompletionError> {
    let text = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ResponseBlock::Text { text } => Some(text),
            ResponseBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        return Err(CompletionError::EmptyResponse);
    }
    Ok(text)
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<MessageTurn<'a>>,
}

#[derive(Serialize)]
struct MessageTurn<'a> {
    role: &'a str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
struct ContentBlock<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}
