use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-16k-0613";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A request/response text-generation call.
pub trait ChatService {
    /// Sends `messages` and returns the first choice's text, or `None` when
    /// the service answered without any content.
    fn complete(&self, messages: &[ChatMessage]) -> Result<Option<String>, ServiceError>;
}

impl<T: ChatService + ?Sized> ChatService for &T {
    fn complete(&self, messages: &[ChatMessage]) -> Result<Option<String>, ServiceError> {
        (**self).complete(messages)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat completions over HTTP with bearer authentication.
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            api_base: api_base.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

impl ChatService for OpenAiClient {
    fn complete(&self, messages: &[ChatMessage]) -> Result<Option<String>, ServiceError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
        };
        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(ServiceError::Status { status, body });
        }

        let parsed: CompletionResponse = resp.json()?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty());
        debug!("service replied: {content:?}");
        Ok(content)
    }
}
