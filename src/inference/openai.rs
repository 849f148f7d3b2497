//! OpenAI chat-completion backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{DEFAULT_TIMEOUT, Inference, InferenceError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_PERSONA: &str = "You are a helpful assistant named Raka.";

const MAX_TOKENS: u32 = 150;
const TEMPERATURE: f64 = 0.7;

pub struct ChatCompletionClient {
    api_key: String,
    base_url: String,
    model: String,
    persona: String,
    http: reqwest::Client,
}

#[derive(Debug, Clone, Copy)]
enum Role {
    System,
    User,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
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

impl ChatCompletionClient {
    pub fn new(api_key: String) -> Result<Self, reqwest::Error> {
        Self::with_options(
            api_key,
            DEFAULT_BASE_URL.to_string(),
            DEFAULT_MODEL.to_string(),
            DEFAULT_PERSONA.to_string(),
            DEFAULT_TIMEOUT,
        )
    }

    /// Build a client against a custom endpoint (proxies, compatible APIs, tests).
    pub fn with_options(
        api_key: String,
        base_url: String,
        model: String,
        persona: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            persona,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Inference for ChatCompletionClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn infer(&self, prompt: &str) -> Result<String, InferenceError> {
        let request = ApiRequest {
            model: &self.model,
            messages: vec![
                ApiMessage {
                    role: Role::System.as_str(),
                    content: &self.persona,
                },
                ApiMessage {
                    role: Role::User.as_str(),
                    content: prompt,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("OpenAI request failed: {e}");
                InferenceError::from_reqwest(e)
            })?;

        let status = response.status();
        debug!("OpenAI response status: {status}");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("OpenAI API error {status}: {body}");
            return Err(InferenceError::Upstream(status.as_u16()));
        }

        let parsed: ApiResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse OpenAI response: {e}");
            InferenceError::Unknown(format!("Parse error: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| InferenceError::Unknown("Empty response".to_string()))
    }

    fn apology(&self, err: &InferenceError) -> String {
        format!("Sorry, I encountered an error: {err}")
    }
}
