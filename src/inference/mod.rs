//! Inference backends - turn a prompt into reply text from an external model.

pub mod huggingface;
pub mod openai;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{BackendKind, Config};
use crate::rate_limiter::RateLimiter;

pub use huggingface::HostedInferenceClient;
pub use openai::ChatCompletionClient;

/// Default per-request timeout for both backends.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const RATE_LIMITED_REPLY: &str =
    "Whoa, too many requests right now! Please wait a minute and try again. ⏳";
pub const OVERWHELMED_REPLY: &str =
    "My AI brain is a bit overwhelmed right now. Please try again in a moment. 🤯";
pub const UPSTREAM_ISSUE_REPLY: &str =
    "Hmm, there was an issue with my AI service. Please try again later. 🔧";
pub const TIMEOUT_REPLY: &str = "Sorry, that took too long to think about. Please try again! ⌛";
pub const TROUBLE_THINKING_REPLY: &str =
    "I'm having trouble thinking right now. Please try again later. 🤔";

/// Why an inference call produced no text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// Rejected locally by the rate limiter; no request was sent.
    RateLimited,
    /// The request exceeded the client timeout.
    Timeout,
    /// The API answered with a non-success status.
    Upstream(u16),
    /// Transport, decode or empty-result failure.
    Unknown(String),
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limit exceeded"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Upstream(status) => write!(f, "API error: status {status}"),
            Self::Unknown(detail) => write!(f, "{detail}"),
        }
    }
}

impl std::error::Error for InferenceError {}

impl InferenceError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Unknown(format!("HTTP error: {e}"))
        }
    }
}

/// A model backend.
pub trait Inference: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn infer(&self, prompt: &str) -> impl Future<Output = Result<String, InferenceError>> + Send;

    /// User-facing text for a failed call.
    fn apology(&self, err: &InferenceError) -> String {
        fixed_apology(err).to_string()
    }
}

/// The fixed apology set used by the hosted-inference backend.
pub fn fixed_apology(err: &InferenceError) -> &'static str {
    match err {
        InferenceError::RateLimited => RATE_LIMITED_REPLY,
        InferenceError::Timeout => TIMEOUT_REPLY,
        InferenceError::Upstream(429) => OVERWHELMED_REPLY,
        InferenceError::Upstream(_) => UPSTREAM_ISSUE_REPLY,
        InferenceError::Unknown(_) => TROUBLE_THINKING_REPLY,
    }
}

/// Run one inference call and map any failure to user-facing text.
pub async fn reply<B: Inference>(backend: &B, prompt: &str) -> String {
    match backend.infer(prompt).await {
        Ok(text) => text,
        Err(e) => backend.apology(&e),
    }
}

/// The backend chosen from config at startup.
pub enum Backend {
    ChatCompletion(ChatCompletionClient),
    HostedInference(HostedInferenceClient),
}

impl Backend {
    /// Build the backend selected in config. The hosted-inference backend gets
    /// its own limiter sized from `requests_per_minute`.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let backend = match config.backend {
            BackendKind::OpenAi => Backend::ChatCompletion(ChatCompletionClient::with_options(
                config.openai_api_key.clone(),
                config.openai_base_url.clone(),
                config.openai_model.clone(),
                config.persona.clone(),
                config.request_timeout,
            )?),
            BackendKind::HuggingFace => {
                let limiter = Arc::new(RateLimiter::new(config.requests_per_minute));
                Backend::HostedInference(HostedInferenceClient::with_options(
                    config.huggingface_api_key.clone(),
                    config.huggingface_model_url.clone(),
                    limiter,
                    config.request_timeout,
                )?)
            }
        };
        info!("Inference backend: {}", backend.name());
        Ok(backend)
    }
}

impl Inference for Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::ChatCompletion(c) => c.name(),
            Backend::HostedInference(c) => c.name(),
        }
    }

    async fn infer(&self, prompt: &str) -> Result<String, InferenceError> {
        match self {
            Backend::ChatCompletion(c) => c.infer(prompt).await,
            Backend::HostedInference(c) => c.infer(prompt).await,
        }
    }

    fn apology(&self, err: &InferenceError) -> String {
        match self {
            Backend::ChatCompletion(c) => c.apology(err),
            Backend::HostedInference(c) => c.apology(err),
        }
    }
}
