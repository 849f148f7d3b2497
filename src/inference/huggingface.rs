//! HuggingFace hosted-inference backend, guarded by the shared rate limiter.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{DEFAULT_TIMEOUT, Inference, InferenceError};
use crate::rate_limiter::RateLimiter;

pub const DEFAULT_MODEL_URL: &str =
    "https://api-inference.huggingface.co/models/facebook/blenderbot-400M-distill";

pub struct HostedInferenceClient {
    api_key: String,
    model_url: String,
    limiter: Arc<RateLimiter>,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize, Debug)]
struct Generated {
    generated_text: String,
}

impl HostedInferenceClient {
    pub fn new(api_key: String, limiter: Arc<RateLimiter>) -> Result<Self, reqwest::Error> {
        Self::with_options(api_key, DEFAULT_MODEL_URL.to_string(), limiter, DEFAULT_TIMEOUT)
    }

    pub fn with_options(
        api_key: String,
        model_url: String,
        limiter: Arc<RateLimiter>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            model_url,
            limiter,
            http,
        })
    }

    pub fn model_url(&self) -> &str {
        &self.model_url
    }
}

impl Inference for HostedInferenceClient {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    async fn infer(&self, prompt: &str) -> Result<String, InferenceError> {
        if !self.limiter.can_make_request() {
            warn!(
                "Rate limit reached ({} requests/min), skipping inference call",
                self.limiter.quota()
            );
            return Err(InferenceError::RateLimited);
        }

        let response = self
            .http
            .post(&self.model_url)
            .bearer_auth(&self.api_key)
            .json(&GenerateRequest { inputs: prompt })
            .send()
            .await
            .map_err(|e| {
                warn!("HuggingFace request failed: {e}");
                InferenceError::from_reqwest(e)
            })?;

        let status = response.status();
        debug!("HuggingFace response status: {status}");

        if status.as_u16() != 200 {
            warn!("HuggingFace API error: status {status}");
            return Err(InferenceError::Upstream(status.as_u16()));
        }

        let generated: Vec<Generated> = response.json().await.map_err(|e| {
            warn!("Failed to parse HuggingFace response: {e}");
            InferenceError::from_reqwest(e)
        })?;

        generated
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .ok_or_else(|| {
                warn!("HuggingFace returned an empty result");
                InferenceError::Unknown("Empty result array".to_string())
            })
    }
}
