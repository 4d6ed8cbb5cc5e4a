use std::time::Duration;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::Client;
use tracing::{debug, warn};

use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::config::{Config, Token};

pub const API_BASE: &str = "https://router.huggingface.co/hf-inference/models";
/// Upper bound on generated tokens per answer.
pub const MAX_OUTPUT_TOKENS: u32 = 512;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Characters to percent-encode in model ids. Keeps `/` so `org/model` stays two path segments.
const MODEL_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'?')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+');

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("HF_TOKEN not set. Create one at https://huggingface.co/settings/tokens")]
    TokenNotSet,

    #[error("Hugging Face rejected the token: {0}")]
    Unauthorized(String),

    #[error("Inference API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("Model is loading, try again shortly: {0}")]
    ModelLoading(String),

    #[error("Inference API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Generation settings sent with every completion request. Streaming is always off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationParams {
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens: max_tokens.clamp(1, MAX_OUTPUT_TOKENS),
            temperature: temperature.clamp(0.0, 2.0),
        }
    }
}

/// Hosted text generation from role-tagged messages.
/// Implemented by `InferenceClient` for production; mock implementations used in tests.
pub trait ModelCaller {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, ModelError>;
}

#[derive(Clone)]
pub struct InferenceClient {
    http: Client,
    token: Token,
    model: String,
    base_url: String,
}

impl InferenceClient {
    pub fn from_config(http: Client, config: &Config) -> Result<Self, ModelError> {
        let token = config.token.clone().ok_or(ModelError::TokenNotSet)?;
        Ok(Self {
            http,
            token,
            model: config.model.clone(),
            base_url: config.inference_base.clone(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            token: Token::new("hf_test").expect("non-empty"),
            model: "HuggingFaceH4/zephyr-7b-beta".to_string(),
            base_url: base_url.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/v1/chat/completions",
            self.base_url.trim_end_matches('/'),
            utf8_percent_encode(&self.model, MODEL_ENCODE_SET)
        )
    }
}

impl ModelCaller for InferenceClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, ModelError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(self.token.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = extract_error_message(&text, status);
            let err = match status.as_u16() {
                401 | 403 => ModelError::Unauthorized(message),
                429 => ModelError::RateLimited,
                503 => ModelError::ModelLoading(message),
                code => ModelError::Api { code, message },
            };
            warn!(status = %status, error = %err, "inference API error");
            return Err(err);
        }

        let body: ChatCompletionResponse = response.json().await?;
        if let Some(err) = &body.error {
            warn!("inference API error in 200 response");
            return Err(ModelError::Api {
                code: status.as_u16(),
                message: err.message(),
            });
        }

        let answer = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)?;

        debug!(model = %self.model, bytes = answer.len(), "completion received");
        Ok(answer)
    }
}

fn extract_error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_str::<ChatCompletionResponse>(body)
        && let Some(err) = parsed.error
    {
        return err.message();
    }
    if body.trim().is_empty() {
        return format!("HTTP {status}");
    }
    body.chars().take(200).collect()
}
