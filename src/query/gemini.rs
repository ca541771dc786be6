//! Client for the Gemini `generateContent` API.
//!
//! The response is parsed defensively: the answer text sits several levels
//! deep (`candidates[0].content.parts[0].text`) and any missing level falls
//! back to a fixed string rather than failing the request. Network errors and
//! timeouts are reported as generation errors.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{error, instrument};
use url::Url;

use super::{FALLBACK_ANSWER, GenerationConfig, GenerationService};
use crate::types::RagError;

/// Public Gemini API base.
pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/";

/// Model used when the configuration names none.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Clone, Debug)]
pub struct GeminiClient {
    http: Client,
    base: Url,
    model: String,
}

impl GeminiClient {
    pub fn new(http: Client, model: impl Into<String>) -> Result<Self, RagError> {
        Self::with_base_url(http, DEFAULT_GEMINI_BASE, model)
    }

    pub fn with_base_url(
        http: Client,
        base: &str,
        model: impl Into<String>,
    ) -> Result<Self, RagError> {
        let base = Url::parse(base)
            .map_err(|err| RagError::Validation(format!("invalid Gemini base url: {err}")))?;
        Ok(Self {
            http,
            base,
            model: model.into(),
        })
    }

    fn endpoint(&self, api_key: &str) -> Result<Url, RagError> {
        let mut url = self
            .base
            .join(&format!("v1beta/models/{}:generateContent", self.model))
            .map_err(|err| RagError::Generation(format!("bad generation endpoint: {err}")))?;
        url.query_pairs_mut().append_pair("key", api_key);
        Ok(url)
    }
}

/// Pulls the generated text out of a `generateContent` response, if the
/// expected nesting is present.
pub fn extract_answer(response: &Value) -> Option<String> {
    response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl GenerationService for GeminiClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(
        &self,
        prompt: &str,
        api_key: &str,
        config: &GenerationConfig,
    ) -> Result<String, RagError> {
        let payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": config.temperature,
                "topK": config.top_k,
                "topP": config.top_p,
                "maxOutputTokens": config.max_output_tokens,
            }
        });

        let response = self
            .http
            .post(self.endpoint(api_key)?)
            .json(&payload)
            .timeout(config.timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    RagError::Generation(format!(
                        "generation request timed out after {:?}",
                        config.timeout
                    ))
                } else {
                    RagError::unavailable("generation service", err.to_string())
                }
            })?
            .error_for_status()
            .map_err(|err| RagError::Generation(format!("generation request failed: {err}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|err| RagError::Generation(format!("generation body unreadable: {err}")))?;

        match extract_answer(&body) {
            Some(text) => Ok(text),
            None => {
                error!(?body, "generation response missing expected answer field");
                Ok(FALLBACK_ANSWER.to_string())
            }
        }
    }
}
