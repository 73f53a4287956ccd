//! Text-generation provider adapters.
//!
//! Two wire formats are supported: OpenAI-compatible chat completions
//! (OpenAI, OpenRouter, Groq) and Google Gemini `generateContent`. Both ask
//! for strict JSON at low temperature and return the parsed object.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{status_error, CredentialPool};
use crate::config::{Endpoints, TextProviderSettings};
use crate::errors::ProviderError;
use crate::http::{build_client, TEXT_PROVIDER_TIMEOUT};
use crate::text_processing::parse_model_json;

/// Sampling temperature used for every extraction request
pub const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// A text backend that answers a system + user prompt with a JSON object
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Identifier used in provider orders (`"openai"`, `"gemini"`, ...)
    fn name(&self) -> &str;

    /// Send both prompts and return the JSON object found in the reply
    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Map<String, Value>, ProviderError>;
}

/// Adapter for backends without credentials; always fails without a request
#[derive(Debug, Clone)]
pub struct DisabledProvider {
    name: String,
}

impl DisabledProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl TextProvider for DisabledProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_json(&self, _: &str, _: &str) -> Result<Map<String, Value>, ProviderError> {
        Err(ProviderError::MissingCredentials(self.name.clone()))
    }
}

/// OpenAI-compatible `/chat/completions` adapter
pub struct OpenAiCompatibleProvider {
    name: String,
    base_url: String,
    model: String,
    keys: CredentialPool,
    json_mode: bool,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        keys: CredentialPool,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            keys,
            json_mode: true,
            client: build_client(TEXT_PROVIDER_TIMEOUT),
        }
    }

    /// Disable the `response_format` field for backends that reject it
    pub fn without_json_mode(mut self) -> Self {
        self.json_mode = false;
        self
    }

    fn request_body(&self, system_prompt: &str, user_prompt: &str) -> Value {
        let mut body = json!({
            "model": self.model,
            "temperature": EXTRACTION_TEMPERATURE,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
        });
        if self.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }

    async fn call_with_key(
        &self,
        key: &str,
        body: &Value,
    ) -> Result<Map<String, Value>, ProviderError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Unparsable(e.to_string()))?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or(ProviderError::EmptyResponse)?;

        debug!(provider = %self.name, chars = content.len(), "Received completion");
        parse_model_json(content)
            .ok_or_else(|| ProviderError::Unparsable("no JSON object in completion".into()))
    }
}

#[async_trait]
impl TextProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Map<String, Value>, ProviderError> {
        let keys = self.keys.rotation();
        if keys.is_empty() {
            return Err(ProviderError::MissingCredentials(self.name.clone()));
        }

        let body = self.request_body(system_prompt, user_prompt);
        let mut last_error = ProviderError::EmptyResponse;
        for (index, key) in keys.iter().enumerate() {
            match self.call_with_key(key, &body).await {
                Ok(object) => return Ok(object),
                Err(e) => {
                    if keys.len() > 1 {
                        warn!(provider = %self.name, key_index = index, error = %e, "Key failed, rotating");
                    }
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

/// Google Gemini `generateContent` adapter
pub struct GeminiProvider {
    base_url: String,
    model: String,
    key: Option<String>,
    client: Client,
}

impl GeminiProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            key,
            client: build_client(TEXT_PROVIDER_TIMEOUT),
        }
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Map<String, Value>, ProviderError> {
        let key = self
            .key
            .as_deref()
            .ok_or_else(|| ProviderError::MissingCredentials("gemini".into()))?;

        let body = json!({
            "systemInstruction": {"parts": [{"text": system_prompt}]},
            "contents": [{"role": "user", "parts": [{"text": user_prompt}]}],
            "generationConfig": {
                "temperature": EXTRACTION_TEMPERATURE,
                "responseMimeType": "application/json",
            },
        });

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Unparsable(e.to_string()))?;
        let text: String = payload
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        parse_model_json(&text)
            .ok_or_else(|| ProviderError::Unparsable("no JSON object in candidate".into()))
    }
}

/// Build every known text provider; backends without credentials are
/// replaced by a [`DisabledProvider`] so startup never fails on them.
pub fn build_text_providers(
    settings: &TextProviderSettings,
    endpoints: &Endpoints,
) -> Vec<Arc<dyn TextProvider>> {
    let mut providers: Vec<Arc<dyn TextProvider>> = Vec::new();

    providers.push(match &settings.openai_key {
        Some(key) => Arc::new(OpenAiCompatibleProvider::new(
            "openai",
            &endpoints.openai,
            &settings.text_model,
            CredentialPool::single(Some(key.clone())),
        )),
        None => Arc::new(DisabledProvider::new("openai")),
    });

    providers.push(if settings.openrouter_keys.is_empty() {
        Arc::new(DisabledProvider::new("openrouter"))
    } else {
        Arc::new(OpenAiCompatibleProvider::new(
            "openrouter",
            &endpoints.openrouter,
            &settings.openrouter_model,
            CredentialPool::new(settings.openrouter_keys.clone()),
        ))
    });

    providers.push(match &settings.groq_key {
        Some(key) => Arc::new(OpenAiCompatibleProvider::new(
            "groq",
            &endpoints.groq,
            &settings.groq_model,
            CredentialPool::single(Some(key.clone())),
        )),
        None => Arc::new(DisabledProvider::new("groq")),
    });

    providers.push(match &settings.gemini_key {
        Some(key) => Arc::new(GeminiProvider::new(
            &endpoints.gemini,
            &settings.gemini_model,
            Some(key.clone()),
        )),
        None => Arc::new(DisabledProvider::new("gemini")),
    });

    providers
}
