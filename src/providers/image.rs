//! Image-generation provider adapters.
//!
//! Each adapter makes one request (OpenAI may need a second one to fetch a
//! returned URL) and hands back the encoded image bytes. Moderation and
//! rate-limit answers become [`ProviderError::Rejected`] so the
//! orchestrator skips to the next backend instead of retrying.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::status_error;
use crate::config::{Endpoints, ImageProviderSettings};
use crate::errors::ProviderError;
use crate::http::{build_client, IMAGE_PROVIDER_TIMEOUT};

/// Square output edge requested from every backend
pub const IMAGE_SIZE: u32 = 1024;

const MODERATION_MARKERS: &[&str] = &["content_policy_violation", "moderation_blocked", "safety system"];

/// A backend that turns a prompt into an encoded image
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Image backend without credentials
#[derive(Debug, Clone)]
pub struct DisabledImageProvider {
    name: String,
}

impl DisabledImageProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl ImageProvider for DisabledImageProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, _: &str) -> Result<Vec<u8>, ProviderError> {
        Err(ProviderError::MissingCredentials(self.name.clone()))
    }
}

/// Map rejection-like statuses to `Rejected`, everything else to `Status`
async fn classify_failure(response: reqwest::Response) -> ProviderError {
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        return ProviderError::Rejected("rate limited".into());
    }
    match status_error(response).await {
        ProviderError::Status { body, .. }
            if MODERATION_MARKERS
                .iter()
                .any(|marker| body.to_lowercase().contains(marker)) =>
        {
            ProviderError::Rejected("content policy".into())
        }
        other => other,
    }
}

fn non_empty(bytes: Vec<u8>) -> Result<Vec<u8>, ProviderError> {
    if bytes.is_empty() {
        Err(ProviderError::EmptyResponse)
    } else {
        Ok(bytes)
    }
}

/// OpenAI `/images/generations`
pub struct OpenAiImageProvider {
    base_url: String,
    model: String,
    key: String,
    client: Client,
}

impl OpenAiImageProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            key: key.into(),
            client: build_client(IMAGE_PROVIDER_TIMEOUT),
        }
    }
}

#[async_trait]
impl ImageProvider for OpenAiImageProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ProviderError> {
        let mut body = json!({
            "model": self.model,
            "prompt": prompt,
            "n": 1,
            "size": format!("{IMAGE_SIZE}x{IMAGE_SIZE}"),
        });
        // gpt-image models always answer with b64 and reject the field
        if self.model.starts_with("dall-e") {
            body["response_format"] = json!("b64_json");
        }

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Unparsable(e.to_string()))?;

        if let Some(encoded) = payload.pointer("/data/0/b64_json").and_then(Value::as_str) {
            let bytes = STANDARD
                .decode(encoded.trim())
                .map_err(|e| ProviderError::Unparsable(e.to_string()))?;
            return non_empty(bytes);
        }

        let url = payload
            .pointer("/data/0/url")
            .and_then(Value::as_str)
            .ok_or(ProviderError::EmptyResponse)?;
        debug!(url, "Fetching generated image");
        let image = self.client.get(url).send().await?;
        if !image.status().is_success() {
            return Err(status_error(image).await);
        }
        non_empty(image.bytes().await?.to_vec())
    }
}

/// Hugging Face inference API; the model answers with raw image bytes
pub struct HuggingFaceProvider {
    base_url: String,
    model: String,
    token: String,
    client: Client,
}

impl HuggingFaceProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            token: token.into(),
            client: build_client(IMAGE_PROVIDER_TIMEOUT),
        }
    }
}

#[async_trait]
impl ImageProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, self.model))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "image/png")
            .json(&json!({ "inputs": prompt }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }
        if is_json(&response) {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unparsable(body));
        }
        non_empty(response.bytes().await?.to_vec())
    }
}

/// Keyless Pollinations GET endpoint
pub struct PollinationsProvider {
    base_url: String,
    client: Client,
}

impl PollinationsProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(IMAGE_PROVIDER_TIMEOUT),
        }
    }

    fn prompt_url(&self, prompt: &str) -> String {
        format!(
            "{}/prompt/{}?width={IMAGE_SIZE}&height={IMAGE_SIZE}&nologo=true",
            self.base_url,
            urlencoding::encode(prompt)
        )
    }
}

#[async_trait]
impl ImageProvider for PollinationsProvider {
    fn name(&self) -> &str {
        "pollinations"
    }

    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self.client.get(self.prompt_url(prompt)).send().await?;
        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }
        if is_json(&response) {
            return Err(ProviderError::Unparsable("expected image bytes".into()));
        }
        non_empty(response.bytes().await?.to_vec())
    }
}

fn is_json(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("json"))
        .unwrap_or(false)
}

/// Build every known image provider; missing credentials disable a backend
pub fn build_image_providers(
    settings: &ImageProviderSettings,
    endpoints: &Endpoints,
) -> Vec<Arc<dyn ImageProvider>> {
    let openai: Arc<dyn ImageProvider> = match &settings.openai_key {
        Some(key) => Arc::new(OpenAiImageProvider::new(
            &endpoints.openai,
            &settings.openai_model,
            key,
        )),
        None => Arc::new(DisabledImageProvider::new("openai")),
    };
    let huggingface: Arc<dyn ImageProvider> = match &settings.hf_token {
        Some(token) => Arc::new(HuggingFaceProvider::new(
            &endpoints.huggingface,
            &settings.hf_model,
            token,
        )),
        None => Arc::new(DisabledImageProvider::new("huggingface")),
    };
    let pollinations: Arc<dyn ImageProvider> =
        Arc::new(PollinationsProvider::new(&endpoints.pollinations));

    vec![openai, huggingface, pollinations]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pollinations_url_is_encoded() {
        let provider = PollinationsProvider::new("https://image.example.com/");
        let url = provider.prompt_url("Netflix Premium, no text");
        assert_eq!(
            url,
            "https://image.example.com/prompt/Netflix%20Premium%2C%20no%20text?width=1024&height=1024&nologo=true"
        );
    }

    #[test]
    fn test_registry_keeps_keyless_backend() {
        let providers =
            build_image_providers(&ImageProviderSettings::default(), &Endpoints::default());
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["openai", "huggingface", "pollinations"]);
    }

    #[tokio::test]
    async fn test_disabled_image_provider() {
        let err = DisabledImageProvider::new("openai")
            .generate("x")
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_empty_bytes_are_an_error() {
        assert_eq!(non_empty(Vec::new()), Err(ProviderError::EmptyResponse));
        assert_eq!(non_empty(vec![1]), Ok(vec![1]));
    }
}
