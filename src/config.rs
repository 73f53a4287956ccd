//! # Configuration Module
//!
//! This module defines configuration structures for the catalog bot,
//! including retry settings, evidence thresholds, provider credentials and
//! storage destinations. Everything is read from environment variables
//! (optionally loaded from a `.env` file by `main`).

use std::time::Duration;

use crate::errors::ConfigError;

// Default provider orders when neither the session nor the environment sets one
pub const DEFAULT_TEXT_PROVIDER_ORDER: &[&str] = &["openai", "openrouter", "groq", "gemini"];
pub const DEFAULT_IMAGE_PROVIDER_ORDER: &[&str] = &["openai", "huggingface", "pollinations"];

pub const DEFAULT_TEXT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENROUTER_MODEL: &str = "meta-llama/llama-3.1-8b-instruct";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_OPENAI_IMAGE_MODEL: &str = "dall-e-3";
pub const DEFAULT_HF_IMAGE_MODEL: &str = "stabilityai/stable-diffusion-xl-base-1.0";

/// Retry configuration for one provider
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts made against a single provider before moving on
    pub max_attempts: u32,
    /// Base delay between retries in milliseconds
    pub base_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 800,
            max_delay_ms: 8000,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given zero-based failed attempt.
    ///
    /// Grows as `base * 2^attempt`, capped at `max_delay_ms`, plus up to 25%
    /// random jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(16))
            .min(self.max_delay_ms);
        let jitter = if exp >= 4 {
            rand::random::<u64>() % (exp / 4)
        } else {
            0
        };
        Duration::from_millis(exp + jitter)
    }
}

/// Thresholds for evidence gathering
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceLimits {
    /// Maximum pages fetched per search
    pub max_pages: usize,
    /// Minimum cleaned text for a page to count
    pub min_page_chars: usize,
    /// Per-page truncation
    pub page_chars: usize,
    /// Bundle size below which the encyclopedia is consulted
    pub thin_bundle_chars: usize,
    /// Minimum encyclopedia extract worth appending
    pub encyclopedia_min_chars: usize,
    /// Hard cap on the returned bundle
    pub bundle_chars: usize,
    /// Cap on readability-proxy text
    pub readability_chars: usize,
    /// Largest edit distance accepted for an official host
    pub official_max_distance: usize,
}

impl Default for EvidenceLimits {
    fn default() -> Self {
        Self {
            max_pages: 12,
            min_page_chars: 200,
            page_chars: 4000,
            thin_bundle_chars: 800,
            encyclopedia_min_chars: 400,
            bundle_chars: 20_000,
            readability_chars: 20_000,
            official_max_distance: 3,
        }
    }
}

/// Thresholds for the text enrichment orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichLimits {
    /// Cap on evidence handed to the model
    pub model_evidence_chars: usize,
    /// Descriptions shorter than this trigger the detail pass
    pub detail_description_chars: usize,
    /// Fewer features than this trigger the detail pass
    pub detail_min_features: usize,
    /// The detail pass only runs with more evidence than this
    pub detail_min_evidence_chars: usize,
}

impl Default for EnrichLimits {
    fn default() -> Self {
        Self {
            model_evidence_chars: 16_000,
            detail_description_chars: 150,
            detail_min_features: 3,
            detail_min_evidence_chars: 400,
        }
    }
}

/// Base URLs of every outbound service, overridable for tests
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub duckduckgo_html: String,
    pub duckduckgo_lite: String,
    pub wikipedia: String,
    pub readability_proxy: String,
    pub logo_api: String,
    pub image_search: String,
    pub openai: String,
    pub openrouter: String,
    pub groq: String,
    pub gemini: String,
    pub huggingface: String,
    pub pollinations: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            duckduckgo_html: "https://html.duckduckgo.com/html/".to_string(),
            duckduckgo_lite: "https://lite.duckduckgo.com/lite/".to_string(),
            wikipedia: "https://en.wikipedia.org".to_string(),
            readability_proxy: "https://r.jina.ai/".to_string(),
            logo_api: "https://logo.clearbit.com".to_string(),
            image_search: "https://www.bing.com/images/search".to_string(),
            openai: "https://api.openai.com/v1".to_string(),
            openrouter: "https://openrouter.ai/api/v1".to_string(),
            groq: "https://api.groq.com/openai/v1".to_string(),
            gemini: "https://generativelanguage.googleapis.com".to_string(),
            huggingface: "https://api-inference.huggingface.co/models".to_string(),
            pollinations: "https://image.pollinations.ai".to_string(),
        }
    }
}

/// Credentials and models of the text backends
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextProviderSettings {
    pub openai_key: Option<String>,
    pub text_model: String,
    pub openrouter_keys: Vec<String>,
    pub openrouter_model: String,
    pub groq_key: Option<String>,
    pub groq_model: String,
    pub gemini_key: Option<String>,
    pub gemini_model: String,
}

/// Credentials and models of the image backends
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageProviderSettings {
    pub openai_key: Option<String>,
    pub openai_model: String,
    pub hf_token: Option<String>,
    pub hf_model: String,
}

/// Storage identity and per-table destinations
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    pub base_url: String,
    pub service_key: String,
    pub products_bucket: String,
    pub products_folder: String,
    pub exclusive_bucket: String,
    pub exclusive_folder: String,
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_token: String,
    pub database_url: String,
    pub storage: StorageSettings,
    pub text: TextProviderSettings,
    pub images: ImageProviderSettings,
    pub text_order: Vec<String>,
    pub image_order: Vec<String>,
    pub text_retry: RetryPolicy,
    pub image_retry: RetryPolicy,
    pub evidence: EvidenceLimits,
    pub enrich: EnrichLimits,
    pub endpoints: Endpoints,
}

impl AppConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Only bot and storage identity are required; every provider setting
    /// is optional and a missing credential simply disables that provider.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let mut endpoints = Endpoints::default();
        if let Some(base) = get("OPENAI_BASE_URL") {
            endpoints.openai = base.trim_end_matches('/').to_string();
        }

        let base_delay_ms = parse_or(&get, "RETRY_BASE_DELAY_MS", 800u64)?;
        let text_retry = RetryPolicy {
            max_attempts: parse_or(&get, "TEXT_RETRIES", 2u32)?.max(1),
            base_delay_ms,
            ..RetryPolicy::default()
        };
        let image_retry = RetryPolicy {
            max_attempts: parse_or(&get, "IMAGE_RETRIES", 2u32)?.max(1),
            base_delay_ms,
            ..RetryPolicy::default()
        };

        let evidence = EvidenceLimits {
            max_pages: parse_or(&get, "EVIDENCE_MAX_PAGES", 12usize)?,
            official_max_distance: parse_or(&get, "OFFICIAL_HOST_MAX_DISTANCE", 3usize)?,
            ..EvidenceLimits::default()
        };

        Ok(Self {
            telegram_token: required("TELEGRAM_BOT_TOKEN")?,
            database_url: required("DATABASE_URL")?,
            storage: StorageSettings {
                base_url: required("STORAGE_URL")?.trim_end_matches('/').to_string(),
                service_key: required("STORAGE_SERVICE_KEY")?,
                products_bucket: get("PRODUCTS_BUCKET").unwrap_or_else(|| "product-images".into()),
                products_folder: get("PRODUCTS_FOLDER").unwrap_or_else(|| "products".into()),
                exclusive_bucket: get("EXCLUSIVE_BUCKET")
                    .unwrap_or_else(|| "product-images".into()),
                exclusive_folder: get("EXCLUSIVE_FOLDER").unwrap_or_else(|| "exclusive".into()),
            },
            text: TextProviderSettings {
                openai_key: get("OPENAI_API_KEY"),
                text_model: get("TEXT_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.into()),
                openrouter_keys: get("OPENROUTER_API_KEYS")
                    .map(|raw| split_list(&raw))
                    .unwrap_or_default(),
                openrouter_model: get("OPENROUTER_MODEL")
                    .unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.into()),
                groq_key: get("GROQ_API_KEY"),
                groq_model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.into()),
                gemini_key: get("GEMINI_API_KEY"),
                gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            },
            images: ImageProviderSettings {
                openai_key: get("OPENAI_API_KEY"),
                openai_model: get("OPENAI_IMAGE_MODEL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_IMAGE_MODEL.into()),
                hf_token: get("HF_API_TOKEN"),
                hf_model: get("HF_IMAGE_MODEL").unwrap_or_else(|| DEFAULT_HF_IMAGE_MODEL.into()),
            },
            text_order: get("AI_PROVIDER_ORDER")
                .map(|raw| parse_provider_order(&raw))
                .filter(|order| !order.is_empty())
                .unwrap_or_else(|| owned(DEFAULT_TEXT_PROVIDER_ORDER)),
            image_order: get("IMAGE_PROVIDER_ORDER")
                .map(|raw| parse_provider_order(&raw))
                .filter(|order| !order.is_empty())
                .unwrap_or_else(|| owned(DEFAULT_IMAGE_PROVIDER_ORDER)),
            text_retry,
            image_retry,
            evidence,
            enrich: EnrichLimits::default(),
            endpoints,
        })
    }
}

/// Split a comma-separated list into trimmed, non-empty items
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect()
}

/// Parse a provider order string such as `"groq, openai"`
pub fn parse_provider_order(raw: &str) -> Vec<String> {
    split_list(raw)
        .into_iter()
        .map(|name| name.to_lowercase())
        .collect()
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn parse_or<G, T>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("DATABASE_URL", "postgres://localhost/catalog"),
        ("STORAGE_URL", "https://store.example.com/"),
        ("STORAGE_SERVICE_KEY", "service"),
    ];

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_lookup(lookup_from(REQUIRED)).unwrap();
        assert_eq!(config.storage.base_url, "https://store.example.com");
        assert_eq!(config.text_order, vec!["openai", "openrouter", "groq", "gemini"]);
        assert_eq!(config.image_order, vec!["openai", "huggingface", "pollinations"]);
        assert!(config.text.openai_key.is_none());
        assert!(config.text.openrouter_keys.is_empty());
        assert_eq!(config.text_retry.max_attempts, 2);
        assert_eq!(config.evidence.official_max_distance, 3);
    }

    #[test]
    fn test_missing_required_key() {
        let err = AppConfig::from_lookup(lookup_from(&REQUIRED[1..])).unwrap_err();
        assert_eq!(err.to_string(), "TELEGRAM_BOT_TOKEN must be set");
    }

    #[test]
    fn test_overrides_and_pools() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("OPENROUTER_API_KEYS", "k1, k2,,k3"));
        pairs.push(("AI_PROVIDER_ORDER", "groq,openai"));
        pairs.push(("TEXT_RETRIES", "4"));
        pairs.push(("OPENAI_BASE_URL", "https://proxy.example.com/v1/"));
        let config = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.text.openrouter_keys, vec!["k1", "k2", "k3"]);
        assert_eq!(config.text_order, vec!["groq", "openai"]);
        assert_eq!(config.text_retry.max_attempts, 4);
        assert_eq!(config.endpoints.openai, "https://proxy.example.com/v1");
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("IMAGE_RETRIES", "many"));
        let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("IMAGE_RETRIES"));
    }

    #[test]
    fn test_retry_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay_ms: 100,
            max_delay_ms: 1000,
        };
        let first = policy.delay_for(0).as_millis();
        let third = policy.delay_for(2).as_millis();
        let capped = policy.delay_for(10).as_millis();
        assert!((100..125).contains(&first));
        assert!((400..500).contains(&third));
        assert!((1000..1250).contains(&capped));
    }

    #[test]
    fn test_zero_delay_policy() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 0,
            max_delay_ms: 0,
        };
        assert_eq!(policy.delay_for(3), Duration::ZERO);
    }

    #[test]
    fn test_parse_provider_order() {
        assert_eq!(parse_provider_order(" Gemini , GROQ"), vec!["gemini", "groq"]);
        assert!(parse_provider_order(" , ").is_empty());
    }
}
