//! Localization module for operator-facing bot messages.
//!
//! Messages live in Fluent files under `locales/<lang>/main.ftl`. They are
//! embedded at compile time so the bot runs from any working directory.

use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::warn;
use unic_langid::LanguageIdentifier;

/// Language used when the operator's client language is not supported
pub const DEFAULT_LANGUAGE: &str = "en";

const LOCALES: &[(&str, &str)] = &[("en", include_str!("../locales/en/main.ftl"))];

/// Localization manager for the catalog bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a manager with every embedded locale loaded
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();
        for (language, source) in LOCALES {
            let locale: LanguageIdentifier = language.parse()?;
            bundles.insert(language.to_string(), Self::create_bundle(locale, source)?);
        }
        Ok(Self { bundles })
    }

    fn create_bundle(
        locale: LanguageIdentifier,
        source: &str,
    ) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Telegram renders the bidi isolation marks literally
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Invalid Fluent file for {locale}: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Duplicate Fluent messages for {locale}: {errors:?}"))?;
        Ok(bundle)
    }

    /// Get a message in `language`, falling back to English
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&[(&str, &str)]>,
    ) -> String {
        let Some(bundle) = self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
        else {
            return format!("Missing translation: {key}");
        };

        let Some(pattern) = bundle.get_message(key).and_then(|msg| msg.value()) else {
            return format!("Missing translation: {key}");
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, value.to_string());
            }
            fluent_args
        });

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            warn!(key, ?errors, "Message formatted with errors");
        }
        value.into_owned()
    }
}

/// Map a Telegram client language code ("en-US") to a supported language
pub fn detect_language(language_code: Option<&str>) -> &'static str {
    language_code
        .and_then(|code| code.split(['-', '_']).next())
        .and_then(|primary| {
            LOCALES
                .iter()
                .map(|(language, _)| *language)
                .find(|language| language.eq_ignore_ascii_case(primary))
        })
        .unwrap_or(DEFAULT_LANGUAGE)
}

static LOCALIZATION_MANAGER: LazyLock<Option<LocalizationManager>> =
    LazyLock::new(|| match LocalizationManager::new() {
        Ok(manager) => Some(manager),
        Err(e) => {
            warn!(error = %e, "Failed to load localization resources");
            None
        }
    });

/// Localized message for the operator's language
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    t_args_lang(key, &[], language_code)
}

/// Localized message with named arguments
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    match LOCALIZATION_MANAGER.as_ref() {
        Some(manager) => {
            let args = (!args.is_empty()).then_some(args);
            manager.get_message_in_language(key, detect_language(language_code), args)
        }
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_locales_parse() {
        let manager = LocalizationManager::new().unwrap();
        assert!(manager.bundles.contains_key("en"));
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language(Some("en-GB")), "en");
        assert_eq!(detect_language(Some("hi")), "en");
        assert_eq!(detect_language(None), "en");
    }
}
