//! # Localization Tests
//!
//! Message retrieval and formatting through the embedded Fluent bundles.

use catalog_bot::localization::{detect_language, t_args_lang, t_lang, LocalizationManager};

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        LocalizationManager::new().expect("Failed to create localization manager")
    }

    #[test]
    fn test_get_message_existing_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("help-text", "en", None);
        assert!(message.contains("/addx"));
        assert!(message.contains("/providers reset"));
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("nonexistent-key", "en", None);
        assert_eq!(message, "Missing translation: nonexistent-key");
    }

    #[test]
    fn test_unsupported_language_falls_back_to_english() {
        let manager = setup_localization();

        let english = manager.get_message_in_language("button-save", "en", None);
        let fallback = manager.get_message_in_language("button-save", "xx", None);
        assert_eq!(english, fallback);
    }

    #[test]
    fn test_arguments_are_substituted_without_isolation_marks() {
        let message = t_args_lang(
            "saved",
            &[("table", "exclusive_products"), ("id", "42")],
            Some("en-US"),
        );
        assert_eq!(message, "Saved to exclusive_products as #42.");
        assert!(!message.contains('\u{2068}'));
    }

    #[test]
    fn test_every_field_has_a_label() {
        for field in catalog_bot::product::DraftField::ALL {
            let label = t_lang(&format!("field-{}", field.key()), None);
            assert!(!label.starts_with("Missing translation"), "{label}");
        }
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(detect_language(Some("en")), "en");
        assert_eq!(detect_language(Some("EN_gb")), "en");
        assert_eq!(detect_language(Some("fr")), "en");
        assert_eq!(detect_language(None), "en");
    }
}
