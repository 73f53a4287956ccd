//! # Ordered Fallback Module
//!
//! Runs a list of interchangeable providers strictly in order, giving each
//! its own retry budget with exponential backoff, and stops at the first
//! success. Used by both the text and the image orchestrators.

use std::collections::HashSet;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::config::RetryPolicy;
use crate::errors::ProviderError;

/// Record of one provider call, kept for logging and fallback decisions
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderAttempt {
    pub provider_name: String,
    /// Zero-based attempt number against this provider
    pub attempt: u32,
    pub succeeded: bool,
    pub error: Option<String>,
}

/// Result of running the fallback chain
#[derive(Debug)]
pub struct FallbackOutcome<T> {
    /// Payload of the first successful call
    pub value: Option<T>,
    /// Name of the provider that produced `value`
    pub provider: Option<String>,
    /// Every call made, in order
    pub attempts: Vec<ProviderAttempt>,
}

impl<T> FallbackOutcome<T> {
    pub fn succeeded(&self) -> bool {
        self.value.is_some()
    }
}

/// Pick providers from `registry` by name, in the order given.
///
/// Matching is case-insensitive, repeated names are ignored and unknown
/// names are logged and skipped.
pub fn select_by_name<P, N>(registry: &[P], names: &[String], name_of: N) -> Vec<P>
where
    P: Clone,
    N: Fn(&P) -> &str,
{
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.to_lowercase()))
        .filter_map(|name| {
            let found = registry
                .iter()
                .find(|p| name_of(p).eq_ignore_ascii_case(name))
                .cloned();
            if found.is_none() {
                warn!(provider = %name, "Unknown provider in order");
            }
            found
        })
        .collect()
}

/// Call `providers` in order until one succeeds.
///
/// Each provider is attempted up to `policy.max_attempts` times, sleeping
/// `policy.delay_for(attempt)` between failed attempts. Errors that are not
/// retryable (missing credentials, moderation rejections) end that
/// provider's budget early. A provider is never called before the previous
/// one has exhausted its budget.
pub async fn try_in_order<P, T, N, F, Fut>(
    providers: &[P],
    policy: &RetryPolicy,
    name_of: N,
    mut call: F,
) -> FallbackOutcome<T>
where
    N: Fn(&P) -> String,
    F: FnMut(&P) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempts = Vec::new();
    let max_attempts = policy.max_attempts.max(1);

    for provider in providers {
        let name = name_of(provider);
        for attempt in 0..max_attempts {
            debug!(provider = %name, attempt, "Calling provider");
            match call(provider).await {
                Ok(value) => {
                    info!(provider = %name, attempt, "Provider succeeded");
                    attempts.push(ProviderAttempt {
                        provider_name: name.clone(),
                        attempt,
                        succeeded: true,
                        error: None,
                    });
                    return FallbackOutcome {
                        value: Some(value),
                        provider: Some(name),
                        attempts,
                    };
                }
                Err(e) => {
                    warn!(provider = %name, attempt, error = %e, "Provider attempt failed");
                    let retryable = e.is_retryable();
                    attempts.push(ProviderAttempt {
                        provider_name: name.clone(),
                        attempt,
                        succeeded: false,
                        error: Some(e.to_string()),
                    });
                    if !retryable {
                        break;
                    }
                    if attempt + 1 < max_attempts {
                        tokio::time::sleep(policy.delay_for(attempt)).await;
                    }
                }
            }
        }
    }

    warn!(
        providers = providers.len(),
        calls = attempts.len(),
        "Every provider failed"
    );
    FallbackOutcome {
        value: None,
        provider: None,
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let calls = RefCell::new(Vec::new());
        let providers = vec!["a", "b"];
        let outcome = try_in_order(&providers, &instant_policy(3), |p| p.to_string(), |p| {
            calls.borrow_mut().push(p.to_string());
            let name = p.to_string();
            async move { Ok::<_, ProviderError>(name) }
        })
        .await;

        assert_eq!(outcome.value.as_deref(), Some("a"));
        assert_eq!(outcome.provider.as_deref(), Some("a"));
        assert_eq!(*calls.borrow(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_exhausts_budget_before_moving_on() {
        let calls = RefCell::new(Vec::new());
        let providers = vec!["a", "b", "c"];
        let outcome = try_in_order(&providers, &instant_policy(2), |p| p.to_string(), |p| {
            calls.borrow_mut().push(p.to_string());
            let ok = *p == "c";
            async move {
                if ok {
                    Ok(42)
                } else {
                    Err(ProviderError::Timeout)
                }
            }
        })
        .await;

        assert_eq!(outcome.value, Some(42));
        assert_eq!(*calls.borrow(), vec!["a", "a", "b", "b", "c"]);
        assert_eq!(outcome.attempts.len(), 5);
        assert!(outcome.attempts[4].succeeded);
    }

    #[tokio::test]
    async fn test_non_retryable_skips_remaining_budget() {
        let calls = RefCell::new(Vec::new());
        let providers = vec!["disabled", "live"];
        let outcome = try_in_order(&providers, &instant_policy(3), |p| p.to_string(), |p| {
            calls.borrow_mut().push(p.to_string());
            let disabled = *p == "disabled";
            async move {
                if disabled {
                    Err(ProviderError::MissingCredentials("disabled".into()))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(outcome.succeeded());
        assert_eq!(*calls.borrow(), vec!["disabled", "live"]);
    }

    #[tokio::test]
    async fn test_all_fail() {
        let providers: Vec<&str> = vec!["a"];
        let outcome: FallbackOutcome<()> =
            try_in_order(&providers, &instant_policy(2), |p| p.to_string(), |_| async {
                Err(ProviderError::EmptyResponse)
            })
            .await;
        assert!(!outcome.succeeded());
        assert_eq!(outcome.attempts.len(), 2);
        assert!(outcome.attempts.iter().all(|a| !a.succeeded));
    }

    #[test]
    fn test_select_by_name() {
        let registry = vec!["openai", "groq", "gemini"];
        let names: Vec<String> = ["Gemini", "missing", "openai", "gemini"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let selected = select_by_name(&registry, &names, |p| *p);
        assert_eq!(selected, vec!["gemini", "openai"]);
    }

    #[tokio::test]
    async fn test_empty_provider_list() {
        let providers: Vec<&str> = Vec::new();
        let outcome: FallbackOutcome<()> =
            try_in_order(&providers, &instant_policy(2), |p| p.to_string(), |_| async {
                Ok(())
            })
            .await;
        assert!(!outcome.succeeded());
        assert!(outcome.attempts.is_empty());
    }
}
