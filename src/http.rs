//! Shared HTTP client construction.
//!
//! Every outbound call in the pipeline goes through a [`reqwest::Client`]
//! built here, so timeouts and redirect handling stay uniform.

use std::time::Duration;

/// Desktop browser User-Agent; search frontends and some product sites
/// refuse unknown agents.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Timeout for lightweight metadata requests (logo, meta tags)
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(8);
/// Timeout for page and search fetches
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(12);
/// Timeout for text-generation calls
pub const TEXT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(45);
/// Timeout for image-generation calls
pub const IMAGE_PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Build a client with the browser User-Agent, the given timeout and up to
/// ten followed redirects.
///
/// Falls back to a default client if the builder fails, which only happens
/// when the TLS backend cannot initialise.
pub fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .user_agent(BROWSER_USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to build HTTP client, using defaults");
            reqwest::Client::new()
        })
}

/// Prefix scheme-less URLs with `https://`
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches("//"))
    }
}
