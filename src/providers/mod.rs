//! Provider adapters for text and image generation backends
//!
//! - `text`: chat-completion style backends returning a JSON object
//! - `image`: generative image backends returning raw bytes
//!
//! Every adapter converts its failures into [`ProviderError`] values at its
//! own boundary; the orchestrators decide what to do with them.

pub mod image;
pub mod text;

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::text_processing::truncate_chars;

pub use self::image::{build_image_providers, ImageProvider};
pub use self::text::{build_text_providers, TextProvider};

/// Round-robin pool of API keys for one backend.
///
/// Each call starts one key further along than the previous call and may
/// walk the whole pool, so a failing key is skipped rather than failing the
/// request. The cursor is a plain atomic counter: concurrent callers only
/// affect how load is spread across keys.
#[derive(Debug, Default)]
pub struct CredentialPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys: keys.into_iter().filter(|k| !k.trim().is_empty()).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn single(key: Option<String>) -> Self {
        Self::new(key.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Next key in round-robin order
    pub fn next(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        Some(&self.keys[idx])
    }

    /// Every key once, starting at the next round-robin position
    pub fn rotation(&self) -> Vec<&str> {
        if self.keys.is_empty() {
            return Vec::new();
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        (0..self.keys.len())
            .map(|offset| self.keys[(start + offset) % self.keys.len()].as_str())
            .collect()
    }
}

/// Turn a non-success response into a [`ProviderError`].
///
/// The body is truncated so that provider error pages do not flood logs.
pub(crate) async fn status_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ProviderError::Status {
        status,
        body: truncate_chars(&body, 300).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_round_robin() {
        let pool = CredentialPool::new(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(pool.next(), Some("a"));
        assert_eq!(pool.next(), Some("b"));
        assert_eq!(pool.next(), Some("c"));
        assert_eq!(pool.next(), Some("a"));
    }

    #[test]
    fn test_rotation_covers_every_key_once() {
        let pool = CredentialPool::new(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(pool.rotation(), vec!["a", "b", "c"]);
        assert_eq!(pool.rotation(), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_empty_pool() {
        let pool = CredentialPool::new(vec!["  ".into()]);
        assert!(pool.is_empty());
        assert_eq!(pool.next(), None);
        assert!(pool.rotation().is_empty());
        assert!(CredentialPool::single(None).is_empty());
        assert_eq!(CredentialPool::single(Some("k".into())).len(), 1);
    }
}
