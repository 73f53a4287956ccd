//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Handles commands, free text, photos and documents
//! - `callback_handler`: Handles review-card keyboard callbacks
//! - `ui_builder`: Creates keyboards and formats the review card
//! - `dialogue_manager`: Runs enrichment, field edits, image uploads and saves

pub mod callback_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use teloxide::types::ChatId;
use tokio::sync::Mutex;

use crate::enrich::Enricher;
use crate::evidence::PageFetcher;
use crate::imagery::ImageResolver;
use crate::storage::Rehoster;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

// Re-export utility functions that might be used elsewhere
pub use dialogue_manager::save_draft;
pub use ui_builder::{format_draft, review_keyboard};

/// Per-chat text provider order chosen with `/providers`
#[derive(Default)]
pub struct ProviderSessions {
    orders: Mutex<HashMap<ChatId, Vec<String>>>,
}

impl ProviderSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The chat's explicit order, if it set one
    pub async fn get(&self, chat_id: ChatId) -> Option<Vec<String>> {
        self.orders.lock().await.get(&chat_id).cloned()
    }

    pub async fn set(&self, chat_id: ChatId, order: Vec<String>) {
        self.orders.lock().await.insert(chat_id, order);
    }

    pub async fn reset(&self, chat_id: ChatId) {
        self.orders.lock().await.remove(&chat_id);
    }
}

/// Everything the handlers share
pub struct AppState {
    pub pool: PgPool,
    pub enricher: Enricher,
    pub images: ImageResolver,
    pub storage: Arc<dyn Rehoster>,
    pub fetcher: PageFetcher,
    pub sessions: ProviderSessions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_provider_sessions_are_per_chat() {
        let sessions = ProviderSessions::new();
        sessions.set(ChatId(1), vec!["groq".into()]).await;

        assert_eq!(sessions.get(ChatId(1)).await, Some(vec!["groq".to_string()]));
        assert_eq!(sessions.get(ChatId(2)).await, None);

        sessions.reset(ChatId(1)).await;
        assert_eq!(sessions.get(ChatId(1)).await, None);
    }
}
