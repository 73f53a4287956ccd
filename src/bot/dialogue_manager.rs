//! Dialogue Manager module for running the add/edit flow: enrichment,
//! field edits, images and saving.

use anyhow::Result;
use sqlx::PgPool;
use teloxide::prelude::*;
use tracing::{debug, error, info, warn};

// Import localization
use crate::localization::{t_args_lang, t_lang};

// Import dialogue types
use crate::dialogue::{split_product_input, validate_product_text, CatalogDialogue, CatalogDialogueState};

// Import catalog types
use crate::db;
use crate::product::{apply_field_edit, Category, DraftField, ProductDraft, ProductTable};
use crate::storage::ImageSource;

// Import UI builder functions
use super::ui_builder::{field_label, field_value, format_draft, review_keyboard};
use super::AppState;

/// Result of saving a reviewed draft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted(i64),
    Updated(i64),
    /// The product being edited was deleted in the meantime
    Missing(i64),
}

/// Insert a new product or overwrite the one being edited
pub async fn save_draft(
    pool: &PgPool,
    table: ProductTable,
    editing_id: Option<i64>,
    draft: &ProductDraft,
) -> Result<SaveOutcome> {
    match editing_id {
        Some(id) => {
            if db::update_product(pool, table, id, draft).await? {
                Ok(SaveOutcome::Updated(id))
            } else {
                Ok(SaveOutcome::Missing(id))
            }
        }
        None => db::insert_product(pool, table, draft)
            .await
            .map(SaveOutcome::Inserted),
    }
}

/// Send the review card and move the dialogue to `Reviewing`
pub async fn show_review(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &CatalogDialogue,
    table: ProductTable,
    draft: ProductDraft,
    editing_id: Option<i64>,
    language_code: Option<&str>,
) -> Result<()> {
    let card = format_draft(&draft, table, editing_id, language_code);
    bot.send_message(chat_id, card)
        .reply_markup(review_keyboard(language_code))
        .await?;

    dialogue
        .update(CatalogDialogueState::Reviewing {
            table,
            draft,
            editing_id,
        })
        .await?;
    Ok(())
}

/// Enrich the operator's product text and open the review card
pub async fn handle_product_text_input(
    bot: &Bot,
    msg: &Message,
    dialogue: &CatalogDialogue,
    state: &AppState,
    text: &str,
    table: ProductTable,
    language_code: Option<&str>,
) -> Result<()> {
    let (product_text, website) = split_product_input(text);
    let product_text = match validate_product_text(&product_text) {
        Ok(product_text) => product_text,
        Err(reason) => {
            let key = if reason == "too_long" {
                "product-text-too-long"
            } else {
                "product-text-empty"
            };
            bot.send_message(msg.chat.id, t_lang(key, language_code)).await?;
            return Ok(());
        }
    };

    bot.send_message(msg.chat.id, t_lang("enriching", language_code))
        .await?;

    let website_content = match website {
        Some(url) => {
            bot.send_message(
                msg.chat.id,
                t_args_lang("fetching-website", &[("url", &url)], language_code),
            )
            .await?;
            let page = state.fetcher.fetch_page(&url).await;
            debug!(user_id = %msg.chat.id, url = %url, chars = page.text.len(), "Fetched operator website");
            page.text
        }
        None => String::new(),
    };

    let order = state.sessions.get(msg.chat.id).await;
    let draft = state
        .enricher
        .enrich_with_ai(&product_text, &website_content, order.as_deref())
        .await;
    info!(user_id = %msg.chat.id, table = table.table_name(), name = %draft.name, "Draft ready for review");

    show_review(bot, msg.chat.id, dialogue, table, draft, None, language_code).await
}

/// Ask the operator for a new value of `field`
pub async fn send_edit_prompt(
    bot: &Bot,
    chat_id: ChatId,
    draft: &ProductDraft,
    field: DraftField,
    language_code: Option<&str>,
) -> Result<()> {
    let mut prompt = format!(
        "✏️ {}",
        t_args_lang(
            "edit-prompt",
            &[
                ("field", &field_label(field, language_code)),
                ("current", &field_value(draft, field, language_code)),
            ],
            language_code,
        )
    );

    match field {
        DraftField::Tags | DraftField::Features => {
            prompt.push_str("\n\n");
            prompt.push_str(&t_lang("edit-prompt-list", language_code));
        }
        DraftField::Category => {
            let categories: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
            prompt.push_str("\n\n");
            prompt.push_str(&t_args_lang(
                "edit-prompt-category",
                &[("categories", &categories.join(", "))],
                language_code,
            ));
        }
        _ => {}
    }

    bot.send_message(chat_id, prompt).await?;
    Ok(())
}

/// Apply the operator's reply to the field being edited
#[allow(clippy::too_many_arguments)]
pub async fn handle_field_edit_input(
    bot: &Bot,
    msg: &Message,
    dialogue: &CatalogDialogue,
    text: &str,
    table: ProductTable,
    mut draft: ProductDraft,
    field: DraftField,
    editing_id: Option<i64>,
    language_code: Option<&str>,
) -> Result<()> {
    match apply_field_edit(&mut draft, field, text) {
        Ok(()) => {
            debug!(user_id = %msg.chat.id, field = field.key(), "Field updated");
            show_review(bot, msg.chat.id, dialogue, table, draft, editing_id, language_code).await
        }
        Err(reason) => {
            let key = if reason == "invalid_price" {
                "edit-invalid-price"
            } else {
                "edit-invalid-empty"
            };
            bot.send_message(msg.chat.id, t_lang(key, language_code))
                .await?;
            Ok(())
        }
    }
}

/// Run the image pipeline for the draft under review
#[allow(clippy::too_many_arguments)]
pub async fn handle_generate_image(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &CatalogDialogue,
    state: &AppState,
    table: ProductTable,
    mut draft: ProductDraft,
    editing_id: Option<i64>,
    language_code: Option<&str>,
) -> Result<()> {
    bot.send_message(chat_id, t_lang("image-generating", language_code))
        .await?;

    match state.images.resolve_product_image(&draft, table).await {
        Ok(image) => {
            info!(user_id = %chat_id, tier = %image.tier, url = %image.url, "Image resolved");
            bot.send_message(
                chat_id,
                t_args_lang("image-resolved", &[("tier", &image.tier.to_string())], language_code),
            )
            .await?;
            draft.image = Some(image.url);
        }
        Err(e) => {
            error!(user_id = %chat_id, error = %e, "Image pipeline failed");
            bot.send_message(chat_id, t_lang("image-failed", language_code))
                .await?;
        }
    }

    show_review(bot, chat_id, dialogue, table, draft, editing_id, language_code).await
}

/// Rehost an operator-supplied image and attach it to the draft
#[allow(clippy::too_many_arguments)]
pub async fn handle_image_input(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &CatalogDialogue,
    state: &AppState,
    source: ImageSource,
    table: ProductTable,
    mut draft: ProductDraft,
    editing_id: Option<i64>,
    language_code: Option<&str>,
) -> Result<()> {
    bot.send_message(chat_id, t_lang("image-uploading", language_code))
        .await?;

    match state.storage.rehost(source, &draft.name, table).await {
        Ok(url) => {
            info!(user_id = %chat_id, url = %url, "Operator image rehosted");
            bot.send_message(chat_id, t_lang("image-uploaded", language_code))
                .await?;
            draft.image = Some(url);
            show_review(bot, chat_id, dialogue, table, draft, editing_id, language_code).await
        }
        Err(e) => {
            warn!(user_id = %chat_id, error = %e, "Operator image rejected");
            bot.send_message(chat_id, t_lang("image-upload-failed", language_code))
                .await?;
            Ok(())
        }
    }
}

/// Persist the reviewed draft and end the dialogue
#[allow(clippy::too_many_arguments)]
pub async fn handle_save(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &CatalogDialogue,
    state: &AppState,
    table: ProductTable,
    draft: &ProductDraft,
    editing_id: Option<i64>,
    language_code: Option<&str>,
) -> Result<()> {
    let table_name = table.table_name();
    let reply = match save_draft(&state.pool, table, editing_id, draft).await {
        Ok(SaveOutcome::Inserted(id)) => t_args_lang(
            "saved",
            &[("table", table_name), ("id", &id.to_string())],
            language_code,
        ),
        Ok(SaveOutcome::Updated(id)) => t_args_lang(
            "updated",
            &[("table", table_name), ("id", &id.to_string())],
            language_code,
        ),
        Ok(SaveOutcome::Missing(id)) => t_args_lang(
            "product-not-found",
            &[("table", table_name), ("id", &id.to_string())],
            language_code,
        ),
        Err(e) => {
            error!(user_id = %chat_id, error = %e, "Failed to save product");
            bot.send_message(chat_id, t_lang("save-failed", language_code))
                .await?;
            return Ok(());
        }
    };

    bot.send_message(chat_id, format!("✅ {reply}")).await?;
    dialogue.exit().await?;
    Ok(())
}

/// Load a stored product into a review card for editing
pub async fn start_edit(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &CatalogDialogue,
    state: &AppState,
    table: ProductTable,
    id: i64,
    language_code: Option<&str>,
) -> Result<()> {
    match db::get_product(&state.pool, table, id).await {
        Ok(Some(product)) => {
            show_review(bot, chat_id, dialogue, table, product.draft, Some(id), language_code).await
        }
        Ok(None) => {
            bot.send_message(
                chat_id,
                t_args_lang(
                    "product-not-found",
                    &[("table", table.table_name()), ("id", &id.to_string())],
                    language_code,
                ),
            )
            .await?;
            Ok(())
        }
        Err(e) => {
            error!(user_id = %chat_id, error = %e, id, "Failed to load product");
            bot.send_message(chat_id, t_lang("database-error", language_code))
                .await?;
            Ok(())
        }
    }
}
