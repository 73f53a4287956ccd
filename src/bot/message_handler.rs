//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tracing::{debug, error, info};

// Import localization
use crate::localization::{t_args_lang, t_lang};

// Import dialogue types
use crate::dialogue::{
    parse_command, parse_image_url, CatalogDialogue, CatalogDialogueState, Command, ProvidersArg,
};

// Import catalog types
use crate::db;
use crate::product::ProductTable;
use crate::storage::ImageSource;

// Import dialogue manager functions
use super::dialogue_manager::{
    handle_field_edit_input, handle_image_input, handle_product_text_input, start_edit,
};

// Import UI builder functions
use super::ui_builder::format_product_line;
use super::AppState;

/// Products shown per table by `/list`
const LIST_LIMIT: i64 = 10;

/// Download a Telegram file into memory
pub async fn download_file(bot: &Bot, file_id: FileId) -> Result<Vec<u8>> {
    let file = bot.get_file(file_id).await?;
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot.token(),
        file.path
    );

    let response = reqwest::get(&url).await?.error_for_status()?;
    let bytes = response.bytes().await?;
    Ok(bytes.to_vec())
}

/// What a message offers while the bot waits for an image
enum IncomingImage {
    Source(ImageSource),
    NotAnImage,
    Nothing,
}

async fn incoming_image(bot: &Bot, msg: &Message) -> Result<IncomingImage> {
    if let Some(largest_photo) = msg.photo().and_then(|photos| photos.last()) {
        debug!(user_id = %msg.chat.id, "Received photo for the draft");
        let data = download_file(bot, largest_photo.file.id.clone()).await?;
        return Ok(IncomingImage::Source(ImageSource::Bytes {
            data,
            content_type: Some("image/jpeg".to_string()),
        }));
    }

    if let Some(doc) = msg.document() {
        let mime_type = doc.mime_type.as_ref().map(|mime| mime.to_string());
        if !mime_type.as_deref().is_some_and(|mime| mime.starts_with("image/")) {
            debug!(user_id = %msg.chat.id, mime_type = ?mime_type, "Received non-image document");
            return Ok(IncomingImage::NotAnImage);
        }
        debug!(user_id = %msg.chat.id, mime_type = ?mime_type, "Received image document for the draft");
        let data = download_file(bot, doc.file.id.clone()).await?;
        return Ok(IncomingImage::Source(ImageSource::Bytes {
            data,
            content_type: mime_type,
        }));
    }

    Ok(msg
        .text()
        .and_then(parse_image_url)
        .map(|url| IncomingImage::Source(ImageSource::Url(url)))
        .unwrap_or(IncomingImage::Nothing))
}

async fn handle_command(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    dialogue: &CatalogDialogue,
    command: Result<Command, &'static str>,
    language_code: Option<&str>,
) -> Result<()> {
    let chat_id = msg.chat.id;
    let command = match command {
        Ok(command) => command,
        Err(reason) => {
            let key = if reason == "missing_id" {
                "command-missing-id"
            } else {
                "command-unknown"
            };
            bot.send_message(chat_id, t_lang(key, language_code)).await?;
            return Ok(());
        }
    };
    debug!(user_id = %chat_id, command = ?command, "Received command");

    match command {
        Command::Start => {
            let welcome_message = format!(
                "👋 {}\n\n{}\n\n{}",
                t_lang("welcome-title", language_code),
                t_lang("welcome-description", language_code),
                t_lang("help-text", language_code)
            );
            bot.send_message(chat_id, welcome_message).await?;
        }
        Command::Help => {
            bot.send_message(chat_id, t_lang("help-text", language_code))
                .await?;
        }
        Command::Add(table) => {
            dialogue
                .update(CatalogDialogueState::WaitingForProductText { table })
                .await?;
            bot.send_message(
                chat_id,
                t_args_lang("add-prompt", &[("table", table.table_name())], language_code),
            )
            .await?;
        }
        Command::Edit(table, id) => {
            start_edit(bot, chat_id, dialogue, state, table, id, language_code).await?;
        }
        Command::List => {
            let mut sections = Vec::new();
            for table in [ProductTable::Products, ProductTable::ExclusiveProducts] {
                let products = match db::list_recent_products(&state.pool, table, LIST_LIMIT).await {
                    Ok(products) => products,
                    Err(e) => {
                        error!(user_id = %chat_id, error = %e, "Failed to list products");
                        bot.send_message(chat_id, t_lang("database-error", language_code))
                            .await?;
                        return Ok(());
                    }
                };
                let args = [("table", table.table_name())];
                if products.is_empty() {
                    sections.push(t_args_lang("list-empty", &args, language_code));
                } else {
                    let lines: Vec<String> = products.iter().map(format_product_line).collect();
                    sections.push(format!(
                        "{}\n{}",
                        t_args_lang("list-title", &args, language_code),
                        lines.join("\n")
                    ));
                }
            }
            bot.send_message(chat_id, sections.join("\n\n")).await?;
        }
        Command::Delete(table, id) => {
            let id_text = id.to_string();
            let args = [("table", table.table_name()), ("id", id_text.as_str())];
            let reply = match db::delete_product(&state.pool, table, id).await {
                Ok(true) => t_args_lang("deleted", &args, language_code),
                Ok(false) => t_args_lang("product-not-found", &args, language_code),
                Err(e) => {
                    error!(user_id = %chat_id, error = %e, id, "Failed to delete product");
                    t_lang("database-error", language_code)
                }
            };
            bot.send_message(chat_id, reply).await?;
        }
        Command::Providers(arg) => {
            handle_providers_command(bot, chat_id, state, arg, language_code).await?;
        }
        Command::Cancel => {
            dialogue.exit().await?;
            bot.send_message(chat_id, t_lang("cancelled", language_code))
                .await?;
        }
    }
    Ok(())
}

async fn handle_providers_command(
    bot: &Bot,
    chat_id: ChatId,
    state: &AppState,
    arg: ProvidersArg,
    language_code: Option<&str>,
) -> Result<()> {
    let default_order = state.enricher.default_order().join(", ");
    let reply = match arg {
        ProvidersArg::Show => match state.sessions.get(chat_id).await {
            Some(order) => t_args_lang("providers-current", &[("order", &order.join(", "))], language_code),
            None => t_args_lang("providers-default", &[("order", &default_order)], language_code),
        },
        ProvidersArg::Reset => {
            state.sessions.reset(chat_id).await;
            t_args_lang("providers-reset", &[("order", &default_order)], language_code)
        }
        ProvidersArg::Set(names) => {
            let available = state.enricher.provider_names();
            let known: Vec<String> = names
                .into_iter()
                .filter(|name| available.contains(name))
                .collect();
            if known.is_empty() {
                t_args_lang("providers-unknown", &[("available", &available.join(", "))], language_code)
            } else {
                info!(user_id = %chat_id, order = ?known, "Provider order set");
                let order = known.join(", ");
                state.sessions.set(chat_id, known).await;
                t_args_lang("providers-set", &[("order", &order)], language_code)
            }
        }
    };
    bot.send_message(chat_id, reply).await?;
    Ok(())
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    dialogue: CatalogDialogue,
) -> Result<()> {
    // Extract user's language code from Telegram
    let language_code = msg
        .from
        .as_ref()
        .and_then(|user| user.language_code.as_ref())
        .map(|s| s.as_str());

    if let Some(command) = msg.text().and_then(parse_command) {
        return handle_command(&bot, &msg, &state, &dialogue, command, language_code).await;
    }

    match dialogue.get().await? {
        Some(CatalogDialogueState::WaitingForProductText { table }) => match msg.text() {
            Some(text) => {
                handle_product_text_input(&bot, &msg, &dialogue, &state, text, table, language_code)
                    .await?;
            }
            None => {
                bot.send_message(
                    msg.chat.id,
                    t_args_lang("add-prompt", &[("table", table.table_name())], language_code),
                )
                .await?;
            }
        },
        Some(CatalogDialogueState::EditingField {
            table,
            draft,
            field,
            editing_id,
        }) => match msg.text() {
            Some(text) => {
                handle_field_edit_input(
                    &bot,
                    &msg,
                    &dialogue,
                    text,
                    table,
                    draft,
                    field,
                    editing_id,
                    language_code,
                )
                .await?;
            }
            None => {
                bot.send_message(msg.chat.id, t_lang("edit-invalid-empty", language_code))
                    .await?;
            }
        },
        Some(CatalogDialogueState::WaitingForImage {
            table,
            draft,
            editing_id,
        }) => match incoming_image(&bot, &msg).await {
            Ok(IncomingImage::Source(source)) => {
                handle_image_input(
                    &bot,
                    msg.chat.id,
                    &dialogue,
                    &state,
                    source,
                    table,
                    draft,
                    editing_id,
                    language_code,
                )
                .await?;
            }
            Ok(IncomingImage::NotAnImage) => {
                bot.send_message(msg.chat.id, t_lang("image-not-image", language_code))
                    .await?;
            }
            Ok(IncomingImage::Nothing) => {
                bot.send_message(msg.chat.id, t_lang("image-upload-prompt", language_code))
                    .await?;
            }
            Err(e) => {
                error!(user_id = %msg.chat.id, error = %e, "Failed to download attachment");
                bot.send_message(msg.chat.id, t_lang("image-upload-failed", language_code))
                    .await?;
            }
        },
        Some(CatalogDialogueState::Reviewing { .. }) => {
            bot.send_message(msg.chat.id, t_lang("use-buttons", language_code))
                .await?;
        }
        Some(CatalogDialogueState::Start) | None => {
            let key = if msg.text().is_some() {
                "start-hint"
            } else {
                "unsupported-message"
            };
            bot.send_message(msg.chat.id, t_lang(key, language_code))
                .await?;
        }
    }

    Ok(())
}
