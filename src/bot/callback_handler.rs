//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, info};

// Import localization
use crate::localization::t_lang;

// Import dialogue types
use crate::dialogue::{CatalogDialogue, CatalogDialogueState};

// Import dialogue manager functions
use super::dialogue_manager::{handle_generate_image, handle_save, send_edit_prompt};

// Import UI builder functions
use super::ui_builder::{parse_callback_data, ReviewAction};
use super::AppState;

/// Handle callback queries from the review card
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
    dialogue: CatalogDialogue,
) -> Result<()> {
    debug!(user_id = %q.from.id, data = ?q.data, "Received callback query from user");

    // Stop the client-side spinner before long-running work
    bot.answer_callback_query(q.id.clone()).await?;

    let language_code = q.from.language_code.as_deref();
    let Some(chat_id) = q.message.as_ref().map(|msg| msg.chat().id) else {
        return Ok(());
    };
    let Some(action) = q.data.as_deref().and_then(parse_callback_data) else {
        return Ok(());
    };

    let Some(CatalogDialogueState::Reviewing {
        table,
        draft,
        editing_id,
    }) = dialogue.get().await?
    else {
        bot.send_message(chat_id, t_lang("session-expired", language_code))
            .await?;
        return Ok(());
    };

    match action {
        ReviewAction::Edit(field) => {
            send_edit_prompt(&bot, chat_id, &draft, field, language_code).await?;
            dialogue
                .update(CatalogDialogueState::EditingField {
                    table,
                    draft,
                    field,
                    editing_id,
                })
                .await?;
        }
        ReviewAction::GenerateImage => {
            handle_generate_image(
                &bot,
                chat_id,
                &dialogue,
                &state,
                table,
                draft,
                editing_id,
                language_code,
            )
            .await?;
        }
        ReviewAction::UploadImage => {
            bot.send_message(chat_id, t_lang("image-upload-prompt", language_code))
                .await?;
            dialogue
                .update(CatalogDialogueState::WaitingForImage {
                    table,
                    draft,
                    editing_id,
                })
                .await?;
        }
        ReviewAction::Save => {
            handle_save(
                &bot,
                chat_id,
                &dialogue,
                &state,
                table,
                &draft,
                editing_id,
                language_code,
            )
            .await?;
        }
        ReviewAction::Cancel => {
            info!(user_id = %chat_id, "Review cancelled");
            dialogue.exit().await?;
            bot.send_message(chat_id, t_lang("cancelled", language_code))
                .await?;
        }
    }

    Ok(())
}
