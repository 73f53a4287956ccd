//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

// Import localization
use crate::localization::{t_args_lang, t_lang};

// Import catalog types
use crate::db::StoredProduct;
use crate::product::{is_known, DraftField, ProductDraft, ProductTable};
use crate::text_processing::truncate_chars;

/// Description budget on the review card; Telegram caps messages at 4096 chars
const REVIEW_DESCRIPTION_CHARS: usize = 1500;

const EDIT_BUTTONS_PER_ROW: usize = 3;

/// What a review-card button asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Edit(DraftField),
    GenerateImage,
    UploadImage,
    Save,
    Cancel,
}

/// Decode the callback data of a review-card button
pub fn parse_callback_data(data: &str) -> Option<ReviewAction> {
    match data {
        "gen_image" => Some(ReviewAction::GenerateImage),
        "upload_image" => Some(ReviewAction::UploadImage),
        "save" => Some(ReviewAction::Save),
        "cancel" => Some(ReviewAction::Cancel),
        _ => data
            .strip_prefix("edit_")
            .and_then(DraftField::from_key)
            .map(ReviewAction::Edit),
    }
}

/// Localized label of a draft field
pub fn field_label(field: DraftField, language_code: Option<&str>) -> String {
    t_lang(&format!("field-{}", field.key()), language_code)
}

fn or_unknown(value: &str, language_code: Option<&str>) -> String {
    if is_known(value) {
        value.to_string()
    } else {
        t_lang("value-unknown", language_code)
    }
}

/// Current value of a field as shown to the operator
pub fn field_value(draft: &ProductDraft, field: DraftField, language_code: Option<&str>) -> String {
    match field {
        DraftField::Name => draft.name.clone(),
        DraftField::Plan => or_unknown(&draft.plan, language_code),
        DraftField::Validity => or_unknown(&draft.validity, language_code),
        DraftField::Price => match draft.price {
            Some(price) => format!("Rs {price}"),
            None => t_lang("value-unknown", language_code),
        },
        DraftField::Description => or_unknown(&draft.description, language_code),
        DraftField::Tags if draft.tags.is_empty() => t_lang("value-none", language_code),
        DraftField::Tags => draft.tags.join(", "),
        DraftField::Features if draft.features.is_empty() => t_lang("value-none", language_code),
        DraftField::Features => draft.features.join("; "),
        DraftField::Category => draft.category.to_string(),
        DraftField::Subcategory => or_unknown(&draft.subcategory, language_code),
    }
}

/// Format a draft as the plain-text review card
pub fn format_draft(
    draft: &ProductDraft,
    table: ProductTable,
    editing_id: Option<i64>,
    language_code: Option<&str>,
) -> String {
    let table_name = table.table_name();
    let header = match editing_id {
        Some(id) => t_args_lang(
            "review-editing",
            &[("id", &id.to_string()), ("table", table_name)],
            language_code,
        ),
        None => t_args_lang("review-title", &[("table", table_name)], language_code),
    };

    let mut result = format!("📝 {header}\n\n");
    for field in [
        DraftField::Name,
        DraftField::Plan,
        DraftField::Validity,
        DraftField::Price,
        DraftField::Category,
        DraftField::Subcategory,
        DraftField::Tags,
    ] {
        result.push_str(&format!(
            "{}: {}\n",
            field_label(field, language_code),
            field_value(draft, field, language_code)
        ));
    }

    result.push_str(&format!("{}:\n", field_label(DraftField::Features, language_code)));
    if draft.features.is_empty() {
        result.push_str(&format!("  {}\n", t_lang("value-none", language_code)));
    }
    for feature in &draft.features {
        result.push_str(&format!("  • {feature}\n"));
    }

    let description = field_value(draft, DraftField::Description, language_code);
    result.push_str(&format!(
        "\n{}:\n{}\n",
        field_label(DraftField::Description, language_code),
        truncate_chars(&description, REVIEW_DESCRIPTION_CHARS)
    ));

    let image = draft
        .image
        .clone()
        .unwrap_or_else(|| t_lang("value-none", language_code));
    result.push_str(&format!("\n{}: {}", t_lang("field-image", language_code), image));

    result
}

/// One line of the `/list` output
pub fn format_product_line(product: &StoredProduct) -> String {
    let draft = &product.draft;
    let mut line = format!("#{} {}", product.id, draft.name);
    if draft.has_plan() {
        line.push_str(&format!(" - {}", draft.plan));
    }
    if let Some(price) = draft.price {
        line.push_str(&format!(" - Rs {price}"));
    }
    line.push_str(&format!(" [{}]", draft.category));
    line
}

/// Create the inline keyboard under the review card
pub fn review_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = DraftField::ALL
        .chunks(EDIT_BUTTONS_PER_ROW)
        .map(|row| {
            row.iter()
                .map(|field| {
                    InlineKeyboardButton::callback(
                        format!("✏️ {}", field_label(*field, language_code)),
                        format!("edit_{}", field.key()),
                    )
                })
                .collect()
        })
        .collect();

    buttons.push(vec![
        InlineKeyboardButton::callback(
            format!("🖼️ {}", t_lang("button-generate-image", language_code)),
            "gen_image".to_string(),
        ),
        InlineKeyboardButton::callback(
            format!("📤 {}", t_lang("button-upload-image", language_code)),
            "upload_image".to_string(),
        ),
    ]);

    buttons.push(vec![
        InlineKeyboardButton::callback(
            format!("✅ {}", t_lang("button-save", language_code)),
            "save".to_string(),
        ),
        InlineKeyboardButton::callback(
            format!("❌ {}", t_lang("button-cancel", language_code)),
            "cancel".to_string(),
        ),
    ]);

    InlineKeyboardMarkup::new(buttons)
}
