//! Catalog dialogue module for handling conversation state with operators.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::config::parse_provider_order;
use crate::product::{DraftField, ProductDraft, ProductTable};

/// Represents the conversation state of one chat's add/edit flow
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub enum CatalogDialogueState {
    #[default]
    Start,
    WaitingForProductText {
        table: ProductTable,
    },
    Reviewing {
        table: ProductTable,
        draft: ProductDraft,
        editing_id: Option<i64>,
    },
    EditingField {
        table: ProductTable,
        draft: ProductDraft,
        field: DraftField,
        editing_id: Option<i64>,
    },
    WaitingForImage {
        table: ProductTable,
        draft: ProductDraft,
        editing_id: Option<i64>,
    },
}

/// Type alias for our catalog dialogue
pub type CatalogDialogue = Dialogue<CatalogDialogueState, InMemStorage<CatalogDialogueState>>;

/// Longest product description the operator may paste in one message
pub const MAX_PRODUCT_TEXT_CHARS: usize = 4000;

/// Argument of the `/providers` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvidersArg {
    Show,
    Reset,
    Set(Vec<String>),
}

/// Bot commands understood in every dialogue state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Add(ProductTable),
    Edit(ProductTable, i64),
    List,
    Delete(ProductTable, i64),
    Providers(ProvidersArg),
    Cancel,
}

/// Parse a slash command.
///
/// Returns `None` for text that is not a command, `Err("unknown_command")`
/// for unrecognized commands and `Err("missing_id")` when an id argument is
/// absent or not a positive integer.
pub fn parse_command(text: &str) -> Option<Result<Command, &'static str>> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    // "/add@catalog_bot" in group chats
    let command = head.split('@').next().unwrap_or(head).to_lowercase();

    let parsed = match command.as_str() {
        "start" => Ok(Command::Start),
        "help" => Ok(Command::Help),
        "add" => Ok(Command::Add(ProductTable::Products)),
        "addx" => Ok(Command::Add(ProductTable::ExclusiveProducts)),
        "edit" => parse_product_id(args).map(|id| Command::Edit(ProductTable::Products, id)),
        "editx" => {
            parse_product_id(args).map(|id| Command::Edit(ProductTable::ExclusiveProducts, id))
        }
        "list" => Ok(Command::List),
        "delete" => parse_product_id(args).map(|id| Command::Delete(ProductTable::Products, id)),
        "deletex" => {
            parse_product_id(args).map(|id| Command::Delete(ProductTable::ExclusiveProducts, id))
        }
        "providers" => Ok(Command::Providers(parse_providers_arg(args))),
        "cancel" => Ok(Command::Cancel),
        _ => Err("unknown_command"),
    };
    Some(parsed)
}

/// Parses a product id argument such as `"42"` or `"#42"`
pub fn parse_product_id(input: &str) -> Result<i64, &'static str> {
    input
        .trim()
        .trim_start_matches('#')
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or("missing_id")
}

fn parse_providers_arg(args: &str) -> ProvidersArg {
    if args.is_empty() {
        ProvidersArg::Show
    } else if args.eq_ignore_ascii_case("reset") {
        ProvidersArg::Reset
    } else {
        ProvidersArg::Set(parse_provider_order(&args.replace(char::is_whitespace, ",")))
    }
}

/// Validates the free-text product description
pub fn validate_product_text(text: &str) -> Result<String, &'static str> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err("empty");
    }

    if trimmed.chars().count() > MAX_PRODUCT_TEXT_CHARS {
        return Err("too_long");
    }

    Ok(trimmed.to_string())
}

fn looks_like_url(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    !line.contains(char::is_whitespace)
        && (lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www."))
}

/// Separate an optional website line from the product text.
///
/// The first line that is a bare URL becomes the website to fetch; every
/// other line stays in the text handed to enrichment.
pub fn split_product_input(text: &str) -> (String, Option<String>) {
    let mut website = None;
    let mut lines = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if website.is_none() && looks_like_url(trimmed) {
            website = Some(trimmed.to_string());
        } else {
            lines.push(line);
        }
    }
    (lines.join("\n").trim().to_string(), website)
}

/// A bare image URL sent while waiting for an image
pub fn parse_image_url(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();
    ((lower.starts_with("http://") || lower.starts_with("https://"))
        && !trimmed.contains(char::is_whitespace))
    .then(|| trimmed.to_string())
}
