//! # Product Data Model
//!
//! This module defines the operator-facing product record and the closed
//! category set it is catalogued under.
//!
//! ## Core Concepts
//!
//! - **ProductDraft**: the record under review in a chat session
//! - **Category**: one of exactly four catalog categories
//! - **ProductTable**: which of the two catalog tables a record belongs to
//! - **DraftField**: an individually editable field of a draft

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::text_processing::{alnum_lower, parse_price, uniq_merge, value_to_list};

/// Literal used for fields the pipeline could not determine
pub const UNKNOWN: &str = "unknown";
/// Maximum number of feature bullets kept on a draft
pub const MAX_FEATURES: usize = 6;

/// Closed set of catalog categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "OTT Accounts")]
    OttAccounts,
    #[serde(rename = "IPTV")]
    Iptv,
    #[serde(rename = "Product Key")]
    ProductKey,
    #[serde(rename = "Download")]
    Download,
}

lazy_static! {
    // Tried in order, first match wins
    static ref CATEGORY_RULES: Vec<(Category, Regex)> = vec![
        (
            Category::Iptv,
            Regex::new(r"(?i)\biptv\b|\bm3u8?\b|xtream|live\s*tv\s*channels?|set[\s-]?top\s*box|\bstb\b")
                .expect("valid IPTV pattern"),
        ),
        (
            Category::ProductKey,
            Regex::new(r"(?i)product\s*key|license|licence|activation|serial\s*(?:key|number)|\bkeys?\b|windows\s*(?:10|11)|office\s*(?:20\d\d|365)|antivirus")
                .expect("valid product key pattern"),
        ),
        (
            Category::OttAccounts,
            Regex::new(r"(?i)\bott\b|netflix|prime\s*video|hotstar|disney|hulu|hbo|\bmax\b|zee5|sony\s*liv|jiocinema|crunchyroll|spotify|youtube\s*premium|apple\s*(?:tv|music)|streaming")
                .expect("valid OTT pattern"),
        ),
    ];
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 4] = [
        Category::OttAccounts,
        Category::Iptv,
        Category::ProductKey,
        Category::Download,
    ];

    /// Catch-all category used when nothing else matches
    pub const DEFAULT: Category = Category::Download;

    /// Stored and displayed label
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::OttAccounts => "OTT Accounts",
            Category::Iptv => "IPTV",
            Category::ProductKey => "Product Key",
            Category::Download => "Download",
        }
    }

    /// Exact match against an allowed label, ignoring case and spacing
    pub fn from_label(label: &str) -> Option<Category> {
        let wanted = alnum_lower(label);
        if wanted.is_empty() {
            return None;
        }
        Category::ALL
            .into_iter()
            .find(|category| alnum_lower(category.as_str()) == wanted)
    }

    /// Infer a category from a candidate label and surrounding text.
    ///
    /// An exact allowed label wins immediately; otherwise the keyword rules
    /// are tried against `candidate + context`; otherwise `Download`.
    pub fn infer(candidate: Option<&str>, context: &str) -> Category {
        if let Some(category) = candidate.and_then(Category::from_label) {
            return category;
        }
        let haystack = format!("{} {}", candidate.unwrap_or(""), context);
        CATEGORY_RULES
            .iter()
            .find(|(_, rule)| rule.is_match(&haystack))
            .map(|(category, _)| *category)
            .unwrap_or(Category::DEFAULT)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two logical catalog destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductTable {
    Products,
    ExclusiveProducts,
}

impl ProductTable {
    /// Database table name
    pub fn table_name(&self) -> &'static str {
        match self {
            ProductTable::Products => "products",
            ProductTable::ExclusiveProducts => "exclusive_products",
        }
    }
}

/// Operator-facing product record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub plan: String,
    pub validity: String,
    pub price: Option<i64>,
    pub description: String,
    pub tags: Vec<String>,
    pub features: Vec<String>,
    pub category: Category,
    pub subcategory: String,
    pub image: Option<String>,
}

impl ProductDraft {
    /// Draft with every optional field set to its "unknown" value
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plan: UNKNOWN.to_string(),
            validity: UNKNOWN.to_string(),
            price: None,
            description: String::new(),
            tags: Vec::new(),
            features: Vec::new(),
            category: Category::DEFAULT,
            subcategory: UNKNOWN.to_string(),
            image: None,
        }
    }

    /// Text the keyword category rules are matched against
    pub fn category_context(&self) -> String {
        format!(
            "{} {} {} {}",
            self.name,
            self.description,
            self.subcategory,
            self.tags.join(" ")
        )
    }

    /// Whether a plan is known
    pub fn has_plan(&self) -> bool {
        is_known(&self.plan)
    }

    /// Whether a validity is known
    pub fn has_validity(&self) -> bool {
        is_known(&self.validity)
    }
}

/// `false` for empty strings and the literal "unknown"
pub fn is_known(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(UNKNOWN)
}

/// Editable fields of a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftField {
    Name,
    Plan,
    Validity,
    Price,
    Description,
    Tags,
    Features,
    Category,
    Subcategory,
}

impl DraftField {
    pub const ALL: [DraftField; 9] = [
        DraftField::Name,
        DraftField::Plan,
        DraftField::Validity,
        DraftField::Price,
        DraftField::Description,
        DraftField::Tags,
        DraftField::Features,
        DraftField::Category,
        DraftField::Subcategory,
    ];

    /// Key used in callback data and localization ids
    pub fn key(&self) -> &'static str {
        match self {
            DraftField::Name => "name",
            DraftField::Plan => "plan",
            DraftField::Validity => "validity",
            DraftField::Price => "price",
            DraftField::Description => "description",
            DraftField::Tags => "tags",
            DraftField::Features => "features",
            DraftField::Category => "category",
            DraftField::Subcategory => "subcategory",
        }
    }

    pub fn from_key(key: &str) -> Option<DraftField> {
        DraftField::ALL.into_iter().find(|field| field.key() == key)
    }
}

/// Apply an operator edit to a single draft field.
///
/// Returns `Err("empty")` for blank input on the name and `Err("invalid_price")`
/// when a price edit contains no number. Everything else is accepted and
/// normalized the same way model output is.
pub fn apply_field_edit(
    draft: &mut ProductDraft,
    field: DraftField,
    input: &str,
) -> Result<(), &'static str> {
    let value = input.trim();
    match field {
        DraftField::Name => {
            if value.is_empty() {
                return Err("empty");
            }
            draft.name = value.to_string();
        }
        DraftField::Plan => draft.plan = or_unknown(value),
        DraftField::Validity => draft.validity = or_unknown(value),
        DraftField::Price => {
            if value == "-" || value.eq_ignore_ascii_case(UNKNOWN) {
                draft.price = None;
            } else {
                draft.price = Some(parse_price(value).ok_or("invalid_price")?);
            }
        }
        DraftField::Description => draft.description = value.to_string(),
        DraftField::Tags => {
            let tags = value_to_list(&serde_json::Value::String(value.to_string()));
            draft.tags = uniq_merge(&tags, &[]);
        }
        DraftField::Features => {
            let features = value_to_list(&serde_json::Value::String(value.to_string()));
            draft.features = features.into_iter().take(MAX_FEATURES).collect();
        }
        DraftField::Category => {
            draft.category = Category::infer(Some(value), "");
        }
        DraftField::Subcategory => draft.subcategory = or_unknown(value),
    }
    Ok(())
}

fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serde_labels() {
        let json = serde_json::to_string(&Category::OttAccounts).unwrap();
        assert_eq!(json, "\"OTT Accounts\"");
        let parsed: Category = serde_json::from_str("\"Product Key\"").unwrap();
        assert_eq!(parsed, Category::ProductKey);
    }

    #[test]
    fn test_exact_label_wins() {
        assert_eq!(
            Category::infer(Some("iptv"), "netflix streaming"),
            Category::Iptv
        );
        assert_eq!(
            Category::infer(Some(" ott  accounts "), ""),
            Category::OttAccounts
        );
    }

    #[test]
    fn test_keyword_rules() {
        assert_eq!(
            Category::infer(Some("Streaming"), "Netflix Premium 4K"),
            Category::OttAccounts
        );
        assert_eq!(
            Category::infer(None, "Windows 11 Pro retail key"),
            Category::ProductKey
        );
        assert_eq!(
            Category::infer(None, "IPTV 12 months 10000 live tv channels"),
            Category::Iptv
        );
        assert_eq!(Category::infer(Some("ebook"), "PDF guide"), Category::Download);
        assert_eq!(Category::infer(None, ""), Category::Download);
    }

    #[test]
    fn test_iptv_rule_precedes_streaming() {
        assert_eq!(
            Category::infer(None, "IPTV streaming subscription"),
            Category::Iptv
        );
    }

    #[test]
    fn test_new_draft_defaults() {
        let draft = ProductDraft::new("Canva Pro");
        assert_eq!(draft.plan, UNKNOWN);
        assert_eq!(draft.category, Category::Download);
        assert!(!draft.has_plan());
        assert!(draft.image.is_none());
    }

    #[test]
    fn test_apply_field_edits() {
        let mut draft = ProductDraft::new("Spotify");
        apply_field_edit(&mut draft, DraftField::Price, "₹ 119 / month").unwrap();
        assert_eq!(draft.price, Some(119));
        apply_field_edit(&mut draft, DraftField::Tags, "music, Music, premium").unwrap();
        assert_eq!(draft.tags, vec!["music", "premium"]);
        apply_field_edit(&mut draft, DraftField::Category, "ott").unwrap();
        assert_eq!(draft.category, Category::OttAccounts);
        apply_field_edit(&mut draft, DraftField::Plan, "").unwrap();
        assert_eq!(draft.plan, UNKNOWN);
        assert_eq!(
            apply_field_edit(&mut draft, DraftField::Price, "soon"),
            Err("invalid_price")
        );
        assert_eq!(apply_field_edit(&mut draft, DraftField::Name, "  "), Err("empty"));
    }

    #[test]
    fn test_field_keys_round_trip() {
        for field in DraftField::ALL {
            assert_eq!(DraftField::from_key(field.key()), Some(field));
        }
        assert_eq!(DraftField::from_key("image"), None);
    }

    #[test]
    fn test_table_names() {
        assert_eq!(ProductTable::Products.table_name(), "products");
        assert_eq!(
            ProductTable::ExclusiveProducts.table_name(),
            "exclusive_products"
        );
    }
}
