//! # Text Processing Module
//!
//! This module provides the text utilities shared by the evidence and
//! enrichment pipelines: sanitizing operator input, extracting prices,
//! merging tag lists, stripping HTML, measuring edit distance and digging
//! JSON objects out of free-form model output.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, trace};

lazy_static! {
    static ref MARKDOWN_EMPHASIS: Regex = Regex::new(r"[*_~`]+").expect("valid emphasis pattern");
    static ref INLINE_WHITESPACE: Regex = Regex::new(r"[ \t\u{a0}]+").expect("valid whitespace pattern");
    static ref ANY_WHITESPACE: Regex = Regex::new(r"\s+").expect("valid whitespace pattern");
    static ref PLAN_PATTERN: Regex =
        Regex::new(r"(?i)plan[:\-]?\s*([^\n,;]+)").expect("valid plan pattern");
    static ref PRICE_TOKEN: Regex =
        Regex::new(r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?").expect("valid price pattern");
    static ref CODE_FENCE: Regex =
        Regex::new(r"(?s)```[a-zA-Z0-9_-]*\s*(.*?)\s*```").expect("valid fence pattern");
    static ref SCRIPT_OR_STYLE: Regex =
        Regex::new(r"(?is)<(script|style|noscript)\b.*?</(script|style|noscript)\s*>")
            .expect("valid script pattern");
    static ref HTML_COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern");
    static ref HTML_TAG: Regex = Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern");
    static ref LIST_SEPARATORS: Regex =
        Regex::new(r"[,;|\n]|\s•\s").expect("valid separator pattern");
}

/// Maximum length of the guessed product name
pub const MAX_GUESSED_NAME_CHARS: usize = 120;
/// Maximum length of the guessed plan
pub const MAX_GUESSED_PLAN_CHARS: usize = 80;

/// Strip markdown emphasis characters and collapse whitespace.
///
/// Line structure is kept: runs of spaces inside a line collapse to one
/// space, lines are trimmed and blank lines dropped.
pub fn sanitize_text(text: &str) -> String {
    let without_emphasis = MARKDOWN_EMPHASIS.replace_all(text, "");
    without_emphasis
        .lines()
        .map(|line| INLINE_WHITESPACE.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse every whitespace run, newlines included, to a single space
pub fn collapse_whitespace(text: &str) -> String {
    ANY_WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Truncate to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// First non-empty line of the input, capped at 120 characters
pub fn guess_name(text: &str) -> String {
    let first = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    truncate_chars(first, MAX_GUESSED_NAME_CHARS).trim().to_string()
}

/// Plan mentioned as `plan: ...` in the input, capped at 80 characters
pub fn guess_plan(text: &str) -> String {
    PLAN_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| truncate_chars(m.as_str().trim(), MAX_GUESSED_PLAN_CHARS).trim().to_string())
        .unwrap_or_default()
}

/// Extract an integer price from noisy text.
///
/// Takes the first run of digits (with optional thousands separators and
/// decimal part) and rounds it to the nearest integer.
///
/// # Examples
///
/// ```rust
/// use catalog_bot::text_processing::parse_price;
///
/// assert_eq!(parse_price("₹1,299.50 for 1 year"), Some(1300));
/// assert_eq!(parse_price("free"), None);
/// ```
pub fn parse_price(text: &str) -> Option<i64> {
    let token = PRICE_TOKEN.find(text)?;
    let cleaned = token.as_str().replace(',', "");
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    trace!(input = text, token = token.as_str(), rounded, "Parsed price token");
    if rounded > i64::MAX as f64 {
        return None;
    }
    Some(rounded as i64)
}

/// Price from a JSON value that may be a number, a string or anything else
pub fn price_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite() && *v >= 0.0 && *v <= i64::MAX as f64)
            .map(|v| v.round() as i64),
        Value::String(s) => parse_price(s),
        _ => None,
    }
}

/// Merge two tag lists keeping first-seen order.
///
/// Entries are trimmed, empty entries dropped and duplicates detected
/// case-insensitively.
///
/// # Examples
///
/// ```rust
/// use catalog_bot::text_processing::uniq_merge;
///
/// let merged = uniq_merge(
///     &["Spotify".into(), " spotify".into(), "Music".into()],
///     &["music".into(), "Plan".into()],
/// );
/// assert_eq!(merged, vec!["Spotify", "Music", "Plan"]);
/// ```
pub fn uniq_merge(first: &[String], second: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for item in first.iter().chain(second.iter()) {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            merged.push(trimmed.to_string());
        }
    }
    merged
}

/// Force a model field into a list of strings.
///
/// Arrays keep their string/number members, strings are split on common
/// separators and bullet markers are removed.
pub fn value_to_list(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => LIST_SEPARATORS.split(s).map(|s| s.to_string()).collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .map(|item| {
            item.trim()
                .trim_start_matches(['-', '*', '•', '·'])
                .trim()
                .to_string()
        })
        .filter(|item| !item.is_empty())
        .collect()
}

/// Lowercased string with every non-alphanumeric character removed
pub fn alnum_lower(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Case-insensitive Levenshtein edit distance
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().flat_map(|c| c.to_lowercase()).collect();
    let b: Vec<char> = b.chars().flat_map(|c| c.to_lowercase()).collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Lowercase ASCII slug made of alphanumerics joined by `sep`
pub fn slugify(text: &str, sep: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Convert an HTML document to collapsed plain text.
///
/// Script, style and noscript blocks are removed with their content, the
/// remaining tags stripped and a handful of common entities decoded.
pub fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_OR_STYLE.replace_all(html, " ");
    let without_comments = HTML_COMMENT.replace_all(&without_scripts, " ");
    let without_tags = HTML_TAG.replace_all(&without_comments, " ");
    collapse_whitespace(&decode_entities(&without_tags))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

/// Parse a JSON object out of a model response.
///
/// Tries, in order: the raw text, the content of the first Markdown code
/// fence, and every balanced `{...}` span in the text. Returns `None` when
/// no candidate parses into a JSON object.
pub fn parse_model_json(text: &str) -> Option<Map<String, Value>> {
    let trimmed = text.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Some(map);
    }

    if let Some(fenced) = CODE_FENCE.captures(trimmed).and_then(|caps| caps.get(1)) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(fenced.as_str()) {
            return Some(map);
        }
    }

    let mut search_from = 0;
    while let Some(offset) = trimmed[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_object_end(&trimmed[start..]) {
            let candidate = &trimmed[start..start + end];
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
                return Some(map);
            }
        }
        search_from = start + 1;
    }

    debug!(chars = trimmed.len(), "No JSON object found in model response");
    None
}

/// Byte length of the balanced `{...}` object starting at `text[0]`
fn balanced_object_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}
