//! Procedural product cards.
//!
//! Draws a diagonal gradient with the product name as title and
//! plan / validity / price as subtitle, using a built-in 5x7 bitmap font so
//! rendering needs no font files and cannot fail for lack of assets.

use image::{DynamicImage, ImageError, ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;

use crate::product::{is_known, ProductDraft};

/// Card edge in pixels
pub const CARD_SIZE: u32 = 1024;
const MARGIN: u32 = 72;
const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const TITLE_MAX_LINES: usize = 3;
const SUBTITLE_MAX_LINES: usize = 2;
const SUBTITLE_SCALE: u32 = 5;

const TEXT: Rgb<u8> = Rgb([255, 255, 255]);
const SHADOW: Rgb<u8> = Rgb([20, 20, 35]);

/// Gradient start/end colours, picked by name
const PALETTES: &[([u8; 3], [u8; 3])] = &[
    ([229, 9, 20], [75, 0, 130]),
    ([30, 215, 96], [18, 60, 105]),
    ([0, 114, 255], [0, 198, 255]),
    ([255, 94, 58], [255, 42, 104]),
    ([67, 56, 202], [17, 24, 39]),
    ([245, 158, 11], [190, 18, 60]),
];

/// Renders the terminal-fallback image for a draft
pub trait CardRenderer: Send + Sync {
    /// Encoded PNG bytes
    fn render(&self, draft: &ProductDraft) -> Result<Vec<u8>, ImageError>;
}

/// Rows of a 5x7 glyph, bit 4 is the leftmost column
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '+' => [0x00, 0x04, 0x04, 0x1F, 0x04, 0x04, 0x00],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '/' => [0x01, 0x01, 0x02, 0x04, 0x08, 0x10, 0x10],
        '&' => [0x0C, 0x12, 0x14, 0x08, 0x15, 0x12, 0x0D],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '?' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        '\'' => [0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        ' ' => [0; 7],
        _ => return None,
    };
    Some(rows)
}

/// Uppercase text restricted to characters the font can draw
fn drawable(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c.to_ascii_uppercase() })
        .filter(|c| glyph(*c).is_some())
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Greedy word wrap to `max_chars` columns; overlong words are split
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..max_chars).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }
        let needed = if current.is_empty() {
            word.len()
        } else {
            current.len() + 1 + word.len()
        };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn columns_at(scale: u32) -> usize {
    ((CARD_SIZE - 2 * MARGIN) / ((GLYPH_WIDTH + 1) * scale)) as usize
}

/// Largest scale at which the title fits in the allowed lines
fn fit_title(title: &str) -> (u32, Vec<String>) {
    for scale in (5..=14).rev() {
        let lines = wrap_text(title, columns_at(scale));
        if lines.len() <= TITLE_MAX_LINES {
            return (scale, lines);
        }
    }
    let mut lines = wrap_text(title, columns_at(5));
    lines.truncate(TITLE_MAX_LINES);
    (5, lines)
}

/// `plan - validity - Rs price`, skipping unknown parts
pub fn subtitle(draft: &ProductDraft) -> String {
    let mut parts = Vec::new();
    if draft.has_plan() {
        parts.push(draft.plan.clone());
    }
    if is_known(&draft.validity) {
        parts.push(draft.validity.clone());
    }
    if let Some(price) = draft.price {
        parts.push(format!("Rs {price}"));
    }
    parts.join(" - ")
}

/// Gradient card renderer with a built-in bitmap font
#[derive(Debug, Clone, Default)]
pub struct GradientCardRenderer;

impl GradientCardRenderer {
    pub fn new() -> Self {
        Self
    }

    fn palette_for(name: &str) -> ([u8; 3], [u8; 3]) {
        let hash = name
            .bytes()
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        PALETTES[hash % PALETTES.len()]
    }

    fn paint_gradient(canvas: &mut RgbImage, from: [u8; 3], to: [u8; 3]) {
        let span = (canvas.width() + canvas.height()).saturating_sub(2).max(1) as f32;
        for (x, y, pixel) in canvas.enumerate_pixels_mut() {
            let t = (x + y) as f32 / span;
            let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
            *pixel = Rgb([mix(from[0], to[0]), mix(from[1], to[1]), mix(from[2], to[2])]);
        }
    }

    fn draw_text(canvas: &mut RgbImage, line: &str, top: u32, scale: u32, colour: Rgb<u8>) {
        let advance = (GLYPH_WIDTH + 1) * scale;
        let width = (line.chars().count() as u32 * advance).saturating_sub(scale);
        let left = CARD_SIZE.saturating_sub(width) / 2;

        for (index, c) in line.chars().enumerate() {
            let Some(rows) = glyph(c) else { continue };
            let origin_x = left + index as u32 * advance;
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    let x0 = origin_x + col * scale;
                    let y0 = top + row as u32 * scale;
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let (x, y) = (x0 + dx, y0 + dy);
                            if x < canvas.width() && y < canvas.height() {
                                canvas.put_pixel(x, y, colour);
                            }
                        }
                    }
                }
            }
        }
    }

    fn draw_block(canvas: &mut RgbImage, lines: &[String], top: u32, scale: u32) -> u32 {
        let line_height = (GLYPH_HEIGHT + 3) * scale;
        let shadow = (scale / 3).max(1);
        for (index, line) in lines.iter().enumerate() {
            let y = top + index as u32 * line_height;
            Self::draw_text(canvas, line, y + shadow, scale, SHADOW);
            Self::draw_text(canvas, line, y, scale, TEXT);
        }
        lines.len() as u32 * line_height
    }
}

impl CardRenderer for GradientCardRenderer {
    fn render(&self, draft: &ProductDraft) -> Result<Vec<u8>, ImageError> {
        let mut canvas = RgbImage::new(CARD_SIZE, CARD_SIZE);
        let (from, to) = Self::palette_for(&draft.name);
        Self::paint_gradient(&mut canvas, from, to);

        let title = drawable(&draft.name);
        let (title_scale, title_lines) = fit_title(&title);
        let mut subtitle_lines = wrap_text(&drawable(&subtitle(draft)), columns_at(SUBTITLE_SCALE));
        subtitle_lines.truncate(SUBTITLE_MAX_LINES);

        let title_height = title_lines.len() as u32 * (GLYPH_HEIGHT + 3) * title_scale;
        let subtitle_height = subtitle_lines.len() as u32 * (GLYPH_HEIGHT + 3) * SUBTITLE_SCALE;
        let gap = if subtitle_lines.is_empty() { 0 } else { 4 * SUBTITLE_SCALE };
        let top = CARD_SIZE.saturating_sub(title_height + gap + subtitle_height) / 2;

        let used = Self::draw_block(&mut canvas, &title_lines, top, title_scale);
        Self::draw_block(&mut canvas, &subtitle_lines, top + used + gap, SUBTITLE_SCALE);

        let mut encoded = Vec::new();
        DynamicImage::ImageRgb8(canvas)
            .write_to(&mut Cursor::new(&mut encoded), ImageOutputFormat::Png)?;
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_every_drawable_char_has_a_glyph() {
        for c in "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+-.,:/&!?()' ".chars() {
            assert!(glyph(c).is_some(), "missing glyph for {c:?}");
        }
        assert!(glyph('₹').is_none());
    }

    #[test]
    fn test_drawable_uppercases_and_drops_unknown() {
        assert_eq!(drawable("Netflix ₹199\tplan"), "NETFLIX 199 PLAN");
        assert_eq!(drawable("★★★"), "");
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("NETFLIX PREMIUM 4K", 10), vec!["NETFLIX", "PREMIUM 4K"]);
        assert_eq!(wrap_text("ABCDEFGHIJ", 4), vec!["ABCD", "EFGH", "IJ"]);
        assert!(wrap_text("", 4).is_empty());
    }

    #[test]
    fn test_subtitle_skips_unknowns() {
        let mut draft = ProductDraft::new("Spotify");
        assert_eq!(subtitle(&draft), "");
        draft.plan = "Individual".into();
        draft.price = Some(119);
        assert_eq!(subtitle(&draft), "Individual - Rs 119");
    }

    #[test]
    fn test_render_produces_png() {
        let mut draft = ProductDraft::new("Netflix Premium 4K UHD with a very long name that wraps");
        draft.validity = "1 month".into();
        draft.price = Some(199);
        let bytes = GradientCardRenderer::new().render(&draft).unwrap();

        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (CARD_SIZE, CARD_SIZE));
        let rgb = decoded.to_rgb8();
        assert!(rgb.pixels().any(|p| *p == TEXT));
    }

    #[test]
    fn test_render_with_undrawable_name() {
        let bytes = GradientCardRenderer::new()
            .render(&ProductDraft::new("★"))
            .unwrap();
        assert!(!bytes.is_empty());
    }
}
