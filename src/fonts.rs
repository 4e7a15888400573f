//! Text measurement for the builtin Helvetica faces.
//!
//! Both backends draw with the PDF standard fonts, so measurement uses the
//! Adobe Helvetica / Helvetica-Bold advance widths for printable ASCII and an
//! average advance for everything else.

/// Advance widths (1/1000 em) for ASCII 0x20..=0x7E, Helvetica.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Advance widths (1/1000 em) for ASCII 0x20..=0x7E, Helvetica-Bold.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // '0'..'?'
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 'P'..'_'
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // '`'..'o'
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 'p'..'~'
];

const FALLBACK_ADVANCE: u16 = 556;

/// Helvetica ascender as a fraction of the font size.
pub const ASCENDER: f32 = 0.718;

/// Metrics for the two builtin faces.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontManager;

impl FontManager {
    pub fn new() -> Self {
        Self
    }

    /// Width of `text` in points at `font_size`.
    pub fn measure_text_width(&self, text: &str, font_size: f32, bold: bool) -> f32 {
        let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
        let units: u32 = text
            .chars()
            .map(|c| {
                let code = c as u32;
                if (0x20..=0x7E).contains(&code) {
                    table[(code - 0x20) as usize] as u32
                } else if c == '\u{00A0}' {
                    table[0] as u32
                } else {
                    FALLBACK_ADVANCE as u32
                }
            })
            .sum();
        units as f32 * font_size / 1000.0
    }

    /// Line height in points.
    pub fn line_height(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }

    /// Distance from the top of a line box to the baseline.
    pub fn ascender(&self, font_size: f32) -> f32 {
        font_size * ASCENDER
    }
}

/// Word-wrap text to fit within `max_width` points. Explicit newlines are
/// kept as line breaks; a single word wider than the line stays whole.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    bold: bool,
    max_width: f32,
    fonts: &FontManager,
) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in &words {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{current_line} {word}")
            };
            let w = fonts.measure_text_width(&candidate, font_size, bold);
            if w > max_width && !current_line.is_empty() {
                lines.push(current_line);
                current_line = word.to_string();
            } else {
                current_line = candidate;
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_widths() {
        let fonts = FontManager::new();
        // H e l l o = 722 + 556 + 222 + 222 + 556
        let w = fonts.measure_text_width("Hello", 10.0, false);
        assert!((w - 22.78).abs() < 0.01, "got {w}");
        assert!(fonts.measure_text_width("Hello", 10.0, true) > w);
    }

    #[test]
    fn word_wrap_basic() {
        let fonts = FontManager::new();
        let lines = wrap_text("Hello world foo bar", 16.0, false, 60.0, &fonts);
        assert!(lines.len() >= 2, "Expected wrapping, got {lines:?}");
    }

    #[test]
    fn long_word_is_not_split() {
        let fonts = FontManager::new();
        let lines = wrap_text("Supercalifragilistic", 12.0, false, 20.0, &fonts);
        assert_eq!(lines, vec!["Supercalifragilistic"]);
    }
}
