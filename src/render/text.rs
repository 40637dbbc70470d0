//! Text measurement used to estimate rendered card heights.

use serde::Deserialize;

/// Display width of `text` in character cells, ignoring ANSI escapes.
pub fn display_width(text: &str) -> usize {
    let clean = strip_ansi_escapes::strip(text);
    let clean_str = String::from_utf8_lossy(&clean);
    unicode_width::UnicodeWidthStr::width(&*clean_str)
}

/// Hard-wrap `content` so no line is wider than `width` cells.
///
/// Existing newlines are kept, leading spaces on continuation lines are
/// dropped and a character wider than `width` occupies a line of its own.
pub fn wrap_to_width(content: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }

    let mut lines = Vec::new();
    for raw in content.split('\n') {
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        let mut current_width = 0;
        let mut wrapped = false;
        for ch in raw.chars() {
            if wrapped && current.is_empty() && ch == ' ' {
                continue;
            }
            let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
            if current_width + ch_width > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current).trim_end().to_string());
                current_width = 0;
                wrapped = true;
                if ch == ' ' {
                    continue;
                }
            }
            current.push(ch);
            current_width += ch_width;
        }

        if !current.is_empty() {
            lines.push(current.trim_end().to_string());
        }
    }

    lines
}

/// Pixel metrics used to turn wrapped text into a card height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HeightMetrics {
    /// Average advance of one character cell.
    pub char_px: u32,
    pub line_px: u32,
    /// Height taken by the card title.
    pub header_px: u32,
    /// Vertical padding inside the card.
    pub padding_px: u32,
}

impl Default for HeightMetrics {
    fn default() -> Self {
        Self {
            char_px: 8,
            line_px: 20,
            header_px: 32,
            padding_px: 24,
        }
    }
}

impl HeightMetrics {
    /// Estimated rendered height of `body` inside a column `column_px` wide.
    pub fn estimate(&self, body: &str, column_px: u32) -> u32 {
        let inner = column_px.saturating_sub(self.padding_px);
        let cells = (inner / self.char_px.max(1)).max(1) as usize;
        let lines = if body.is_empty() {
            0
        } else {
            wrap_to_width(body, cells).len() as u32
        };
        self.header_px
            .saturating_add(lines.saturating_mul(self.line_px))
            .saturating_add(self.padding_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_width_ignores_ansi() {
        assert_eq!(display_width("\x1b[31mBaro\x1b[0m"), 4);
        assert_eq!(display_width("日本"), 4);
    }

    #[test]
    fn wrap_basic() {
        let lines = wrap_to_width("hello world", 5);
        assert_eq!(lines, vec!["hello".to_string(), "world".to_string()]);
    }

    #[test]
    fn wrap_keeps_blank_lines() {
        let lines = wrap_to_width("a\n\nb", 10);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn wrap_handles_wide_characters() {
        let lines = wrap_to_width("日本語", 4);
        assert_eq!(lines, vec!["日本", "語"]);
        assert!(wrap_to_width("anything", 0).is_empty());
    }

    #[test]
    fn estimate_grows_with_wrapped_lines() {
        let metrics = HeightMetrics::default();
        let empty = metrics.estimate("", 300);
        assert_eq!(empty, 32 + 24);

        // 300px - 24px padding = 276px / 8px = 34 cells per line.
        let one_line = metrics.estimate("Sortie: Defense", 300);
        assert_eq!(one_line, 32 + 20 + 24);

        let long = "x".repeat(70);
        assert_eq!(metrics.estimate(&long, 300), 32 + 3 * 20 + 24);
        assert!(metrics.estimate(&long, 120) > metrics.estimate(&long, 300));
    }
}
