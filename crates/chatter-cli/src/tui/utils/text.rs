//! Display-width aware text helpers

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Cut `text` to at most `max_width` columns, ending in `…` when shortened
pub fn truncate_ellipsis(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let budget = max_width - 1;
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Wrap one logical line into rows of at most `width` columns
///
/// Breaks at the last space that fits, or mid-word when a word is wider than
/// a row. Always returns at least one row.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut row = String::new();
    let mut row_width = 0;

    for word in line.split_inclusive(' ') {
        let word_width = word.width();
        let visible_width = word.trim_end_matches(' ').width();
        if row_width + visible_width <= width {
            row.push_str(word);
            row_width += word_width;
            continue;
        }
        if !row.is_empty() {
            rows.push(std::mem::take(&mut row).trim_end().to_string());
            row_width = 0;
        }
        if visible_width <= width {
            row.push_str(word);
            row_width = word_width;
            continue;
        }
        for ch in word.chars() {
            let w = ch.width().unwrap_or(0);
            if row_width + w > width {
                if ch == ' ' {
                    continue;
                }
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
            row.push(ch);
            row_width += w;
        }
    }

    if !row.is_empty() || rows.is_empty() {
        rows.push(row.trim_end().to_string());
    }
    rows
}

/// Wrap multi-line text, keeping explicit line breaks
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    text.split('\n').flat_map(|line| wrap_line(line, width)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ellipsis() {
        assert_eq!(truncate_ellipsis("short", 10), "short");
        assert_eq!(truncate_ellipsis("Connection error", 8), "Connect…");
        assert_eq!(truncate_ellipsis("anything", 0), "");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // Each CJK char is two columns
        assert_eq!(truncate_ellipsis("日本語テキスト", 5), "日本…");
    }

    #[test]
    fn test_wrap_line_at_spaces() {
        assert_eq!(
            wrap_line("the quick brown fox", 10),
            vec!["the quick", "brown fox"]
        );
    }

    #[test]
    fn test_wrap_line_splits_long_words() {
        assert_eq!(wrap_line("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_text_keeps_blank_lines() {
        assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }
}
