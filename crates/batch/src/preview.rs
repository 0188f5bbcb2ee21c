use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub text: String,
    pub truncated: bool,
}

/// Keep at most `budget` grapheme clusters of `text`, appending an ellipsis
/// when anything was cut.
pub fn truncate_preview(text: &str, budget: usize) -> Preview {
    match text.grapheme_indices(true).nth(budget) {
        Some((cut, _)) => Preview {
            text: format!("{}{}", &text[..cut], ELLIPSIS),
            truncated: true,
        },
        None => Preview {
            text: text.to_string(),
            truncated: false,
        },
    }
}

/// Re-budget a preview that may have been truncated upstream.
///
/// A trailing `...` only counts as an upstream cut marker when the reported
/// `text_length` is longer than what precedes it; otherwise it is part of the
/// text. Without a reported length the marker is trusted.
pub fn rebudget_preview(preview: &str, text_length: Option<usize>, budget: usize) -> Preview {
    let (body, cut_upstream) = match preview.strip_suffix(ELLIPSIS) {
        Some(body) if text_length.is_none_or(|len| len > body.chars().count()) => (body, true),
        _ => (preview, false),
    };

    let mut result = truncate_preview(body, budget);
    if cut_upstream && !result.truncated {
        result.text.push_str(ELLIPSIS);
        result.truncated = true;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_untouched() {
        let preview = truncate_preview("Alice met Bob", 200);
        assert_eq!(preview.text, "Alice met Bob");
        assert!(!preview.truncated);

        // Exactly at budget
        assert!(!truncate_preview("abcde", 5).truncated);
    }

    #[test]
    fn test_truncates_with_marker() {
        let preview = truncate_preview("abcdefgh", 5);
        assert_eq!(preview.text, "abcde...");
        assert!(preview.truncated);
    }

    #[test]
    fn test_multibyte_boundaries() {
        let preview = truncate_preview("日本語のテキスト", 3);
        assert_eq!(preview.text, "日本語...");

        // Family emoji is one grapheme made of several code points
        let family = "👨‍👩‍👧 family";
        let preview = truncate_preview(family, 1);
        assert_eq!(preview.text, "👨‍👩‍👧...");

        let accented = "e\u{301}te\u{301}";
        assert_eq!(truncate_preview(accented, 1).text, "e\u{301}...");
    }

    #[test]
    fn test_zero_budget() {
        assert_eq!(truncate_preview("abc", 0).text, "...");
        assert_eq!(truncate_preview("", 0).text, "");
    }

    #[test]
    fn test_rebudget_upstream_preview() {
        let upstream = format!("{}...", "a".repeat(200));

        let same_budget = rebudget_preview(&upstream, Some(5000), 200);
        assert_eq!(same_budget.text, upstream);
        assert!(same_budget.truncated);

        let smaller = rebudget_preview(&upstream, Some(5000), 10);
        assert_eq!(smaller.text, format!("{}...", "a".repeat(10)));

        let unknown_length = rebudget_preview(&upstream, None, 200);
        assert!(unknown_length.truncated);

        assert!(!rebudget_preview("short", Some(5), 200).truncated);
    }

    #[test]
    fn test_literal_ellipsis_is_text() {
        // Whole document is "Wait..."
        let preview = rebudget_preview("Wait...", Some(7), 200);
        assert_eq!(preview.text, "Wait...");
        assert!(!preview.truncated);

        let cut = rebudget_preview("Wait...", Some(7), 4);
        assert_eq!(cut.text, "Wait...");
        assert!(cut.truncated);
    }
}
