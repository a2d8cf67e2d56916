const ELLIPSIS: &str = "...";

/// Bound `text` to `max_bytes` of UTF-8, cutting at whitespace and appending "...".
///
/// Lengths are measured in bytes, not chars, so multi-byte text cannot slip past
/// the budget. Text with no usable whitespace is cut at the last char boundary.
pub fn truncate(text: Option<&str>, max_bytes: usize) -> String {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => return String::new(),
    };
    if text.len() <= max_bytes {
        return text.to_string();
    }

    let mut cut = text;
    while cut.len() > max_bytes {
        cut = match cut.rfind(char::is_whitespace) {
            Some(idx) => &cut[..idx],
            None => &cut[..floor_char_boundary(cut, max_bytes)],
        };
    }
    let mut out = String::with_capacity(cut.len() + ELLIPSIS.len());
    out.push_str(cut);
    out.push_str(ELLIPSIS);
    out
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    (0..=index).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_unchanged() {
        assert_eq!(truncate(Some("hello world"), 200), "hello world");
        assert_eq!(truncate(None, 10), "");
        assert_eq!(truncate(Some(""), 10), "");
    }

    #[test]
    fn cuts_at_whitespace() {
        assert_eq!(truncate(Some("alpha beta gamma"), 12), "alpha beta...");
    }

    #[test]
    fn no_whitespace_falls_back_to_char_boundary() {
        // "é" is two bytes; a cut at byte 5 would land inside the third one.
        let out = truncate(Some("éééééé"), 5);
        assert_eq!(out, "éé...");
    }
}
