//! Character-budget truncation.

use std::borrow::Cow;

/// Cut `text` to at most `max_chars` characters.
///
/// A cut inside a word moves back to the preceding whitespace when the kept
/// prefix has any. Trailing whitespace is trimmed. Text within the budget is
/// returned unchanged.
pub fn truncate_chars(text: &str, max_chars: usize) -> Cow<'_, str> {
    let Some((cut, next)) = text.char_indices().nth(max_chars) else {
        return Cow::Borrowed(text);
    };

    let kept = &text[..cut];
    let splits_word = !next.is_whitespace() && kept.chars().last().is_some_and(|c| !c.is_whitespace());
    let kept = match kept.rfind(char::is_whitespace) {
        Some(boundary) if splits_word => &kept[..boundary],
        _ => kept,
    };

    Cow::Owned(kept.trim_end().to_string())
}
