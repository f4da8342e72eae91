//! Text hygiene for anything interpolated into a prompt.

/// Maximum lines of any single commit-derived text kept in a prompt.
const MAX_PROMPT_LINES: usize = 50;

/// Sanitize commit text before it is placed in a prompt, to blunt prompt
/// injection through commit messages.
pub fn sanitize_for_prompt(text: &str) -> String {
    text.replace("```", "'''")
        .replace("##", "//")
        .lines()
        .take(MAX_PROMPT_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

/// The first `max_chars` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
