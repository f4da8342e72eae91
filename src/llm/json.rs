//! JSON extraction for completion responses.
//!
//! Models asked for JSON still wrap it in markdown fences or chatter now and
//! then, even with a JSON response format requested. Extraction is tolerant;
//! deserialization into the caller's type is strict.

use serde::de::DeserializeOwned;

/// Extract a JSON object from a response that may be wrapped in markdown.
///
/// Tries, in order:
/// 1. A ` ```json ... ``` ` fenced block
/// 2. A bare ` ``` ... ``` ` fenced block whose content starts with `{`
/// 3. The first `{` from which a valid JSON object can be read
/// 4. The trimmed input unchanged
pub fn extract_json(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(inner) = fenced_block(trimmed, "```json") {
        return inner.to_string();
    }

    if let Some(inner) = fenced_block(trimmed, "```")
        && inner.starts_with('{')
    {
        return inner.to_string();
    }

    first_json_object(trimmed).unwrap_or_else(|| trimmed.to_string())
}

/// Extract and deserialize a JSON object from a response.
pub fn parse_json_response<T: DeserializeOwned>(response: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(&extract_json(response))
}

fn fenced_block<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let end = text[start..].find("```")?;
    Some(text[start..start + end].trim())
}

/// Scan every `{` for the first position where a JSON object begins.
///
/// A streaming deserializer reads exactly one value and ignores whatever
/// follows it, so trailing prose after the object is fine. When that fails
/// (for instance on a truncated tail), a string-aware brace matcher gets a
/// second try.
fn first_json_object(text: &str) -> Option<String> {
    for (start, _) in text.match_indices('{') {
        let candidate = &text[start..];

        let mut stream =
            serde_json::Deserializer::from_str(candidate).into_iter::<serde_json::Value>();
        if let Some(Ok(value)) = stream.next()
            && value.is_object()
        {
            return serde_json::to_string(&value).ok();
        }

        if let Some(balanced) = balanced_braces(candidate)
            && serde_json::from_str::<serde_json::Value>(balanced).is_ok()
        {
            return Some(balanced.to_string());
        }
    }

    None
}

/// Prefix of `text` up to the brace closing its first `{`, skipping braces
/// inside string literals.
fn balanced_braces(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=idx]);
                }
            }
            _ => {}
        }
    }

    None
}
