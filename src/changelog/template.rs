//! `{{placeholder}}` substitution for custom changelog templates.

use std::sync::LazyLock;

use regex_lite::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Replace `{{name}}` placeholders whose name appears in `vars`.
///
/// Whitespace inside the braces is ignored. Placeholders without a value are
/// left untouched so a later stage can fill them.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            match vars.iter().find(|(key, _)| *key == name) {
                Some((_, value)) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Whether the template references `name`.
pub fn has_placeholder(template: &str, name: &str) -> bool {
    PLACEHOLDER
        .captures_iter(template)
        .any(|caps| &caps[1] == name)
}
