//! Output formats and languages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

const KEEP_A_CHANGELOG_INSTRUCTIONS: &str = r#"Generate a changelog strictly following the Keep a Changelog (keepachangelog.com) format.
Rules:
1. Start with a YAML metadata block:
---
version: X.Y.Z
date: YYYY-MM-DD
type: (major|minor|patch)
breaking: (true|false)
stability: (stable|experimental|beta)
components: (list based on changes: e.g. api, ui, cli, db)
tags: (list based on impact: e.g. performance, security, dx, ux)
migration_required: (true|false)
---
2. Follow with the mandatory header: "The format is based on [Keep a Changelog](https://keepachangelog.com/en/1.0.0/), and this project adheres to [Semantic Versioning](https://semver.org/spec/v2.0.0.html)."
3. Use standard categories: Added, Changed, Deprecated, Removed, Fixed, Security.
4. Place the latest version first.
5. Every entry MUST be a bullet point. Use provided commit links.
6. Types of changes are for humans, not machines."#;

const GITHUB_RELEASE_INSTRUCTIONS: &str = "Generate GitHub Release notes.
Include a summary, ✨ Highlights (grouped by type), and Emojis.
Use commit links if available for each bullet point.";

const SIMPLE_INSTRUCTIONS: &str =
    "Generate a simple bullet-point changelog with commit links if available.";

/// The shape of the generated changelog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangelogFormat {
    /// Keep a Changelog with a YAML front-matter block.
    #[default]
    #[serde(rename = "keepachangelog")]
    KeepAChangelog,
    /// GitHub release notes with emoji-grouped highlights.
    GithubRelease,
    /// A plain bullet list.
    Simple,
    /// A caller-supplied template.
    Custom,
}

impl ChangelogFormat {
    pub const ALL: [ChangelogFormat; 4] = [
        Self::KeepAChangelog,
        Self::GithubRelease,
        Self::Simple,
        Self::Custom,
    ];

    /// Identifier used on the wire and in cache fingerprints.
    pub fn id(&self) -> &'static str {
        match self {
            Self::KeepAChangelog => "keepachangelog",
            Self::GithubRelease => "github_release",
            Self::Simple => "simple",
            Self::Custom => "custom",
        }
    }

    /// Built-in style instructions. `None` for [`ChangelogFormat::Custom`],
    /// whose instructions come from the caller's template.
    pub fn instructions(&self) -> Option<&'static str> {
        match self {
            Self::KeepAChangelog => Some(KEEP_A_CHANGELOG_INSTRUCTIONS),
            Self::GithubRelease => Some(GITHUB_RELEASE_INSTRUCTIONS),
            Self::Simple => Some(SIMPLE_INSTRUCTIONS),
            Self::Custom => None,
        }
    }
}

impl fmt::Display for ChangelogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ChangelogFormat {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.id() == wanted)
            .ok_or_else(|| InputError::UnknownFormat(s.to_string()))
    }
}

/// The language the changelog prose is written in, as an ISO 639-1 code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputLanguage(String);

impl Default for OutputLanguage {
    fn default() -> Self {
        Self("en".to_string())
    }
}

impl OutputLanguage {
    /// Normalize a language code. Blank input means English.
    pub fn new(code: &str) -> Self {
        let code = code.trim().to_lowercase();
        if code.is_empty() {
            Self::default()
        } else {
            Self(code)
        }
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn is_english(&self) -> bool {
        self.0 == "en"
    }

    /// Instruction appended to the system prompt. English needs none.
    pub fn directive(&self) -> Option<String> {
        let directive = match self.0.as_str() {
            "en" => return None,
            "hi" => "चेंजलॉग को हिंदी में लिखें। Use Hindi for section headers like 'जोड़ा गया', 'बदला गया', 'ठीक किया गया'.",
            "es" => "Escribe el changelog en español. Usa encabezados como 'Añadido', 'Cambiado', 'Corregido'.",
            "de" => "Schreibe den Changelog auf Deutsch. Verwende Überschriften wie 'Hinzugefügt', 'Geändert', 'Behoben'.",
            other => {
                return Some(format!(
                    "Write the changelog in the language with ISO 639-1 code '{}'.",
                    other
                ));
            }
        };
        Some(directive.to_string())
    }

    /// Heading of the contributors section.
    pub fn contributors_heading(&self) -> &'static str {
        match self.0.as_str() {
            "hi" => "❤️ योगदानकर्ता",
            "es" => "❤️ Colaboradores",
            "de" => "❤️ Mitwirkende",
            _ => "❤️ Contributors",
        }
    }
}

impl fmt::Display for OutputLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
