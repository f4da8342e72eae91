//! Conventional commit parsing.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use super::category::CommitCategory;
use super::raw::RawCommit;

/// `type(scope)!: subject`, with scope and `!` optional.
static HEADER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_]+)(?:\(([A-Za-z0-9_$.\-* ]*)\))?(!?): (.+)$")
        .expect("conventional commit header pattern is valid")
});

/// Footer tokens that flag a breaking change anywhere in the body.
const BREAKING_MARKERS: [&str; 2] = ["BREAKING CHANGE", "BREAKING-CHANGE"];

/// A commit message broken into its conventional-commit parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCommit {
    /// The type word exactly as written, e.g. `feat`. `None` when the header
    /// does not follow the conventional shape.
    #[serde(rename = "type")]
    pub commit_type: Option<String>,
    pub scope: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub is_breaking: bool,
    /// The verbatim message this was parsed from.
    pub original: String,
}

impl ParsedCommit {
    /// The typed category this commit's type word names, if any.
    ///
    /// The word must match exactly: `Feat` and unknown words such as `wip`
    /// yield `None`.
    pub fn category_type(&self) -> Option<CommitCategory> {
        let word = self.commit_type.as_deref()?;
        CommitCategory::ALL
            .into_iter()
            .filter(|c| c.is_typed())
            .find(|c| c.as_str() == word)
    }

    /// Whether the commit carries a type the classifier understands.
    pub fn has_recognized_type(&self) -> bool {
        self.category_type().is_some()
    }

    /// Whether the header followed the `type: subject` shape at all.
    pub fn is_conventional(&self) -> bool {
        self.commit_type.is_some()
    }

    /// Subject line, falling back to the message header.
    pub fn display_subject(&self) -> &str {
        self.subject
            .as_deref()
            .unwrap_or_else(|| self.original.lines().next().unwrap_or(""))
    }
}

/// Parse a single commit message. Never fails: malformed headers degrade to
/// an untyped commit whose subject is the whole header line.
pub fn parse_commit_message(message: &str) -> ParsedCommit {
    let (header, rest) = message.split_once('\n').unwrap_or((message, ""));
    let header = header.trim_end_matches('\r');

    let body = rest.trim();
    let breaking_in_body = BREAKING_MARKERS.iter().any(|m| body.contains(m));
    let body = (!body.is_empty()).then(|| body.to_string());

    if let Some(caps) = HEADER_PATTERN.captures(header) {
        let breaking_in_header = caps.get(3).is_some_and(|m| m.as_str() == "!");
        let scope = caps
            .get(2)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        return ParsedCommit {
            commit_type: caps.get(1).map(|m| m.as_str().to_string()),
            scope,
            subject: caps.get(4).map(|m| m.as_str().to_string()),
            body,
            is_breaking: breaking_in_header || breaking_in_body,
            original: message.to_string(),
        };
    }

    ParsedCommit {
        commit_type: None,
        scope: None,
        subject: (!header.trim().is_empty()).then(|| header.to_string()),
        body,
        is_breaking: breaking_in_body,
        original: message.to_string(),
    }
}

/// Parse every commit, one-to-one and in order.
pub fn parse_conventional_commits(commits: &[RawCommit]) -> Vec<ParsedCommit> {
    commits
        .iter()
        .map(|c| parse_commit_message(&c.message))
        .collect()
}
