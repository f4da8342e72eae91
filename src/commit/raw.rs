//! Commits as delivered by a history provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a commit's author, as far as the provider knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    /// Hosting-account login. Absent for commits whose email is not linked to an account.
    pub login: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// A commit exactly as fetched, before any parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommit {
    pub sha: String,
    pub message: String,
    pub author: Option<CommitAuthor>,
    /// Web permalink to the commit, when the provider has one.
    pub html_url: Option<String>,
    pub authored_at: Option<DateTime<Utc>>,
}

impl RawCommit {
    /// Create a commit with only a SHA and message.
    pub fn new(sha: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sha: sha.into(),
            message: message.into(),
            author: None,
            html_url: None,
            authored_at: None,
        }
    }

    /// First seven characters of the SHA.
    pub fn short_sha(&self) -> &str {
        let end = self
            .sha
            .char_indices()
            .nth(7)
            .map(|(idx, _)| idx)
            .unwrap_or(self.sha.len());
        &self.sha[..end]
    }

    /// First line of the message.
    pub fn header(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// The author's login, if the provider linked one.
    pub fn login(&self) -> Option<&str> {
        self.author.as_ref().and_then(|a| a.login.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_sha_truncates_to_seven() {
        let commit = RawCommit::new("0123456789abcdef", "feat: x");
        assert_eq!(commit.short_sha(), "0123456");
    }

    #[test]
    fn test_short_sha_keeps_short_ids() {
        let commit = RawCommit::new("abc", "feat: x");
        assert_eq!(commit.short_sha(), "abc");
    }

    #[test]
    fn test_header_is_first_line() {
        let commit = RawCommit::new("abc", "fix: thing\n\nlonger body");
        assert_eq!(commit.header(), "fix: thing");
    }
}
