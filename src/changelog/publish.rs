//! Writing a generated changelog back to the repository.

use serde::Serialize;
use tracing::{info, warn};

use crate::history::{HistoryProvider, RepoId};

/// File the changelog is published to.
pub const CHANGELOG_PATH: &str = "CHANGELOG.md";

/// Result of a publish attempt. Failure is reported, not raised: the
/// changelog itself was generated successfully either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PublishOutcome {
    Published { path: String },
    Failed { reason: String },
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }
}

/// Commit message for a changelog update. `[skip ci]` keeps the docs commit
/// from triggering another release run.
pub fn publish_commit_message(version: Option<&str>) -> String {
    let version = version.map(str::trim).filter(|v| !v.is_empty());
    format!(
        "docs: update changelog for {} [skip ci]",
        version.unwrap_or("new release")
    )
}

/// Create or update `CHANGELOG.md` with the generated text.
pub async fn publish_changelog(
    history: &dyn HistoryProvider,
    repo: &RepoId,
    changelog: &str,
    version: Option<&str>,
) -> PublishOutcome {
    let message = publish_commit_message(version);

    match history.write_file(repo, CHANGELOG_PATH, changelog, &message).await {
        Ok(()) => {
            info!(repo = %repo, "Published {}", CHANGELOG_PATH);
            PublishOutcome::Published {
                path: CHANGELOG_PATH.to_string(),
            }
        }
        Err(e) => {
            warn!("Failed to publish {} to {}: {}", CHANGELOG_PATH, repo, e);
            PublishOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HistoryError;
    use crate::history::MockHistoryProvider;

    #[test]
    fn test_commit_message_names_version() {
        assert_eq!(
            publish_commit_message(Some("1.4.0")),
            "docs: update changelog for 1.4.0 [skip ci]"
        );
        assert_eq!(
            publish_commit_message(None),
            "docs: update changelog for new release [skip ci]"
        );
    }

    #[tokio::test]
    async fn test_publish_writes_changelog_file() {
        let mut history = MockHistoryProvider::new();
        history
            .expect_write_file()
            .withf(|_, path, content, message| {
                path == "CHANGELOG.md"
                    && content == "# Changelog"
                    && message == "docs: update changelog for 2.0.0 [skip ci]"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let outcome =
            publish_changelog(&history, &RepoId::new("acme", "widgets"), "# Changelog", Some("2.0.0"))
                .await;
        assert!(outcome.is_published());
    }

    #[tokio::test]
    async fn test_publish_failure_is_reported_not_raised() {
        let mut history = MockHistoryProvider::new();
        history
            .expect_write_file()
            .returning(|_, _, _, _| Err(HistoryError::Unavailable("read-only token".to_string())));

        let outcome =
            publish_changelog(&history, &RepoId::new("acme", "widgets"), "# Changelog", None).await;

        match outcome {
            PublishOutcome::Failed { reason } => assert!(reason.contains("read-only token")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
