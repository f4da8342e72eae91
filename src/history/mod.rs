//! The commit-history provider seam and commit-range selection.
//!
//! A history provider is anything that can list commits, diff a commit, list
//! tags and write a file back: the GitHub REST API ([`crate::github`]) or a
//! local clone ([`crate::git`]).

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::commit::RawCommit;
use crate::error::{HistoryError, InputError};

/// Commits listed when a ref comparison fails, or when no range is given.
pub const FALLBACK_COMMIT_LIMIT: usize = 50;

/// Placeholder rendered for a changed file without a textual patch.
pub const NO_PATCH_PLACEHOLDER: &str = "Binary file or no patch available";

/// An `owner/repo` repository identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/repo`. Anything other than exactly two non-empty
    /// slash-separated parts is rejected.
    pub fn parse(full_name: &str) -> Result<Self, InputError> {
        let invalid = || InputError::InvalidRepository(full_name.to_string());
        let (owner, name) = full_name.trim().split_once('/').ok_or_else(invalid)?;

        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(Self::new(owner, name))
    }
}

impl FromStr for RepoId {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Filters for [`HistoryProvider::list_commits`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitQuery {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Branch, tag or SHA to list from. `None` means the default branch.
    pub reference: Option<String>,
    pub limit: Option<usize>,
}

impl CommitQuery {
    pub fn recent(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }
}

/// A tag and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub sha: String,
}

impl Tag {
    /// Semver version named by the tag. Handles both `v1.2.3` and `1.2.3`.
    pub fn version(&self) -> Option<Version> {
        let raw = self.name.strip_prefix('v').unwrap_or(&self.name);
        Version::parse(raw).ok()
    }

    /// Whether the tag is a plain `vX.Y.Z` / `X.Y.Z` release, without
    /// pre-release or build suffixes.
    pub fn is_stable_release(&self) -> bool {
        self.version()
            .is_some_and(|v| v.pre.is_empty() && v.build.is_empty())
    }
}

/// The stable release tag with the highest version.
pub fn latest_release_tag(tags: &[Tag]) -> Option<&Tag> {
    tags.iter()
        .filter(|t| t.is_stable_release())
        .max_by_key(|t| t.version())
}

/// A source of commit history.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// List commits, newest first.
    async fn list_commits(
        &self,
        repo: &RepoId,
        query: &CommitQuery,
    ) -> Result<Vec<RawCommit>, HistoryError>;

    /// Commits reachable from `head` but not from `base`, oldest first.
    async fn compare_refs(
        &self,
        repo: &RepoId,
        base: &str,
        head: &str,
    ) -> Result<Vec<RawCommit>, HistoryError>;

    /// The commit's patch as `File: <name>\n<patch>` blocks joined by blank
    /// lines. Empty when the commit changes no files.
    async fn get_commit_diff(&self, repo: &RepoId, sha: &str) -> Result<String, HistoryError>;

    async fn list_tags(&self, repo: &RepoId) -> Result<Vec<Tag>, HistoryError>;

    /// Create or update a file on the default branch.
    async fn write_file(
        &self,
        repo: &RepoId,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), HistoryError>;
}

/// Render one changed file the way [`HistoryProvider::get_commit_diff`] reports it.
pub fn render_file_diff(file_name: &str, patch: Option<&str>) -> String {
    let patch = patch.filter(|p| !p.is_empty()).unwrap_or(NO_PATCH_PLACEHOLDER);
    format!("File: {}\n{}", file_name, patch)
}

/// Which commits a generation run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitSelection {
    /// Commits between two refs (tags, branches or SHAs).
    Refs { from: String, to: String },
    /// Commits authored inside a time window.
    Window {
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    },
    /// The latest [`FALLBACK_COMMIT_LIMIT`] commits.
    Recent,
}

/// Commits plus whether the compare-to-recent fallback was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedCommits {
    pub commits: Vec<RawCommit>,
    pub fallback_applied: bool,
}

/// Fetch the commits a selection names.
///
/// A failed ref comparison falls back once to the latest
/// [`FALLBACK_COMMIT_LIMIT`] commits; if that also fails its error is returned.
pub async fn fetch_commits(
    provider: &dyn HistoryProvider,
    repo: &RepoId,
    selection: &CommitSelection,
) -> Result<FetchedCommits, HistoryError> {
    match selection {
        CommitSelection::Refs { from, to } => match provider.compare_refs(repo, from, to).await {
            Ok(commits) => {
                debug!(count = commits.len(), %from, %to, "Compared refs");
                Ok(FetchedCommits {
                    commits,
                    fallback_applied: false,
                })
            }
            Err(e) => {
                warn!(
                    "Compare failed for {}...{}: {}. Falling back to recent commits.",
                    from, to, e
                );
                let commits = provider
                    .list_commits(repo, &CommitQuery::recent(FALLBACK_COMMIT_LIMIT))
                    .await?;
                Ok(FetchedCommits {
                    commits,
                    fallback_applied: true,
                })
            }
        },
        CommitSelection::Window { since, until } => {
            let query = CommitQuery {
                since: *since,
                until: *until,
                ..Default::default()
            };
            Ok(FetchedCommits {
                commits: provider.list_commits(repo, &query).await?,
                fallback_applied: false,
            })
        }
        CommitSelection::Recent => Ok(FetchedCommits {
            commits: provider
                .list_commits(repo, &CommitQuery::recent(FALLBACK_COMMIT_LIMIT))
                .await?,
            fallback_applied: false,
        }),
    }
}
