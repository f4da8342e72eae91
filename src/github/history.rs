//! Commit history from the GitHub REST API via octocrab.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::commit::{CommitAuthor, RawCommit};
use crate::error::{GitHubError, HistoryError};
use crate::history::{CommitQuery, HistoryProvider, RepoId, Tag, render_file_diff};

/// Largest page GitHub serves.
const MAX_PER_PAGE: usize = 100;
/// Pages fetched for an unbounded listing before giving up.
const MAX_PAGES: u32 = 10;
/// Tags listed per request.
const TAGS_PER_PAGE: u8 = 30;

#[derive(Debug, Deserialize)]
struct CommitItem {
    sha: String,
    commit: CommitDetail,
    author: Option<Account>,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
    author: Option<GitIdentity>,
}

#[derive(Debug, Deserialize)]
struct GitIdentity {
    name: Option<String>,
    email: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Account {
    login: String,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Comparison {
    #[serde(default)]
    commits: Vec<CommitItem>,
}

#[derive(Debug, Deserialize)]
struct CommitFiles {
    #[serde(default)]
    files: Vec<FileChange>,
}

#[derive(Debug, Deserialize)]
struct FileChange {
    filename: String,
    patch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagItem {
    name: String,
    commit: TagCommit,
}

#[derive(Debug, Deserialize)]
struct TagCommit {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct FileContent {
    sha: String,
}

#[derive(Debug, Serialize)]
struct ListCommitsParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    per_page: usize,
    page: u32,
}

#[derive(Debug, Serialize)]
struct PerPage {
    per_page: u8,
}

#[derive(Debug, Serialize)]
struct PutContent<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

impl From<CommitItem> for RawCommit {
    fn from(item: CommitItem) -> Self {
        let identity = item.commit.author;
        let authored_at = identity.as_ref().and_then(|a| a.date);

        let author = match (item.author, identity) {
            (None, None) => None,
            (account, identity) => Some(CommitAuthor {
                login: account.as_ref().map(|a| a.login.clone()),
                avatar_url: account.and_then(|a| a.avatar_url),
                name: identity.as_ref().and_then(|i| i.name.clone()),
                email: identity.and_then(|i| i.email),
            }),
        };

        RawCommit {
            sha: item.sha,
            message: item.commit.message,
            author,
            html_url: item.html_url,
            authored_at,
        }
    }
}

/// Map an octocrab error onto the GitHub error taxonomy.
///
/// Checks both Display and Debug output, since octocrab surfaces the API
/// message in different places depending on the failure.
fn classify_error(error: octocrab::Error, repo: &RepoId) -> GitHubError {
    let display = error.to_string();
    let debug = format!("{:?}", error);

    if display.to_lowercase().contains("rate limit") || debug.to_lowercase().contains("rate limit") {
        return GitHubError::RateLimited {
            reset_time: "unknown".to_string(),
        };
    }
    if display.contains("Not Found") || debug.contains("Not Found") {
        return GitHubError::RepositoryNotFound {
            owner: repo.owner.clone(),
            repo: repo.name.clone(),
        };
    }
    if display.contains("Bad credentials") || debug.contains("Bad credentials") {
        return GitHubError::AuthenticationFailed;
    }
    GitHubError::Request(Box::new(error))
}

/// [`HistoryProvider`] backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubHistory {
    client: Octocrab,
}

impl GitHubHistory {
    /// Build a client authenticated with a personal access token.
    pub fn new(token: &str) -> Result<Self, GitHubError> {
        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .build()
            .map_err(|e| GitHubError::ClientBuild(Box::new(e)))?;
        Ok(Self { client })
    }

    /// Use a pre-configured client, e.g. one pointed at a mock server.
    pub fn with_client(client: Octocrab) -> Self {
        Self { client }
    }

    async fn get<R, P>(&self, repo: &RepoId, route: String, params: Option<&P>) -> Result<R, GitHubError>
    where
        R: serde::de::DeserializeOwned,
        P: Serialize + ?Sized,
    {
        debug!(route = %route, "GitHub GET");
        self.client
            .get(route, params)
            .await
            .map_err(|e| classify_error(e, repo))
    }

    /// SHA of an existing file, used to update instead of create.
    async fn existing_file_sha(&self, repo: &RepoId, path: &str) -> Option<String> {
        let route = format!("/repos/{}/{}/contents/{}", repo.owner, repo.name, path);
        match self.get::<FileContent, ()>(repo, route, None).await {
            Ok(content) => Some(content.sha),
            Err(e) => {
                debug!(path, error = %e, "No existing file, creating");
                None
            }
        }
    }
}

#[async_trait]
impl HistoryProvider for GitHubHistory {
    async fn list_commits(
        &self,
        repo: &RepoId,
        query: &CommitQuery,
    ) -> Result<Vec<RawCommit>, HistoryError> {
        let route = format!("/repos/{}/{}/commits", repo.owner, repo.name);
        let per_page = query.limit.unwrap_or(MAX_PER_PAGE).clamp(1, MAX_PER_PAGE);
        let mut commits: Vec<RawCommit> = Vec::new();
        let mut page = 1u32;

        loop {
            let params = ListCommitsParams {
                since: query.since.map(|d| d.to_rfc3339()),
                until: query.until.map(|d| d.to_rfc3339()),
                sha: query.reference.as_deref(),
                per_page,
                page,
            };
            let items: Vec<CommitItem> = self.get(repo, route.clone(), Some(&params)).await?;
            let page_len = items.len();
            commits.extend(items.into_iter().map(RawCommit::from));

            if let Some(limit) = query.limit
                && commits.len() >= limit
            {
                commits.truncate(limit);
                break;
            }
            if page_len < per_page {
                break;
            }

            page += 1;
            if page > MAX_PAGES {
                warn!(
                    "Reached {}-page limit while listing commits for {}",
                    MAX_PAGES, repo
                );
                break;
            }
        }

        Ok(commits)
    }

    async fn compare_refs(
        &self,
        repo: &RepoId,
        base: &str,
        head: &str,
    ) -> Result<Vec<RawCommit>, HistoryError> {
        let route = format!("/repos/{}/{}/compare/{}...{}", repo.owner, repo.name, base, head);
        let comparison: Comparison = self.get::<_, ()>(repo, route, None).await?;
        Ok(comparison.commits.into_iter().map(RawCommit::from).collect())
    }

    async fn get_commit_diff(&self, repo: &RepoId, sha: &str) -> Result<String, HistoryError> {
        let route = format!("/repos/{}/{}/commits/{}", repo.owner, repo.name, sha);
        let commit: CommitFiles = self.get::<_, ()>(repo, route, None).await?;

        Ok(commit
            .files
            .iter()
            .map(|f| render_file_diff(&f.filename, f.patch.as_deref()))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    async fn list_tags(&self, repo: &RepoId) -> Result<Vec<Tag>, HistoryError> {
        let route = format!("/repos/{}/{}/tags", repo.owner, repo.name);
        let params = PerPage {
            per_page: TAGS_PER_PAGE,
        };
        let tags: Vec<TagItem> = self.get(repo, route, Some(&params)).await?;

        Ok(tags
            .into_iter()
            .map(|t| Tag {
                name: t.name,
                sha: t.commit.sha,
            })
            .collect())
    }

    async fn write_file(
        &self,
        repo: &RepoId,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), HistoryError> {
        let sha = self.existing_file_sha(repo, path).await;
        let route = format!("/repos/{}/{}/contents/{}", repo.owner, repo.name, path);
        let body = PutContent {
            message,
            content: BASE64.encode(content.as_bytes()),
            sha,
        };

        let _: serde_json::Value = self
            .client
            .put(route, Some(&body))
            .await
            .map_err(|e| classify_error(e, repo))?;

        debug!(path, repo = %repo, "Wrote file");
        Ok(())
    }
}
