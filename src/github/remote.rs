//! Repository identity from a git remote URL.

use crate::error::GitHubError;
use crate::history::RepoId;

/// Extract `owner/repo` from a GitHub remote URL (SSH or HTTPS).
pub fn parse_github_remote(url: &str) -> Result<RepoId, GitHubError> {
    let url = url.trim();

    if let Some(path) = url.strip_prefix("git@github.com:") {
        return parse_owner_repo_path(path);
    }

    if let Some((_, path)) = url.split_once("github.com/") {
        return parse_owner_repo_path(path);
    }

    Err(GitHubError::InvalidRepositoryUrl)
}

fn parse_owner_repo_path(path: &str) -> Result<RepoId, GitHubError> {
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.split('/');

    match (parts.next(), parts.next()) {
        (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => {
            Ok(RepoId::new(owner, name))
        }
        _ => Err(GitHubError::InvalidRepositoryUrl),
    }
}
