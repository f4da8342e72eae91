//! Commit walking in a local repository.

use chrono::{DateTime, TimeZone, Utc};
use git2::{Commit, Oid, Repository, Sort};

use crate::commit::{CommitAuthor, RawCommit};
use crate::error::GitError;
use crate::history::CommitQuery;

/// Convert a git2 commit into the provider-neutral shape.
///
/// Local history has no hosting account, so `login` and `html_url` are empty.
pub fn raw_commit_from_git2(commit: &Commit) -> RawCommit {
    let author = commit.author();
    let name = author.name().map(str::to_string);
    let email = author.email().map(str::to_string);
    let authored_at = Utc.timestamp_opt(author.when().seconds(), 0).single();

    RawCommit {
        sha: commit.id().to_string(),
        message: commit.message().unwrap_or("").to_string(),
        author: (name.is_some() || email.is_some()).then(|| CommitAuthor {
            login: None,
            name,
            email,
            avatar_url: None,
        }),
        html_url: None,
        authored_at,
    }
}

/// Resolve a reference (tag, branch, commit hash) to a commit OID.
pub fn resolve_reference(repo: &Repository, reference: &str) -> Result<Oid, GitError> {
    if let Ok(oid) = Oid::from_str(reference)
        && repo.find_commit(oid).is_ok()
    {
        return Ok(oid);
    }

    let object = repo
        .revparse_single(reference)
        .map_err(|e| GitError::ReferenceNotFound(reference.to_string(), e))?;
    Ok(object.peel_to_commit().map_err(GitError::ParseCommit)?.id())
}

/// List commits reachable from the query's reference (or HEAD), newest first.
pub fn list_commits(repo: &Repository, query: &CommitQuery) -> Result<Vec<RawCommit>, GitError> {
    let start = resolve_reference(repo, query.reference.as_deref().unwrap_or("HEAD"))?;

    let mut revwalk = repo.revwalk().map_err(GitError::RevwalkError)?;
    revwalk.push(start).map_err(GitError::RevwalkError)?;
    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
        .map_err(GitError::RevwalkError)?;

    let limit = query.limit.unwrap_or(usize::MAX);
    let mut commits = Vec::new();

    for oid in revwalk {
        let oid = oid.map_err(GitError::RevwalkError)?;
        let commit = repo.find_commit(oid).map_err(GitError::ParseCommit)?;
        let raw = raw_commit_from_git2(&commit);

        if !in_window(raw.authored_at, query.since, query.until) {
            continue;
        }

        commits.push(raw);
        if commits.len() >= limit {
            break;
        }
    }

    Ok(commits)
}

/// Commits reachable from `head` but not from `base`, oldest first.
pub fn compare_refs(repo: &Repository, base: &str, head: &str) -> Result<Vec<RawCommit>, GitError> {
    let base_oid = resolve_reference(repo, base)?;
    let head_oid = resolve_reference(repo, head)?;

    let mut revwalk = repo.revwalk().map_err(GitError::RevwalkError)?;
    revwalk.push(head_oid).map_err(GitError::RevwalkError)?;
    revwalk.hide(base_oid).map_err(GitError::RevwalkError)?;
    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)
        .map_err(GitError::RevwalkError)?;

    revwalk
        .map(|oid| {
            let oid = oid.map_err(GitError::RevwalkError)?;
            let commit = repo.find_commit(oid).map_err(GitError::ParseCommit)?;
            Ok(raw_commit_from_git2(&commit))
        })
        .collect()
}

fn in_window(
    at: Option<DateTime<Utc>>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> bool {
    let Some(at) = at else {
        return since.is_none() && until.is_none();
    };
    since.is_none_or(|s| at >= s) && until.is_none_or(|u| at <= u)
}
