//! Commit history from a local clone using git2-rs.
//!
//! `git2::Repository` is not `Sync`, so [`LocalHistory`] keeps only the path
//! and reopens the repository for each call. No repository handle is held
//! across an `.await`.

pub mod commits;
pub mod diff;
pub mod tags;

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::{Repository, Signature};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::commit::RawCommit;
use crate::error::{GitError, HistoryError};
use crate::history::{CommitQuery, HistoryProvider, RepoId, Tag};

pub use commits::{raw_commit_from_git2, resolve_reference};
pub use diff::commit_diff;
pub use tags::list_tags;

/// [`HistoryProvider`] over a local working copy.
///
/// The `repo` argument of every provider call is ignored; the clone at
/// `path` is the only repository this provider knows.
#[derive(Debug, Clone)]
pub struct LocalHistory {
    path: PathBuf,
}

impl LocalHistory {
    /// Discover the repository containing `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GitError> {
        let repo = Repository::discover(path.as_ref()).map_err(GitError::OpenRepository)?;
        let root = repo.workdir().ok_or(GitError::BareRepository)?.to_path_buf();
        Ok(Self { path: root })
    }

    /// Working directory root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn repo(&self) -> Result<Repository, GitError> {
        Repository::open(&self.path).map_err(GitError::OpenRepository)
    }

    /// URL of the `origin` remote, if configured.
    pub fn origin_url(&self) -> Result<Option<String>, GitError> {
        let repo = self.repo()?;
        let url = match repo.find_remote("origin") {
            Ok(remote) => remote.url().map(str::to_string),
            Err(_) => None,
        };
        Ok(url)
    }

    /// Write `content` to `relative_path` atomically, then commit it on HEAD.
    fn write_and_commit(&self, relative_path: &str, content: &str, message: &str) -> Result<(), GitError> {
        let repo = self.repo()?;
        let target = self.path.join(relative_path);
        let dir = target.parent().unwrap_or(&self.path);

        let mut temp = NamedTempFile::new_in(dir).map_err(GitError::WriteFailed)?;
        temp.write_all(content.as_bytes()).map_err(GitError::WriteFailed)?;
        temp.persist(&target).map_err(|e| GitError::WriteFailed(e.error))?;

        let mut index = repo.index().map_err(GitError::CommitFailed)?;
        index
            .add_path(Path::new(relative_path))
            .map_err(GitError::CommitFailed)?;
        index.write().map_err(GitError::CommitFailed)?;
        let tree_id = index.write_tree().map_err(GitError::CommitFailed)?;
        let tree = repo.find_tree(tree_id).map_err(GitError::CommitFailed)?;

        let signature = repo
            .signature()
            .or_else(|_| Signature::now("gitlog", "gitlog@localhost"))
            .map_err(GitError::CommitFailed)?;
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let oid = repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(GitError::CommitFailed)?;
        debug!(path = relative_path, commit = %oid, "Committed file");
        Ok(())
    }
}

#[async_trait]
impl HistoryProvider for LocalHistory {
    async fn list_commits(
        &self,
        _repo: &RepoId,
        query: &CommitQuery,
    ) -> Result<Vec<RawCommit>, HistoryError> {
        Ok(commits::list_commits(&self.repo()?, query)?)
    }

    async fn compare_refs(
        &self,
        _repo: &RepoId,
        base: &str,
        head: &str,
    ) -> Result<Vec<RawCommit>, HistoryError> {
        Ok(commits::compare_refs(&self.repo()?, base, head)?)
    }

    async fn get_commit_diff(&self, _repo: &RepoId, sha: &str) -> Result<String, HistoryError> {
        Ok(diff::commit_diff(&self.repo()?, sha)?)
    }

    async fn list_tags(&self, _repo: &RepoId) -> Result<Vec<Tag>, HistoryError> {
        Ok(tags::list_tags(&self.repo()?)?)
    }

    async fn write_file(
        &self,
        _repo: &RepoId,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), HistoryError> {
        Ok(self.write_and_commit(path, content, message)?)
    }
}
