//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};

use gitlog::commit::{CommitAuthor, RawCommit};
use gitlog::error::{CompletionError, HistoryError};
use gitlog::git::LocalHistory;
use gitlog::history::{CommitQuery, HistoryProvider, RepoId, Tag};
use gitlog::llm::{CompletionProvider, CompletionRequest};

/// A commit with a SHA, message and optional author login.
pub fn raw_commit(sha: &str, message: &str, login: Option<&str>) -> RawCommit {
    RawCommit {
        author: login.map(|login| CommitAuthor {
            login: Some(login.to_string()),
            ..Default::default()
        }),
        html_url: Some(format!("https://github.com/acme/widgets/commit/{}", sha)),
        ..RawCommit::new(sha, message)
    }
}

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync>;

/// Completion provider that records every request and answers from a closure.
pub struct FakeCompletion {
    responder: Responder,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeCompletion {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with the same text.
    pub fn answering(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Always fails with a non-transient error.
    pub fn failing() -> Self {
        Self::new(|_| Err(CompletionError::EmptyResponse))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> CompletionRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("No completion request was made")
    }
}

#[async_trait]
impl CompletionProvider for FakeCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let answer = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        answer
    }
}

/// In-memory history provider that counts diff fetches.
#[derive(Default)]
pub struct FakeHistory {
    pub commits: Vec<RawCommit>,
    pub diffs: HashMap<String, String>,
    pub tags: Vec<Tag>,
    pub fail_compare: bool,
    diff_fetches: AtomicUsize,
    writes: Mutex<Vec<(String, String, String)>>,
}

impl FakeHistory {
    pub fn with_commits(commits: Vec<RawCommit>) -> Self {
        Self {
            commits,
            ..Default::default()
        }
    }

    pub fn with_diff(mut self, sha: &str, diff: &str) -> Self {
        self.diffs.insert(sha.to_string(), diff.to_string());
        self
    }

    pub fn diff_fetches(&self) -> usize {
        self.diff_fetches.load(Ordering::SeqCst)
    }

    /// `(path, content, message)` for every write.
    pub fn writes(&self) -> Vec<(String, String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryProvider for FakeHistory {
    async fn list_commits(
        &self,
        _repo: &RepoId,
        query: &CommitQuery,
    ) -> Result<Vec<RawCommit>, HistoryError> {
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(self.commits.iter().take(limit).cloned().collect())
    }

    async fn compare_refs(
        &self,
        _repo: &RepoId,
        base: &str,
        head: &str,
    ) -> Result<Vec<RawCommit>, HistoryError> {
        if self.fail_compare {
            return Err(HistoryError::Unavailable(format!("no such range {}...{}", base, head)));
        }
        Ok(self.commits.iter().rev().cloned().collect())
    }

    async fn get_commit_diff(&self, _repo: &RepoId, sha: &str) -> Result<String, HistoryError> {
        self.diff_fetches.fetch_add(1, Ordering::SeqCst);
        self.diffs
            .get(sha)
            .cloned()
            .ok_or_else(|| HistoryError::Unavailable(format!("no diff for {}", sha)))
    }

    async fn list_tags(&self, _repo: &RepoId) -> Result<Vec<Tag>, HistoryError> {
        Ok(self.tags.clone())
    }

    async fn write_file(
        &self,
        _repo: &RepoId,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), HistoryError> {
        self.writes
            .lock()
            .unwrap()
            .push((path.to_string(), content.to_string(), message.to_string()));
        Ok(())
    }
}

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");

        let mut config = repo.config().expect("Failed to open repo config");
        config.set_str("user.name", "Test User").expect("Failed to set user.name");
        config
            .set_str("user.email", "test@example.com")
            .expect("Failed to set user.email");

        Self { dir, repo }
    }

    /// A [`LocalHistory`] over this repository.
    pub fn history(&self) -> LocalHistory {
        LocalHistory::open(self.dir.path()).expect("Failed to open local history")
    }

    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Create a commit with the given message. Returns the commit OID.
    pub fn commit(&self, message: &str) -> Oid {
        let content = format!(
            "{}\n{}",
            message,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        );
        self.commit_file("test.txt", &content, message)
    }

    /// Write `content` to `file` and commit it. Returns the commit OID.
    pub fn commit_file(&self, file: &str, content: &str, message: &str) -> Oid {
        let sig = self.signature();

        std::fs::write(self.dir.path().join(file), content).expect("Failed to write test file");

        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(file)).expect("Failed to add file");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Create a lightweight tag pointing to the given OID.
    pub fn tag_lightweight(&self, name: &str, oid: Oid) {
        let obj = self.repo.find_object(oid, None).expect("Failed to find object");
        self.repo
            .tag_lightweight(name, &obj, false)
            .expect("Failed to create lightweight tag");
    }

    /// Create an annotated tag pointing to the given OID.
    pub fn tag_annotated(&self, name: &str, oid: Oid, message: &str) {
        let sig = self.signature();
        let obj = self.repo.find_object(oid, None).expect("Failed to find object");
        self.repo
            .tag(name, &obj, &sig, message, false)
            .expect("Failed to create annotated tag");
    }
}
