//! Error types for gitlog modules using thiserror.

use thiserror::Error;

/// Errors in caller-supplied input. Reported immediately, never retried.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("Invalid repository format: {0}. Expected 'owner/repo'.")]
    InvalidRepository(String),

    #[error("Unknown changelog format '{0}'. Expected one of: keepachangelog, github_release, simple, custom")]
    UnknownFormat(String),
}

/// Errors from local git operations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to open repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Failed to find reference '{0}': {1}")]
    ReferenceNotFound(String, #[source] git2::Error),

    #[error("Failed to parse commit: {0}")]
    ParseCommit(#[source] git2::Error),

    #[error("Failed to walk commit history: {0}")]
    RevwalkError(#[source] git2::Error),

    #[error("Failed to compute diff: {0}")]
    DiffFailed(#[source] git2::Error),

    #[error("Repository has no working directory (bare repository)")]
    BareRepository,

    #[error("Failed to write file: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("Failed to commit file: {0}")]
    CommitFailed(#[source] git2::Error),
}

/// Errors from GitHub API operations.
#[derive(Error, Debug)]
pub enum GitHubError {
    #[error(
        "GitHub authentication failed: no valid auth found. Run 'gh auth login' or set GITHUB_TOKEN environment variable"
    )]
    AuthenticationFailed,

    #[error("Failed to build GitHub client: {0}")]
    ClientBuild(#[source] Box<octocrab::Error>),

    #[error("GitHub request failed: {0}")]
    Request(#[source] Box<octocrab::Error>),

    #[error("Rate limited by GitHub API. Resets at: {reset_time}")]
    RateLimited { reset_time: String },

    #[error("Repository or ref not found: {owner}/{repo}")]
    RepositoryNotFound { owner: String, repo: String },

    #[error("Failed to parse repository URL")]
    InvalidRepositoryUrl,
}

/// Errors surfaced by any history provider.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("History provider unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the text-completion provider.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("No API key configured for the completion provider. Set OPENROUTER_API_KEY or supply a key")]
    MissingApiKey,

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Completion request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Completion request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Completion endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Completion endpoint returned an unreadable response: {0}")]
    InvalidResponse(String),

    #[error("Completion endpoint returned no content")]
    EmptyResponse,

    #[error("All retry attempts failed: {0}")]
    RetriesExhausted(#[source] Box<CompletionError>),
}

impl CompletionError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Timeout(_) => true,
            CompletionError::Request(e) => e.is_connect() || e.is_timeout(),
            CompletionError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Errors from changelog generation.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("No commits found in the specified range. Try a different range.")]
    NoCommits,

    #[error("The custom format requires a template")]
    MissingTemplate,

    #[error("Failed to generate changelog: {0}")]
    Completion(#[source] CompletionError),
}
