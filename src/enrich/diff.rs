//! Rewrite vague commit messages from their diffs.

use std::collections::HashMap;
use std::fmt;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::commit::RawCommit;
use crate::history::{HistoryProvider, RepoId};
use crate::llm::{CompletionProvider, CompletionRequest, ModelSet, sanitize_for_prompt, truncate_chars};

/// Commits enriched concurrently. Groups run one after another.
pub const ENRICH_CHUNK_SIZE: usize = 3;

/// Diffs longer than this (in characters) are not sent for rewriting.
pub const MAX_DIFF_CHARS: usize = 6000;

/// Characters of the diff included in the rewrite prompt.
pub const DIFF_PROMPT_CHARS: usize = 3000;

const REWRITE_SYSTEM_PROMPT: &str =
    "Summarize this git diff into a single concise conventional commit message. Output ONLY the message.";

/// Replacement text for one vague commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedDescription {
    pub text: String,
    /// False when the original message was kept.
    pub rewritten: bool,
}

impl EnrichedDescription {
    fn original(commit: &RawCommit) -> Self {
        Self {
            text: commit.message.clone(),
            rewritten: false,
        }
    }
}

/// Descriptions keyed by full SHA.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub descriptions: HashMap<String, EnrichedDescription>,
    /// Commits whose diff fetch or rewrite failed.
    pub fallbacks: usize,
}

impl Enrichment {
    /// The rewritten text for a SHA, if the model produced one.
    pub fn rewritten(&self, sha: &str) -> Option<&str> {
        self.descriptions
            .get(sha)
            .filter(|d| d.rewritten)
            .map(|d| d.text.as_str())
    }

    /// Number of commits that were actually rewritten.
    pub fn rewritten_count(&self) -> usize {
        self.descriptions.values().filter(|d| d.rewritten).count()
    }
}

enum Outcome {
    Rewritten(String),
    Skipped,
    Failed,
}

/// Rewrite each vague commit from its diff.
///
/// Commits are processed in groups of [`ENRICH_CHUNK_SIZE`], all members of a
/// group in flight together. A commit whose diff is empty or longer than
/// [`MAX_DIFF_CHARS`] keeps its message. Any failure affects only its own
/// commit, which also keeps its message.
pub async fn enrich_vague_commits(
    repo: &RepoId,
    vague: &[&RawCommit],
    history: &dyn HistoryProvider,
    completion: &dyn CompletionProvider,
    models: &ModelSet,
) -> Enrichment {
    let mut enrichment = Enrichment::default();

    for chunk in vague.chunks(ENRICH_CHUNK_SIZE) {
        let outcomes = join_all(
            chunk
                .iter()
                .map(|commit| enrich_one(repo, commit, history, completion, models)),
        )
        .await;

        for (commit, outcome) in chunk.iter().zip(outcomes) {
            let description = match outcome {
                Outcome::Rewritten(text) => EnrichedDescription {
                    text,
                    rewritten: true,
                },
                Outcome::Skipped => EnrichedDescription::original(commit),
                Outcome::Failed => {
                    enrichment.fallbacks += 1;
                    EnrichedDescription::original(commit)
                }
            };
            enrichment.descriptions.insert(commit.sha.clone(), description);
        }
    }

    debug!(
        rewritten = enrichment.rewritten_count(),
        fallbacks = enrichment.fallbacks,
        "Enriched vague commits"
    );
    enrichment
}

async fn enrich_one(
    repo: &RepoId,
    commit: &RawCommit,
    history: &dyn HistoryProvider,
    completion: &dyn CompletionProvider,
    models: &ModelSet,
) -> Outcome {
    let diff = match history.get_commit_diff(repo, &commit.sha).await {
        Ok(diff) => diff,
        Err(e) => return log_failure(commit, &e),
    };

    if diff.is_empty() || diff.chars().count() > MAX_DIFF_CHARS {
        debug!(sha = %commit.short_sha(), len = diff.len(), "Diff empty or too large, keeping message");
        return Outcome::Skipped;
    }

    let user = format!(
        "Message: {}\n\nDiff:\n{}",
        sanitize_for_prompt(&commit.message),
        truncate_chars(&diff, DIFF_PROMPT_CHARS)
    );

    let request = CompletionRequest {
        system: REWRITE_SYSTEM_PROMPT.to_string(),
        user,
        response_format: None,
        temperature: 0.1,
        max_tokens: None,
        model: models.fast.clone(),
        credential: None,
    };

    match completion.complete(request).await {
        Ok(answer) => match answer.lines().map(str::trim).find(|l| !l.is_empty()) {
            Some(line) => Outcome::Rewritten(line.to_string()),
            None => {
                warn!("Empty rewrite for {}, keeping original message", commit.short_sha());
                Outcome::Failed
            }
        },
        Err(e) => log_failure(commit, &e),
    }
}

fn log_failure(commit: &RawCommit, error: &impl fmt::Display) -> Outcome {
    warn!("Diff analysis failed for {}: {}", commit.short_sha(), error);
    Outcome::Failed
}
