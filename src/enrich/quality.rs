//! Clear/vague judgment for commits that carry no conventional type.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::commit::RawCommit;
use crate::error::CompletionError;
use crate::llm::{
    CompletionProvider, CompletionRequest, ModelSet, ResponseFormat, parse_json_response,
    sanitize_for_prompt,
};

/// Commits sent to the completion provider in one batch. Later commits are
/// labelled `Clear` without being looked at.
pub const QUALITY_SAMPLE_SIZE: usize = 50;

/// Messages shorter than this (in characters) are vague.
const MIN_CLEAR_LENGTH: usize = 10;

/// Whole messages that say nothing about the change.
const VAGUE_MESSAGES: [&str; 4] = ["fix", "update", "wip", "stuff"];

const QUALITY_SYSTEM_PROMPT: &str = r#"Classify each commit as "clear" or "vague"(e.g. "fix", "wip").
Respond in JSON: {"lines": [{"sha": "short_sha", "status": "clear" | "vague"}]}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLabel {
    Clear,
    Vague,
}

/// Labels keyed by full SHA.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualityAssessment {
    pub labels: HashMap<String, QualityLabel>,
    /// True when the completion path failed and the heuristic decided.
    pub fallback_applied: bool,
}

impl QualityAssessment {
    /// Label for a SHA; unknown SHAs are clear.
    pub fn label(&self, sha: &str) -> QualityLabel {
        self.labels.get(sha).copied().unwrap_or(QualityLabel::Clear)
    }

    pub fn is_vague(&self, sha: &str) -> bool {
        self.label(sha) == QualityLabel::Vague
    }
}

#[derive(Debug, Deserialize)]
struct QualityResponse {
    #[serde(default)]
    lines: Vec<QualityLine>,
}

#[derive(Debug, Deserialize)]
struct QualityLine {
    sha: String,
    status: String,
}

/// Local judgment used when the completion provider is unavailable.
///
/// Matching is exact after lowercasing the whole message, so `Fix` is vague
/// but `fix!` or `wip: more` are judged by length alone.
pub fn heuristic_label(message: &str) -> QualityLabel {
    let lowered = message.to_lowercase();
    if lowered.chars().count() < MIN_CLEAR_LENGTH || VAGUE_MESSAGES.contains(&lowered.as_str()) {
        QualityLabel::Vague
    } else {
        QualityLabel::Clear
    }
}

/// Label each commit clear or vague.
///
/// One batched completion call covers the first [`QUALITY_SAMPLE_SIZE`]
/// commits. If that call fails or its answer cannot be parsed, every commit is
/// labelled by [`heuristic_label`] instead. Never fails.
pub async fn assess_quality(
    commits: &[&RawCommit],
    completion: &dyn CompletionProvider,
    models: &ModelSet,
) -> QualityAssessment {
    if commits.is_empty() {
        return QualityAssessment::default();
    }

    match classify_with_model(commits, completion, models).await {
        Ok(labels) => {
            debug!(
                vague = labels.values().filter(|l| **l == QualityLabel::Vague).count(),
                total = labels.len(),
                "Assessed commit quality"
            );
            QualityAssessment {
                labels,
                fallback_applied: false,
            }
        }
        Err(e) => {
            warn!("Quality assessment failed: {}. Falling back to heuristic.", e);
            QualityAssessment {
                labels: commits
                    .iter()
                    .map(|c| (c.sha.clone(), heuristic_label(&c.message)))
                    .collect(),
                fallback_applied: true,
            }
        }
    }
}

async fn classify_with_model(
    commits: &[&RawCommit],
    completion: &dyn CompletionProvider,
    models: &ModelSet,
) -> Result<HashMap<String, QualityLabel>, CompletionError> {
    let sample = &commits[..commits.len().min(QUALITY_SAMPLE_SIZE)];
    let subjects = sample
        .iter()
        .map(|c| format!("- {}: {}", c.short_sha(), sanitize_for_prompt(c.header())))
        .collect::<Vec<_>>()
        .join("\n");

    let response = completion
        .complete(CompletionRequest {
            system: QUALITY_SYSTEM_PROMPT.to_string(),
            user: subjects,
            response_format: Some(ResponseFormat::JsonObject),
            temperature: 0.0,
            max_tokens: None,
            model: models.fast.clone(),
            credential: None,
        })
        .await?;

    let parsed: QualityResponse = parse_json_response(&response)
        .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

    let verdicts: HashMap<&str, QualityLabel> = parsed
        .lines
        .iter()
        .map(|line| {
            let label = if line.status.trim().eq_ignore_ascii_case("vague") {
                QualityLabel::Vague
            } else {
                QualityLabel::Clear
            };
            (line.sha.trim(), label)
        })
        .collect();

    Ok(commits
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let label = if i < QUALITY_SAMPLE_SIZE {
                verdicts
                    .get(c.short_sha())
                    .copied()
                    .unwrap_or(QualityLabel::Clear)
            } else {
                QualityLabel::Clear
            };
            (c.sha.clone(), label)
        })
        .collect())
}
