//! Version suggestion for freeform histories.
//!
//! When no commit carries a conventional type there is nothing for the
//! deterministic bump to go on, so the completion provider is asked to propose
//! the next version directly. Any failure falls back to the deterministic
//! result.

use semver::Version;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::commit::{ParsedCommit, RawCommit, parse_conventional_commits};
use crate::error::CompletionError;
use crate::llm::{
    CompletionProvider, CompletionRequest, ModelSet, ProviderConfig, ResponseFormat,
    parse_json_response, sanitize_for_prompt,
};
use crate::version::bump::{SuggestionSource, VersionSuggestion, suggest_next_version};

const VERSION_SYSTEM_PROMPT: &str = r#"You are a semantic versioning expert.
Respond JSON: {"suggested": "x.y.z", "reason": "brief explanation"}"#;

const VERSION_MAX_TOKENS: u32 = 200;

/// Response from the model for a version suggestion.
#[derive(Deserialize)]
struct VersionResponse {
    suggested: String,
    #[serde(default)]
    reason: String,
}

/// Suggest the next version for a set of commits.
///
/// Uses [`suggest_next_version`] whenever at least one commit has a
/// conventional `type: subject` header, known type or not. Otherwise asks the completion provider; a
/// provider error, unparseable answer or invalid version yields the
/// deterministic result marked [`SuggestionSource::Fallback`].
pub async fn suggest_version(
    commits: &[RawCommit],
    current: Option<&str>,
    completion: &dyn CompletionProvider,
    models: &ModelSet,
) -> VersionSuggestion {
    suggest_version_with_provider(commits, current, completion, models, &ProviderConfig::Hosted)
        .await
}

/// [`suggest_version`] under a caller-chosen credential. A bring-your-own key
/// is sent to its vendor's endpoint with that vendor's model.
pub async fn suggest_version_with_provider(
    commits: &[RawCommit],
    current: Option<&str>,
    completion: &dyn CompletionProvider,
    models: &ModelSet,
    provider: &ProviderConfig,
) -> VersionSuggestion {
    let parsed = parse_conventional_commits(commits);
    let deterministic = suggest_next_version(current, &parsed);

    if parsed.iter().any(ParsedCommit::is_conventional) || commits.is_empty() {
        return deterministic;
    }

    match ask_model(commits, current, completion, models, provider).await {
        Ok((version, reason)) => {
            debug!(%version, "Model suggested version");
            VersionSuggestion {
                version,
                reason,
                source: SuggestionSource::Ai,
            }
        }
        Err(e) => {
            warn!("AI version suggestion failed: {}. Using commit-based bump.", e);
            VersionSuggestion {
                source: SuggestionSource::Fallback,
                ..deterministic
            }
        }
    }
}

async fn ask_model(
    commits: &[RawCommit],
    current: Option<&str>,
    completion: &dyn CompletionProvider,
    models: &ModelSet,
    provider: &ProviderConfig,
) -> Result<(Version, String), CompletionError> {
    let headers = commits
        .iter()
        .map(|c| sanitize_for_prompt(c.header()))
        .collect::<Vec<_>>()
        .join("\n");
    let current = current.map(str::trim).filter(|c| !c.is_empty()).unwrap_or("0.0.0");

    let response = completion
        .complete(CompletionRequest {
            system: VERSION_SYSTEM_PROMPT.to_string(),
            user: format!("Current: {}\nCommits:\n{}", sanitize_for_prompt(current), headers),
            response_format: Some(ResponseFormat::JsonObject),
            temperature: 0.0,
            max_tokens: Some(VERSION_MAX_TOKENS),
            model: provider.fast_model(models),
            credential: provider.credential().cloned(),
        })
        .await?;

    let parsed: VersionResponse = parse_json_response(&response)
        .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

    let raw = parsed.suggested.trim();
    let version = Version::parse(raw.strip_prefix('v').unwrap_or(raw)).map_err(|e| {
        CompletionError::InvalidResponse(format!("'{}' is not a semantic version: {}", raw, e))
    })?;

    let reason = match parsed.reason.trim() {
        "" => "Suggested from commit history".to_string(),
        reason => reason.to_string(),
    };

    Ok((version, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::MockCompletionProvider;

    fn commits(messages: &[&str]) -> Vec<RawCommit> {
        messages
            .iter()
            .enumerate()
            .map(|(i, m)| RawCommit::new(format!("{i:07}"), *m))
            .collect()
    }

    #[tokio::test]
    async fn test_typed_history_never_calls_model() {
        let mut completion = MockCompletionProvider::new();
        completion.expect_complete().never();

        let suggestion = suggest_version(
            &commits(&["feat: add X", "fix: bug Y"]),
            None,
            &completion,
            &ModelSet::default(),
        )
        .await;

        assert_eq!(suggestion.version, Version::new(0, 1, 0));
        assert_eq!(suggestion.source, SuggestionSource::Conventional);
    }

    #[tokio::test]
    async fn test_unknown_type_words_stay_deterministic() {
        let mut completion = MockCompletionProvider::new();
        completion.expect_complete().never();

        let suggestion = suggest_version(
            &commits(&["wip: halfway", "Feat: dark mode"]),
            Some("0.4.0"),
            &completion,
            &ModelSet::default(),
        )
        .await;

        assert_eq!(suggestion.version, Version::new(0, 4, 1));
        assert_eq!(suggestion.source, SuggestionSource::Conventional);
    }

    #[tokio::test]
    async fn test_freeform_history_uses_model() {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .withf(|req| {
                req.user == "Current: 1.4.0\nCommits:\nAdded export\nReworked login"
                    && req.max_tokens == Some(200)
                    && req.response_format == Some(ResponseFormat::JsonObject)
            })
            .times(1)
            .returning(|_| Ok(r#"{"suggested": "1.5.0", "reason": "New export feature"}"#.to_string()));

        let suggestion = suggest_version(
            &commits(&["Added export", "Reworked login"]),
            Some("1.4.0"),
            &completion,
            &ModelSet::default(),
        )
        .await;

        assert_eq!(suggestion.version, Version::new(1, 5, 0));
        assert_eq!(suggestion.reason, "New export feature");
        assert_eq!(suggestion.source, SuggestionSource::Ai);
    }

    #[tokio::test]
    async fn test_vendor_key_routes_to_its_endpoint_and_model() {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .withf(|req| {
                req.model == "claude-3-5-sonnet-20241022"
                    && req.credential.as_ref().is_some_and(|c| {
                        c.api_key == "sk-ant-123" && c.base_url == "https://api.anthropic.com/v1"
                    })
            })
            .times(1)
            .returning(|_| Ok(r#"{"suggested": "2.0.0", "reason": "Rewrite"}"#.to_string()));

        let provider = ProviderConfig::from_api_key(Some("sk-ant-123"), None);
        let suggestion = suggest_version_with_provider(
            &commits(&["Rewrote everything"]),
            Some("1.0.0"),
            &completion,
            &ModelSet::default(),
            &provider,
        )
        .await;

        assert_eq!(suggestion.version, Version::new(2, 0, 0));
        assert_eq!(suggestion.source, SuggestionSource::Ai);
    }

    #[tokio::test]
    async fn test_unparseable_answer_falls_back() {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .returning(|_| Ok("Probably a minor release".to_string()));

        let suggestion = suggest_version(
            &commits(&["Added export"]),
            Some("1.4.0"),
            &completion,
            &ModelSet::default(),
        )
        .await;

        assert_eq!(suggestion.version, Version::new(1, 4, 1));
        assert_eq!(suggestion.source, SuggestionSource::Fallback);
    }

    #[tokio::test]
    async fn test_invalid_semver_falls_back() {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .returning(|_| Ok(r#"{"suggested": "next", "reason": "?"}"#.to_string()));

        let suggestion =
            suggest_version(&commits(&["stuff"]), None, &completion, &ModelSet::default()).await;

        assert_eq!(suggestion.version, Version::new(0, 0, 1));
        assert_eq!(suggestion.source, SuggestionSource::Fallback);
    }

    #[tokio::test]
    async fn test_provider_error_falls_back() {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .returning(|_| Err(CompletionError::MissingApiKey));

        let suggestion = suggest_version(
            &commits(&["Big rewrite\n\nBREAKING CHANGE: new config format"]),
            Some("v2.3.4"),
            &completion,
            &ModelSet::default(),
        )
        .await;

        assert_eq!(suggestion.version, Version::new(3, 0, 0));
        assert_eq!(suggestion.source, SuggestionSource::Fallback);
    }

    #[tokio::test]
    async fn test_v_prefixed_answer_is_accepted() {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .returning(|_| Ok("```json\n{\"suggested\": \"v0.2.0\"}\n```".to_string()));

        let suggestion =
            suggest_version(&commits(&["Added a thing"]), None, &completion, &ModelSet::default()).await;

        assert_eq!(suggestion.version, Version::new(0, 2, 0));
        assert_eq!(suggestion.source, SuggestionSource::Ai);
        assert!(!suggestion.reason.is_empty());
    }
}
