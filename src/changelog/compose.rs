//! Changelog synthesis: the end-to-end generation pipeline.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{Fingerprint, GenerationCache};
use crate::commit::{ParsedCommit, RawCommit, categorize_by, parse_conventional_commits};
use crate::enrich::{Enrichment, assess_quality, enrich_vague_commits};
use crate::error::GenerateError;
use crate::history::{HistoryProvider, RepoId};
use crate::llm::{
    CompletionProvider, CompletionRequest, ModelSet, ProviderConfig, sanitize_for_prompt,
    truncate_chars,
};

use super::contributors::{contributors_list, contributors_section};
use super::format::{ChangelogFormat, OutputLanguage};
use super::template::{has_placeholder, render_template};

/// Temperature of the synthesis call.
pub const SYNTHESIS_TEMPERATURE: f32 = 0.3;

/// Token cap of the synthesis call.
pub const SYNTHESIS_MAX_TOKENS: u32 = 2500;

/// Maintainer comments longer than this are cut before prompting.
pub const MAX_COMMENT_CHARS: usize = 2000;

const WRITER_PREAMBLE: &str = "You are an expert technical writer. Transform git commits into proper changelogs.
Rules: Clear language, combine related, highlight breaking (⚠️), Markdown only.";

const CUSTOM_TEMPLATE_PREAMBLE: &str = "Fill in the template below. Replace every remaining {{placeholder}} using the commits and keep all other text as written.";

/// Access the request carries beyond the commits themselves.
#[derive(Default)]
pub struct Credentials<'a> {
    /// History access for diff enrichment. Without it, vague commits are
    /// passed through unchanged.
    pub history: Option<&'a dyn HistoryProvider>,
    /// Which key and model the synthesis call runs under.
    pub completion: ProviderConfig,
}

/// Everything one generation needs.
pub struct GenerateRequest<'a> {
    pub commits: &'a [RawCommit],
    pub format: ChangelogFormat,
    /// `owner/repo`.
    pub repo_name: &'a str,
    pub version: Option<&'a str>,
    /// Free-form maintainer note passed to the writer.
    pub comment: Option<&'a str>,
    /// Required when `format` is [`ChangelogFormat::Custom`].
    pub custom_template: Option<&'a str>,
    pub output_language: OutputLanguage,
    pub include_authors: bool,
    pub credentials: Credentials<'a>,
}

impl<'a> GenerateRequest<'a> {
    /// A Keep a Changelog request in English with contributors and no credentials.
    pub fn new(commits: &'a [RawCommit], repo_name: &'a str) -> Self {
        Self {
            commits,
            format: ChangelogFormat::default(),
            repo_name,
            version: None,
            comment: None,
            custom_template: None,
            output_language: OutputLanguage::default(),
            include_authors: true,
            credentials: Credentials::default(),
        }
    }

    pub fn format(mut self, format: ChangelogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn version(mut self, version: Option<&'a str>) -> Self {
        self.version = version;
        self
    }

    pub fn comment(mut self, comment: Option<&'a str>) -> Self {
        self.comment = comment;
        self
    }

    pub fn custom_template(mut self, template: Option<&'a str>) -> Self {
        self.custom_template = template;
        self
    }

    pub fn output_language(mut self, language: OutputLanguage) -> Self {
        self.output_language = language;
        self
    }

    pub fn include_authors(mut self, include: bool) -> Self {
        self.include_authors = include;
        self
    }

    pub fn history(mut self, history: &'a dyn HistoryProvider) -> Self {
        self.credentials.history = Some(history);
        self
    }

    pub fn provider(mut self, config: ProviderConfig) -> Self {
        self.credentials.completion = config;
        self
    }
}

/// How a generation went, beyond its text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Served from the cache with no provider call.
    pub cache_hit: bool,
    /// Quality labels came from the heuristic instead of the model.
    pub quality_fallback: bool,
    /// Commits whose description the model rewrote from the diff.
    pub enriched: usize,
    /// Vague commits that kept their original message because enrichment failed.
    pub enrichment_fallbacks: usize,
}

/// A generated changelog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangelogResult {
    pub text: String,
    pub commit_count: usize,
    pub format: ChangelogFormat,
    pub version: Option<String>,
    pub report: GenerationReport,
}

/// Turns commits into a changelog through one synthesis call, with
/// quality assessment and diff enrichment for poorly described commits.
pub struct ChangelogComposer {
    completion: Arc<dyn CompletionProvider>,
    cache: Arc<GenerationCache>,
    models: ModelSet,
}

impl ChangelogComposer {
    pub fn new(completion: Arc<dyn CompletionProvider>, cache: Arc<GenerationCache>) -> Self {
        Self {
            completion,
            cache,
            models: ModelSet::default(),
        }
    }

    pub fn with_models(mut self, models: ModelSet) -> Self {
        self.models = models;
        self
    }

    pub fn cache(&self) -> &GenerationCache {
        &self.cache
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    /// Generate a changelog.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::NoCommits`] for an empty commit list,
    /// [`GenerateError::MissingTemplate`] for a custom format without a
    /// template, and [`GenerateError::Completion`] when the synthesis call
    /// fails. Assessment and enrichment failures degrade instead of failing
    /// and are counted in the [`GenerationReport`].
    pub async fn generate(
        &self,
        request: GenerateRequest<'_>,
    ) -> Result<ChangelogResult, GenerateError> {
        let commits = request.commits;
        if commits.is_empty() {
            return Err(GenerateError::NoCommits);
        }

        let template = match request.format {
            ChangelogFormat::Custom => Some(
                request
                    .custom_template
                    .filter(|t| !t.trim().is_empty())
                    .ok_or(GenerateError::MissingTemplate)?,
            ),
            _ => None,
        };

        let shas: Vec<&str> = commits.iter().map(|c| c.sha.as_str()).collect();
        let fingerprint = Fingerprint::compute(
            &shas,
            request.format.id(),
            request.version,
            request.output_language.code(),
        )
        .with_template(template);

        let mut report = GenerationReport::default();

        if let Some(body) = self.cache.get(&fingerprint) {
            debug!(key = %fingerprint, "Changelog served from cache");
            report.cache_hit = true;
            return Ok(ChangelogResult {
                text: append_contributors(body, &request, template),
                commit_count: commits.len(),
                format: request.format,
                version: request.version.map(str::to_string),
                report,
            });
        }

        let parsed = parse_conventional_commits(commits);
        let candidates: Vec<&RawCommit> = commits
            .iter()
            .zip(&parsed)
            .filter(|(_, p)| !p.is_conventional())
            .map(|(c, _)| c)
            .collect();

        let mut enrichment = Enrichment::default();
        if let Some(history) = request.credentials.history
            && !candidates.is_empty()
        {
            match RepoId::parse(request.repo_name) {
                Ok(repo) => {
                    let quality =
                        assess_quality(&candidates, self.completion.as_ref(), &self.models).await;
                    report.quality_fallback = quality.fallback_applied;

                    let vague: Vec<&RawCommit> = candidates
                        .iter()
                        .copied()
                        .filter(|c| quality.is_vague(&c.sha))
                        .collect();
                    if !vague.is_empty() {
                        enrichment = enrich_vague_commits(
                            &repo,
                            &vague,
                            history,
                            self.completion.as_ref(),
                            &self.models,
                        )
                        .await;
                    }
                }
                Err(e) => {
                    warn!("Skipping commit enrichment: {}", e);
                    enrichment.fallbacks = candidates.len();
                }
            }
        }
        report.enriched = enrichment.rewritten_count();
        report.enrichment_fallbacks = enrichment.fallbacks;

        let entries: Vec<(&RawCommit, &ParsedCommit)> = commits.iter().zip(&parsed).collect();
        let summary = build_summary(&entries, &enrichment);

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let instructions = match template {
            Some(template) => {
                let contributors = contributors_list(commits);
                let filled = render_template(
                    template,
                    &[
                        ("version", request.version.unwrap_or("")),
                        ("date", &date),
                        ("repository", request.repo_name),
                        ("contributors", &contributors),
                    ],
                );
                format!("{}\n\n{}", CUSTOM_TEMPLATE_PREAMBLE, filled)
            }
            None => request
                .format
                .instructions()
                .unwrap_or_default()
                .to_string(),
        };

        let system = build_system_prompt(&instructions, &request.output_language);
        let user = build_user_prompt(
            request.repo_name,
            request.version,
            &date,
            &summary,
            request.comment,
        );

        let provider = &request.credentials.completion;
        let model = provider.model(&self.models);
        info!(
            commits = commits.len(),
            format = %request.format,
            model = %model,
            "Generating changelog"
        );

        let body = self
            .completion
            .complete(CompletionRequest {
                system,
                user,
                response_format: None,
                temperature: SYNTHESIS_TEMPERATURE,
                max_tokens: Some(SYNTHESIS_MAX_TOKENS),
                model,
                credential: provider.credential().cloned(),
            })
            .await
            .map_err(GenerateError::Completion)?;

        // The cached body never carries the contributors section, so
        // `include_authors` can differ between hits.
        self.cache.insert(fingerprint, body.clone());

        Ok(ChangelogResult {
            text: append_contributors(body, &request, template),
            commit_count: commits.len(),
            format: request.format,
            version: request.version.map(str::to_string),
            report,
        })
    }
}

/// Generate a changelog and return only its text.
pub async fn generate_changelog(
    composer: &ChangelogComposer,
    request: GenerateRequest<'_>,
) -> Result<String, GenerateError> {
    composer.generate(request).await.map(|result| result.text)
}

/// Add the contributors section unless the request turned it off or the
/// custom template already lists them.
fn append_contributors(body: String, request: &GenerateRequest<'_>, template: Option<&str>) -> String {
    if !request.include_authors || template.is_some_and(|t| has_placeholder(t, "contributors")) {
        return body;
    }
    match contributors_section(request.commits, &request.output_language) {
        Some(section) => format!("{}\n\n{}", body, section),
        None => body,
    }
}

/// The per-category commit listing handed to the writer.
///
/// ```text
/// FEAT (2):
///   - add export ([commit](https://…))
///   - (AI Refined) handle empty config files
/// ```
fn build_summary(entries: &[(&RawCommit, &ParsedCommit)], enrichment: &Enrichment) -> String {
    let grouped = categorize_by(entries, |entry| entry.1);

    grouped
        .non_empty()
        .map(|(category, items)| {
            let lines = items
                .iter()
                .map(|(commit, parsed)| {
                    let desc = match enrichment.rewritten(&commit.sha) {
                        Some(text) => format!("(AI Refined) {}", sanitize_for_prompt(text)),
                        None => sanitize_for_prompt(parsed.display_subject()),
                    };
                    match &commit.html_url {
                        Some(url) => format!("  - {} ([commit]({}))", desc, url),
                        None => format!("  - {}", desc),
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "{} ({}):\n{}",
                category.as_str().to_uppercase(),
                items.len(),
                lines
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn build_system_prompt(instructions: &str, language: &OutputLanguage) -> String {
    let mut prompt = format!("{}\n\nFormat Instructions: {}", WRITER_PREAMBLE, instructions);
    if let Some(directive) = language.directive() {
        prompt.push_str("\n\n");
        prompt.push_str(&directive);
    }
    prompt
}

fn build_user_prompt(
    repo_name: &str,
    version: Option<&str>,
    date: &str,
    summary: &str,
    comment: Option<&str>,
) -> String {
    let mut prompt = format!("Repository: {}\n", repo_name);
    if let Some(version) = version {
        prompt.push_str(&format!("Version: {}\n", version));
    }
    prompt.push_str(&format!("Date: {}\n\nCommits:\n{}\n\n", date, summary));

    if let Some(comment) = comment.map(str::trim).filter(|c| !c.is_empty()) {
        let comment = sanitize_for_prompt(truncate_chars(comment, MAX_COMMENT_CHARS));
        prompt.push_str(&format!("Maintainer Comment:\n{}\n\n", comment));
    }

    prompt.push_str("Generate the changelog now:");
    prompt
}
