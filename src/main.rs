//! gitlog - CLI entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use gitlog::cache::GenerationCache;
use gitlog::changelog::{
    ChangelogComposer, ChangelogFormat, GenerateRequest, OutputLanguage, PublishOutcome,
    publish_changelog,
};
use gitlog::commit::{parse_commit_message, parse_conventional_commits};
use gitlog::config::Settings;
use gitlog::git::LocalHistory;
use gitlog::github::{GitHubHistory, get_github_token, parse_github_remote};
use gitlog::history::{
    CommitSelection, HistoryProvider, RepoId, fetch_commits, latest_release_tag,
};
use gitlog::llm::{CompletionClient, ProviderConfig};
use gitlog::version::suggest_version_with_provider;

/// Generate changelogs from commit history.
#[derive(Parser, Debug)]
#[command(name = "gitlog")]
#[command(about = "Generate changelogs from commit history")]
#[command(version)]
struct Cli {
    /// Read history from GitHub instead of a local clone (owner/repo)
    #[arg(long, global = true)]
    github: Option<String>,

    /// Path inside the local repository
    #[arg(long, global = true, default_value = ".")]
    path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a changelog for a range of commits
    Generate(GenerateArgs),
    /// Suggest the next semantic version
    SuggestVersion {
        /// Current version (defaults to the latest release tag)
        #[arg(long)]
        current: Option<String>,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        key: KeyArgs,
    },
    /// Parse commit messages as conventional commits and print JSON
    Parse {
        /// Messages to parse. Without any, the selected commits are parsed.
        messages: Vec<String>,

        #[command(flatten)]
        range: RangeArgs,
    },
    /// List tags, newest release first
    Tags,
}

#[derive(Args, Debug)]
struct RangeArgs {
    /// Start of commit range (tag, commit hash, or branch)
    #[arg(long)]
    from: Option<String>,

    /// End of commit range
    #[arg(long, default_value = "HEAD")]
    to: String,

    /// Only commits authored at or after this time (RFC 3339)
    #[arg(long, conflicts_with = "from")]
    since: Option<DateTime<Utc>>,

    /// Only commits authored at or before this time (RFC 3339)
    #[arg(long, conflicts_with = "from")]
    until: Option<DateTime<Utc>>,
}

impl RangeArgs {
    fn selection(&self) -> CommitSelection {
        match (&self.from, self.since, self.until) {
            (Some(from), _, _) => CommitSelection::Refs {
                from: from.clone(),
                to: self.to.clone(),
            },
            (None, None, None) => CommitSelection::Recent,
            (None, since, until) => CommitSelection::Window { since, until },
        }
    }
}

#[derive(Args, Debug)]
struct KeyArgs {
    /// Your own API key (OpenRouter, OpenAI or Anthropic)
    #[arg(long)]
    api_key: Option<String>,

    /// Endpoint for --api-key (OpenAI-compatible)
    #[arg(long, requires = "api_key")]
    base_url: Option<String>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    range: RangeArgs,

    #[command(flatten)]
    key: KeyArgs,

    /// Output format: keepachangelog, github_release, simple, custom
    #[arg(long, default_value = "keepachangelog")]
    format: ChangelogFormat,

    /// Template file for --format custom
    #[arg(long)]
    template: Option<PathBuf>,

    /// Version being released
    #[arg(long = "set-version")]
    version: Option<String>,

    /// Note from the maintainer passed to the writer
    #[arg(long)]
    comment: Option<String>,

    /// Output language (ISO 639-1 code)
    #[arg(long, default_value = "en")]
    language: String,

    /// Omit the contributors section
    #[arg(long)]
    no_authors: bool,

    /// Skip diff-based rewriting of vague commits
    #[arg(long)]
    no_enrich: bool,

    /// Print the result and generation report as JSON
    #[arg(long)]
    json: bool,

    /// Commit the changelog to CHANGELOG.md
    #[arg(long)]
    publish: bool,
}

/// Where history is read from, and which repository it belongs to.
struct Source {
    history: Box<dyn HistoryProvider>,
    repo: RepoId,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let source = open_source(&cli)?;

    match cli.command {
        Command::Generate(args) => run_generate(&source, args).await,
        Command::SuggestVersion {
            current,
            range,
            key,
        } => run_suggest_version(&source, current, &range, &key).await,
        Command::Parse { messages, range } => run_parse(&source, messages, &range).await,
        Command::Tags => run_tags(&source).await,
    }
}

/// Console logging controlled by RUST_LOG (default: warn).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}

fn open_source(cli: &Cli) -> Result<Source> {
    if let Some(name) = &cli.github {
        let repo = RepoId::parse(name)?;
        let token = get_github_token().context("GitHub authentication required")?;
        let history = GitHubHistory::new(&token).context("Failed to create GitHub client")?;
        return Ok(Source {
            history: Box::new(history),
            repo,
        });
    }

    let local = LocalHistory::open(&cli.path)
        .context("Not a git repository. Run gitlog from within a git repository or pass --github.")?;

    let repo = local
        .origin_url()?
        .and_then(|url| parse_github_remote(&url).ok())
        .unwrap_or_else(|| {
            let name = local
                .path()
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("repository");
            RepoId::new("local", name)
        });

    Ok(Source {
        history: Box::new(local),
        repo,
    })
}

async fn fetch(source: &Source, range: &RangeArgs) -> Result<Vec<gitlog::RawCommit>> {
    let fetched = fetch_commits(source.history.as_ref(), &source.repo, &range.selection())
        .await
        .context("Failed to fetch commits")?;

    if fetched.fallback_applied {
        eprintln!(
            "Warning: Could not compare the requested range. Using the latest {} commits instead.",
            fetched.commits.len()
        );
    }
    Ok(fetched.commits)
}

fn completion_client(settings: &Settings) -> Result<CompletionClient> {
    CompletionClient::new(settings).context("Failed to create completion client")
}

async fn run_generate(source: &Source, args: GenerateArgs) -> Result<()> {
    let settings = Settings::from_env();
    let client = completion_client(&settings)?;
    let cache = GenerationCache::from_settings(&settings);
    let composer = ChangelogComposer::new(Arc::new(client), Arc::new(cache))
        .with_models(settings.models.clone());

    let template = match &args.template {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read template {}", path.display()))?,
        ),
        None => None,
    };

    let commits = fetch(source, &args.range).await?;
    if commits.is_empty() {
        bail!("No commits found in the specified range");
    }
    eprintln!("Found {} commits", commits.len());

    let repo_name = source.repo.to_string();
    let provider = ProviderConfig::from_api_key(args.key.api_key.as_deref(), args.key.base_url.as_deref());

    let mut request = GenerateRequest::new(&commits, &repo_name)
        .format(args.format)
        .version(args.version.as_deref())
        .comment(args.comment.as_deref())
        .custom_template(template.as_deref())
        .output_language(OutputLanguage::new(&args.language))
        .include_authors(!args.no_authors)
        .provider(provider);
    if !args.no_enrich {
        request = request.history(source.history.as_ref());
    }

    let result = composer
        .generate(request)
        .await
        .context("Failed to generate changelog")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.text);
    }

    let report = result.report;
    if report.enrichment_fallbacks > 0 || report.quality_fallback {
        eprintln!(
            "Warning: {} commit(s) kept their original message (quality heuristic used: {})",
            report.enrichment_fallbacks, report.quality_fallback
        );
    }

    if args.publish {
        match publish_changelog(
            source.history.as_ref(),
            &source.repo,
            &result.text,
            result.version.as_deref(),
        )
        .await
        {
            PublishOutcome::Published { path } => eprintln!("✓ Published {}", path),
            PublishOutcome::Failed { reason } => {
                eprintln!("Warning: Changelog generated but not published: {}", reason)
            }
        }
    }

    Ok(())
}

async fn run_suggest_version(
    source: &Source,
    current: Option<String>,
    range: &RangeArgs,
    key: &KeyArgs,
) -> Result<()> {
    let current = match current {
        Some(current) => Some(current),
        None => {
            let tags = source
                .history
                .list_tags(&source.repo)
                .await
                .context("Failed to list tags")?;
            latest_release_tag(&tags).map(|t| t.name.clone())
        }
    };

    let settings = Settings::from_env();
    let client = completion_client(&settings)?;
    let provider = ProviderConfig::from_api_key(key.api_key.as_deref(), key.base_url.as_deref());

    let commits = fetch(source, range).await?;
    let suggestion = suggest_version_with_provider(
        &commits,
        current.as_deref(),
        &client,
        &settings.models,
        &provider,
    )
    .await;

    println!("{}", suggestion.version);
    eprintln!(
        "{} -> {} ({})",
        current.as_deref().unwrap_or("none"),
        suggestion.version,
        suggestion.reason
    );
    Ok(())
}

async fn run_parse(source: &Source, messages: Vec<String>, range: &RangeArgs) -> Result<()> {
    let parsed = if messages.is_empty() {
        let commits = fetch(source, range).await?;
        parse_conventional_commits(&commits)
    } else {
        messages.iter().map(|m| parse_commit_message(m)).collect()
    };

    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

async fn run_tags(source: &Source) -> Result<()> {
    let mut tags = source
        .history
        .list_tags(&source.repo)
        .await
        .context("Failed to list tags")?;

    if tags.is_empty() {
        bail!("No tags found in {}", source.repo);
    }

    let latest = latest_release_tag(&tags).map(|t| t.name.clone());
    tags.sort_by(|a, b| b.version().cmp(&a.version()).then_with(|| a.name.cmp(&b.name)));

    for tag in &tags {
        let marker = if latest.as_deref() == Some(tag.name.as_str()) {
            " (latest release)"
        } else {
            ""
        };
        println!("{}  {}{}", tag.name, &tag.sha[..tag.sha.len().min(7)], marker);
    }
    Ok(())
}
