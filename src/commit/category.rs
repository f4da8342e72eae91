//! Grouping parsed commits into changelog categories.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::parser::ParsedCommit;

/// The closed set of buckets a commit can land in.
///
/// Declaration order is the order categories appear in a changelog summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitCategory {
    Breaking,
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
    Chore,
    Other,
}

impl CommitCategory {
    pub const ALL: [CommitCategory; 10] = [
        Self::Breaking,
        Self::Feat,
        Self::Fix,
        Self::Docs,
        Self::Style,
        Self::Refactor,
        Self::Perf,
        Self::Test,
        Self::Chore,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breaking => "breaking",
            Self::Feat => "feat",
            Self::Fix => "fix",
            Self::Docs => "docs",
            Self::Style => "style",
            Self::Refactor => "refactor",
            Self::Perf => "perf",
            Self::Test => "test",
            Self::Chore => "chore",
            Self::Other => "other",
        }
    }

    /// Whether a conventional type word can select this bucket directly.
    pub fn is_typed(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

impl fmt::Display for CommitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommitCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "breaking" => Ok(Self::Breaking),
            "feat" => Ok(Self::Feat),
            "fix" => Ok(Self::Fix),
            "docs" => Ok(Self::Docs),
            "style" => Ok(Self::Style),
            "refactor" => Ok(Self::Refactor),
            "perf" => Ok(Self::Perf),
            "test" => Ok(Self::Test),
            "chore" => Ok(Self::Chore),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown commit category: {}", s)),
        }
    }
}

/// Decide the single bucket a commit belongs to.
///
/// Breaking status wins over the type; untyped or unknown types go to `Other`.
pub fn category_of(commit: &ParsedCommit) -> CommitCategory {
    if commit.is_breaking {
        return CommitCategory::Breaking;
    }
    commit.category_type().unwrap_or(CommitCategory::Other)
}

/// Commits grouped by category, input order preserved inside each bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorized<T> {
    buckets: BTreeMap<CommitCategory, Vec<T>>,
}

impl<T> Categorized<T> {
    fn empty() -> Self {
        Self {
            buckets: CommitCategory::ALL
                .into_iter()
                .map(|c| (c, Vec::new()))
                .collect(),
        }
    }

    /// Members of one bucket.
    pub fn get(&self, category: CommitCategory) -> &[T] {
        self.buckets.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All buckets in category order, including empty ones.
    pub fn iter(&self) -> impl Iterator<Item = (CommitCategory, &[T])> {
        self.buckets.iter().map(|(c, items)| (*c, items.as_slice()))
    }

    /// Buckets that have at least one member, in category order.
    pub fn non_empty(&self) -> impl Iterator<Item = (CommitCategory, &[T])> {
        self.iter().filter(|(_, items)| !items.is_empty())
    }

    /// Total number of categorized items.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Group parsed commits into categories.
pub fn categorize(commits: &[ParsedCommit]) -> Categorized<&ParsedCommit> {
    categorize_by(commits, |c| c)
}

/// Group arbitrary records by the parsed commit each one carries.
pub fn categorize_by<'a, T, F>(items: &'a [T], parsed: F) -> Categorized<&'a T>
where
    F: Fn(&T) -> &ParsedCommit,
{
    let mut grouped = Categorized::empty();
    for item in items {
        let category = category_of(parsed(item));
        grouped
            .buckets
            .entry(category)
            .or_default()
            .push(item);
    }
    grouped
}
