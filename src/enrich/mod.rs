//! Quality assessment and diff-based rewriting for poorly described commits.

pub mod diff;
pub mod quality;

pub use diff::{EnrichedDescription, Enrichment, enrich_vague_commits};
pub use quality::{QualityAssessment, QualityLabel, assess_quality, heuristic_label};
