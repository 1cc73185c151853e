//! Planning error taxonomy.
//!
//! Every planning-time failure is collected into a report instead of aborting
//! on the first one, so a single run shows every problem in the config.
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One planning-time failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanError {
    #[error("invalid config at {path}: {message}")]
    ConfigValidation { path: String, message: String },
    #[error("checksum mismatch for {location}: declared {declared}, observed {observed}")]
    ChecksumMismatch {
        location: String,
        declared: String,
        observed: String,
    },
    #[error("chromosome {name:?} matches neither pattern {pattern:?} nor any unplaced pattern")]
    UnmappedChromosome { name: String, pattern: String },
    #[error(
        "{reference}@{build}: {category} is required but has no source for {}",
        .missing.join(", ")
    )]
    MissingRequiredSource {
        reference: String,
        build: String,
        category: String,
        missing: Vec<String>,
    },
    #[error("output path {path} is claimed by both {first} and {second}")]
    PathCollision {
        path: String,
        first: String,
        second: String,
    },
    #[error("complement {complement} of {region} is inconsistent: {reason}")]
    MutualPairViolation {
        region: String,
        complement: String,
        reason: String,
    },
}

impl PlanError {
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        PlanError::ConfigValidation {
            path: path.into(),
            message: message.into(),
        }
    }

    #[cfg(test)]
    pub fn kind(&self) -> &'static str {
        match self {
            PlanError::ConfigValidation { .. } => "config_validation",
            PlanError::ChecksumMismatch { .. } => "checksum_mismatch",
            PlanError::UnmappedChromosome { .. } => "unmapped_chromosome",
            PlanError::MissingRequiredSource { .. } => "missing_required_source",
            PlanError::PathCollision { .. } => "path_collision",
            PlanError::MutualPairViolation { .. } => "mutual_pair_violation",
        }
    }
}

/// Aggregated planning failures, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanReport {
    pub errors: Vec<PlanError>,
}

impl PlanReport {
    pub fn new(errors: Vec<PlanError>) -> Self {
        Self { errors }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[cfg(test)]
    pub fn count(&self, kind: &str) -> usize {
        self.errors.iter().filter(|err| err.kind() == kind).count()
    }
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "planning failed with {} error(s):", self.errors.len())?;
        for err in &self.errors {
            writeln!(f, "  - {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PlanReport {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_source_lists_roles() {
        let err = PlanError::MissingRequiredSource {
            reference: "GRCh38".to_string(),
            build: "default".to_string(),
            category: "segdups".to_string(),
            missing: vec!["superdups".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "GRCh38@default: segdups is required but has no source for superdups"
        );
        assert_eq!(err.kind(), "missing_required_source");
    }

    #[test]
    fn report_lists_every_error() {
        let report = PlanReport::new(vec![
            PlanError::validation("a", "first"),
            PlanError::validation("b", "second"),
        ]);
        let text = report.to_string();
        assert!(text.contains("2 error(s)"));
        assert!(text.contains("invalid config at a: first"));
        assert!(text.contains("invalid config at b: second"));
        assert_eq!(report.count("config_validation"), 2);
    }

    #[test]
    fn errors_serialize_with_kind_tag() {
        let err = PlanError::PathCollision {
            path: "p".to_string(),
            first: "x".to_string(),
            second: "y".to_string(),
        };
        let value = serde_json::to_value(&err).expect("serialize");
        assert_eq!(value["kind"], "path_collision");
    }
}
