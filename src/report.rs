//! Aggregation of persisted per-mutation results into one report.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::mutants::{MutationKind, MutationResult, MutationStatus};
use crate::state;

/// Category label for results whose kind can be neither read nor inferred.
pub const OTHER: &str = "other";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedReport {
    pub total_mutations: usize,
    pub killed: usize,
    pub survived: usize,
    pub timeouts: usize,
    pub errors: usize,
    pub mutation_score: f64,
    pub total_duration_ms: f64,
    pub results: Vec<MutationResult>,
    pub survivors_by_file: BTreeMap<String, usize>,
    pub survivors_by_type: BTreeMap<String, usize>,
    /// Sorted by file, then line.
    pub survivors: Vec<MutationResult>,
}

impl AggregatedReport {
    pub fn verdict(&self) -> Verdict {
        Verdict::from_score(self.mutation_score)
    }
}

/// Load every result file matching `pattern`. Unreadable or malformed files
/// are skipped with a warning.
pub fn load_results(pattern: &str) -> Result<Vec<MutationResult>, ReportError> {
    let paths: Vec<PathBuf> = glob::glob(pattern)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable path");
                None
            }
        })
        .collect();

    if paths.is_empty() {
        return Err(ReportError::NoMatches(pattern.to_string()));
    }
    tracing::debug!(count = paths.len(), pattern, "found result files");

    let results = paths
        .iter()
        .filter_map(|path| match state::load_result(path) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping result file");
                None
            }
        })
        .collect();
    Ok(results)
}

pub fn aggregate(results: Vec<MutationResult>) -> AggregatedReport {
    let mut report = AggregatedReport {
        total_mutations: results.len(),
        killed: 0,
        survived: 0,
        timeouts: 0,
        errors: 0,
        mutation_score: 0.0,
        total_duration_ms: 0.0,
        results: Vec::new(),
        survivors_by_file: BTreeMap::new(),
        survivors_by_type: BTreeMap::new(),
        survivors: Vec::new(),
    };

    for result in &results {
        report.total_duration_ms += result.duration_ms;
        match result.status {
            MutationStatus::Killed => report.killed += 1,
            MutationStatus::Survived => {
                report.survived += 1;
                *report.survivors_by_file.entry(result.file.clone()).or_default() += 1;
                *report.survivors_by_type.entry(category_of(result)).or_default() += 1;
                report.survivors.push(result.clone());
            }
            MutationStatus::Timeout => report.timeouts += 1,
            MutationStatus::Error => report.errors += 1,
        }
    }

    let valid = report.total_mutations - report.timeouts - report.errors;
    if valid > 0 {
        report.mutation_score = report.killed as f64 / valid as f64 * 100.0;
    }

    report
        .survivors
        .sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
    report.results = results;
    report
}

/// Grouping key of a result: its persisted kind, else a guess from the
/// description.
pub fn category_of(result: &MutationResult) -> String {
    match result.kind {
        Some(kind) => kind.as_str().to_string(),
        None => infer_kind(&result.description).map_or_else(|| OTHER.to_string(), |k| k.as_str().to_string()),
    }
}

/// Keyword match of a free-text description onto a mutation category. Only
/// used for result files written without a `type` field.
pub fn infer_kind(description: &str) -> Option<MutationKind> {
    let desc = description.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| desc.contains(n));

    let kind = if has(&["boundary"]) {
        MutationKind::RelationalOperator
    } else if has(&["else"]) {
        MutationKind::ElseRemoval
    } else if has(&["negate"]) {
        MutationKind::ConditionNegation
    } else if has(&["return value"]) {
        MutationKind::ReturnValue
    } else if has(&["return", "statement"]) {
        MutationKind::StatementRemoval
    } else if has(&["negation", "unary"]) {
        MutationKind::UnaryOperator
    } else if has(&["off-by-one", "string to empty", "constant", "change 0 to 1", "change 1 to 0"]) {
        MutationKind::Constant
    } else if has(&["++", "--", "increment", "decrement"]) {
        MutationKind::IncDec
    } else if has(&["+=", "-=", "assignment"]) {
        MutationKind::AssignmentOperator
    } else if has(&["&&", "||", "logical", " and ", " or "]) {
        MutationKind::LogicalOperator
    } else if has(&["arithmetic", "+", "-", "*", "/", "%"]) {
        MutationKind::ArithmeticOperator
    } else if has(&["<", ">", "==", "!="]) {
        MutationKind::RelationalOperator
    } else {
        return None;
    };
    Some(kind)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Verdict {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Verdict::Excellent
        } else if score >= 80.0 {
            Verdict::Good
        } else if score >= 70.0 {
            Verdict::Fair
        } else {
            Verdict::Poor
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Verdict::Excellent => "Very thorough test suite",
            Verdict::Good => "Solid test coverage with minor gaps",
            Verdict::Fair => "Tests cover main paths but miss edges",
            Verdict::Poor => "Significant test gaps, add more tests",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Excellent => "EXCELLENT",
            Verdict::Good => "GOOD",
            Verdict::Fair => "FAIR",
            Verdict::Poor => "POOR",
        };
        f.write_str(label)
    }
}
