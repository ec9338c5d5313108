use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// `mutated` value of mutations that delete their anchor instead of replacing it.
pub const REMOVED: &str = "(removed)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    ArithmeticOperator,
    RelationalOperator,
    LogicalOperator,
    UnaryOperator,
    Constant,
    ReturnValue,
    StatementRemoval,
    ConditionNegation,
    ElseRemoval,
    AssignmentOperator,
    IncDec,
}

/// How the applicator turns a mutation into mutated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Replace the anchor fragment on its line.
    Substitute,
    /// Keep the line but comment it out.
    Disable,
    /// Re-parse and rewrite a conditional statement.
    Structural,
}

impl MutationKind {
    pub const ALL: [MutationKind; 11] = [
        MutationKind::ArithmeticOperator,
        MutationKind::RelationalOperator,
        MutationKind::LogicalOperator,
        MutationKind::UnaryOperator,
        MutationKind::Constant,
        MutationKind::ReturnValue,
        MutationKind::StatementRemoval,
        MutationKind::ConditionNegation,
        MutationKind::ElseRemoval,
        MutationKind::AssignmentOperator,
        MutationKind::IncDec,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::ArithmeticOperator => "arithmetic_operator",
            MutationKind::RelationalOperator => "relational_operator",
            MutationKind::LogicalOperator => "logical_operator",
            MutationKind::UnaryOperator => "unary_operator",
            MutationKind::Constant => "constant",
            MutationKind::ReturnValue => "return_value",
            MutationKind::StatementRemoval => "statement_removal",
            MutationKind::ConditionNegation => "condition_negation",
            MutationKind::ElseRemoval => "else_removal",
            MutationKind::AssignmentOperator => "assignment_operator",
            MutationKind::IncDec => "inc_dec",
        }
    }

    pub fn strategy(self) -> Strategy {
        match self {
            MutationKind::ArithmeticOperator
            | MutationKind::RelationalOperator
            | MutationKind::LogicalOperator
            | MutationKind::UnaryOperator
            | MutationKind::Constant
            | MutationKind::ReturnValue
            | MutationKind::AssignmentOperator
            | MutationKind::IncDec => Strategy::Substitute,
            MutationKind::StatementRemoval => Strategy::Disable,
            MutationKind::ConditionNegation | MutationKind::ElseRemoval => Strategy::Structural,
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MutationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown mutation type: {s}"))
    }
}

/// Advisory severity. Assigned per category, not derived from any analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(format!("unknown priority: {s} (expected high, medium or low)")),
        }
    }
}

/// A proposed, not yet applied defect. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    pub id: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    #[serde(rename = "type")]
    pub kind: MutationKind,
    pub original: String,
    pub mutated: String,
    pub description: String,
    pub priority: Priority,
}

impl Mutation {
    pub fn path(&self) -> &Path {
        Path::new(&self.file)
    }

    pub fn is_removal(&self) -> bool {
        self.mutated == REMOVED
    }

    /// Text that takes the anchor's place; empty for removals.
    pub fn replacement(&self) -> &str {
        if self.is_removal() { "" } else { &self.mutated }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationStatus {
    /// The oracle failed: the suite caught the mutant.
    Killed,
    /// The oracle passed: the mutant went undetected.
    Survived,
    Timeout,
    /// The cycle failed before the oracle could judge the mutant.
    Error,
}

impl fmt::Display for MutationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationStatus::Killed => write!(f, "killed"),
            MutationStatus::Survived => write!(f, "survived"),
            MutationStatus::Timeout => write!(f, "timeout"),
            MutationStatus::Error => write!(f, "error"),
        }
    }
}

/// Verdict for one applied mutation, persisted as one JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResult {
    pub mutation_id: String,
    pub status: MutationStatus,
    pub duration_ms: f64,
    pub test_output: String,
    pub description: String,
    pub file: String,
    pub line: usize,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MutationKind>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub diff: String,
}

impl MutationResult {
    pub fn new(mutation: &Mutation, status: MutationStatus) -> Self {
        Self {
            mutation_id: mutation.id.clone(),
            status,
            duration_ms: 0.0,
            test_output: String::new(),
            description: mutation.description.clone(),
            file: mutation.file.clone(),
            line: mutation.line,
            kind: Some(mutation.kind),
            diff: String::new(),
        }
    }
}
