//! Fixed operator table. Every alternative is deterministic.
//! Priorities are a per-category heuristic and purely advisory.

use crate::grammar::Grammar;
use crate::mutants::{MutationKind, Priority, REMOVED};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOp {
    pub kind: MutationKind,
    pub replacement: String,
    pub description: String,
    pub priority: Priority,
}

impl MutationOp {
    fn new(
        kind: MutationKind,
        replacement: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            kind,
            replacement: replacement.into(),
            description: description.into(),
            priority,
        }
    }
}

const ARITHMETIC: [&str; 5] = ["+", "-", "*", "/", "%"];

pub fn is_arithmetic(op: &str) -> bool {
    ARITHMETIC.contains(&op)
}

/// Every other arithmetic operator.
pub fn arithmetic_mutations(op: &str) -> Vec<MutationOp> {
    if !is_arithmetic(op) {
        return vec![];
    }
    ARITHMETIC
        .iter()
        .filter(|alt| **alt != op)
        .map(|alt| {
            MutationOp::new(
                MutationKind::ArithmeticOperator,
                *alt,
                format!("Change {op} to {alt}"),
                Priority::High,
            )
        })
        .collect()
}

fn relational_alternatives(op: &str) -> &'static [&'static str] {
    match op {
        "<" => &["<=", ">", ">=", "==", "!="],
        ">" => &[">=", "<", "<=", "==", "!="],
        "<=" => &["<", ">=", ">", "==", "!="],
        ">=" => &[">", "<=", "<", "==", "!="],
        "==" => &["!=", "<", ">"],
        "!=" => &["=="],
        "===" => &["!=="],
        "!==" => &["==="],
        _ => &[],
    }
}

pub fn is_relational(op: &str) -> bool {
    !relational_alternatives(op).is_empty()
}

/// Boundary-flipped and inverted alternatives. Never includes `op` itself.
pub fn relational_mutations(op: &str) -> Vec<MutationOp> {
    relational_alternatives(op)
        .iter()
        .map(|alt| {
            MutationOp::new(
                MutationKind::RelationalOperator,
                *alt,
                format!("Change {op} to {alt} (boundary)"),
                Priority::High,
            )
        })
        .collect()
}

pub fn logical_mutations(op: &str, grammar: &Grammar) -> Vec<MutationOp> {
    let flipped = if op == grammar.and_op {
        grammar.or_op
    } else if op == grammar.or_op {
        grammar.and_op
    } else {
        return vec![];
    };
    vec![MutationOp::new(
        MutationKind::LogicalOperator,
        flipped,
        format!("Change {op} to {flipped}"),
        Priority::High,
    )]
}

/// `!x` becomes `x`.
pub fn negation_removal() -> MutationOp {
    MutationOp::new(
        MutationKind::UnaryOperator,
        REMOVED,
        "Remove negation operator",
        Priority::High,
    )
}

/// `-x` becomes `+x`, or `x` where the language has no unary plus.
pub fn unary_minus_mutation(grammar: &Grammar) -> MutationOp {
    if grammar.unary_plus {
        MutationOp::new(
            MutationKind::UnaryOperator,
            "+",
            "Change unary minus to plus",
            Priority::Medium,
        )
    } else {
        MutationOp::new(
            MutationKind::UnaryOperator,
            REMOVED,
            "Remove unary minus",
            Priority::Medium,
        )
    }
}

pub fn integer_mutations(value: &str) -> Vec<MutationOp> {
    let op = match value {
        "0" => MutationOp::new(MutationKind::Constant, "1", "Change 0 to 1", Priority::High),
        "1" => MutationOp::new(MutationKind::Constant, "0", "Change 1 to 0", Priority::High),
        _ => MutationOp::new(
            MutationKind::Constant,
            format!("({value} + 1)"),
            format!("Off-by-one: {value} → {value} + 1"),
            Priority::Medium,
        ),
    };
    vec![op]
}

/// Decimal, hex, octal or binary digits, with `_` separators and an
/// optional integer type suffix (`10u8`, `10n`). Floats are rejected.
pub fn is_integer_text(text: &str) -> bool {
    if text.contains('.') {
        return false;
    }
    let lower = text.to_ascii_lowercase();
    let (digits, radix) = match lower.get(..2) {
        Some("0x") => (&lower[2..], 16),
        Some("0o") => (&lower[2..], 8),
        Some("0b") => (&lower[2..], 2),
        _ => (lower.as_str(), 10),
    };
    let end = digits
        .find(|c: char| c != '_' && !c.is_digit(radix))
        .unwrap_or(digits.len());
    let (body, suffix) = digits.split_at(end);
    body.starts_with(|c: char| c.is_digit(radix)) && (suffix.is_empty() || is_type_suffix(suffix))
}

fn is_type_suffix(suffix: &str) -> bool {
    matches!(
        suffix,
        "u8" | "u16" | "u32" | "u64" | "u128" | "usize"
            | "i8" | "i16" | "i32" | "i64" | "i128" | "isize"
            | "n"
    )
}

/// A string literal with nothing between its quotes, in any of the
/// supported spellings (`""`, `''`, `r#""#`, `b""`, `f''`).
pub fn is_empty_string(text: &str) -> bool {
    let unprefixed = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let unhashed = unprefixed.trim_matches('#');
    !unhashed.is_empty() && unhashed.chars().all(|c| matches!(c, '"' | '\'' | '`'))
}

pub fn string_mutations(text: &str) -> Vec<MutationOp> {
    if is_empty_string(text) {
        return vec![];
    }
    let replacement = if text.starts_with(['b', 'B']) { "b\"\"" } else { "\"\"" };
    vec![MutationOp::new(
        MutationKind::Constant,
        replacement,
        "Change string to empty",
        Priority::Medium,
    )]
}

/// Boolean and nil-like literals returned at position `index`.
pub fn return_value_mutations(index: usize, value: &str, grammar: &Grammar) -> Vec<MutationOp> {
    let replacement = if value == grammar.true_literal {
        grammar.false_literal
    } else if value == grammar.false_literal {
        grammar.true_literal
    } else if grammar.is_nil(value) {
        grammar.non_nil
    } else {
        return vec![];
    };
    vec![MutationOp::new(
        MutationKind::ReturnValue,
        replacement,
        format!("Change return value {index}: {value} → {replacement}"),
        Priority::High,
    )]
}

pub fn statement_removal() -> MutationOp {
    MutationOp::new(
        MutationKind::StatementRemoval,
        REMOVED,
        "Remove return statement",
        Priority::Medium,
    )
}

pub fn condition_negation(condition: &str, grammar: &Grammar) -> MutationOp {
    MutationOp::new(
        MutationKind::ConditionNegation,
        grammar.negate(condition),
        "Negate if condition",
        Priority::High,
    )
}

pub fn else_removal() -> MutationOp {
    MutationOp::new(
        MutationKind::ElseRemoval,
        REMOVED,
        "Remove else branch",
        Priority::Medium,
    )
}

pub fn assignment_mutations(op: &str) -> Vec<MutationOp> {
    let inverse = match op {
        "+=" => "-=",
        "-=" => "+=",
        _ => return vec![],
    };
    vec![MutationOp::new(
        MutationKind::AssignmentOperator,
        inverse,
        format!("Change {op} to {inverse}"),
        Priority::Medium,
    )]
}

pub fn inc_dec_mutations(op: &str) -> Vec<MutationOp> {
    let opposite = match op {
        "++" => "--",
        "--" => "++",
        _ => return vec![],
    };
    vec![MutationOp::new(
        MutationKind::IncDec,
        opposite,
        format!("Change {op} to {opposite}"),
        Priority::High,
    )]
}
