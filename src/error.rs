use std::path::PathBuf;

use thiserror::Error;

/// The source text could not be turned into a clean syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
    #[error("{language} grammar could not be loaded: {message}")]
    Grammar {
        language: &'static str,
        message: String,
    },
    #[error("parser returned no tree")]
    NoTree,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unsupported file type: {}. Supported: .go, .py, .rs, .js, .ts, .tsx, .jsx", .0.display())]
    UnsupportedLanguage(PathBuf),
    #[error("failed to parse {}: {source}", path.display())]
    Parse { path: PathBuf, source: ParseError },
    #[error("function '{name}' not found. Available: {}", available.join(", "))]
    FunctionNotFound {
        name: String,
        available: Vec<String>,
    },
    #[error("invalid line range '{0}' (expected format: 100-200)")]
    InvalidLineRange(String),
}

/// A mutation could not be applied to the current file content.
///
/// These are fatal to one cycle only; the runner records them as `error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("line {line} out of range (file has {lines} lines)")]
    LineOutOfRange { line: usize, lines: usize },
    #[error("original text {original:?} not found in line {line}")]
    AnchorNotFound { original: String, line: usize },
    #[error("conditional statement not found at line {line}")]
    NoConditional { line: usize },
    #[error("conditional statement at line {line} has no else branch")]
    NoElseBranch { line: usize },
    #[error("condition at line {line} cannot be negated")]
    NotNegatable { line: usize },
    #[error("unsupported file type for structural mutation: {0}")]
    UnsupportedLanguage(String),
    #[error("source does not parse: {0}")]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("mutation {0} not found")]
    UnknownMutation(String),
}

/// Raised only when the mutated file could not be put back.
///
/// Every other failure inside a cycle becomes a result status instead.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(
        "CRITICAL: failed to restore {}: {source}. The file may still contain a mutant; original content is kept in {}",
        path.display(),
        backup.display()
    )]
    Restore {
        path: PathBuf,
        backup: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid results pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("no result files found matching pattern: {0}")]
    NoMatches(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}
