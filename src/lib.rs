pub mod applicator;
pub mod batch;
pub mod config;
pub mod error;
pub mod generator;
pub mod grammar;
pub mod mutants;
pub mod operators;
pub mod oracle;
pub mod output;
pub mod report;
pub mod runner;
pub mod safety;
pub mod state;
pub mod syntax;

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Go,
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Tsx,
}

impl Language {
    pub fn name(self) -> &'static str {
        match self {
            Language::Go => "Go",
            Language::Python => "Python",
            Language::Rust => "Rust",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Tsx => "TSX",
        }
    }

    pub(crate) fn tree_sitter(self) -> tree_sitter::Language {
        match self {
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    pub fn grammar(self) -> &'static grammar::Grammar {
        grammar::for_language(self)
    }

    /// Test command used when neither the config file nor the CLI names one.
    pub fn default_test_cmd(self) -> &'static str {
        match self {
            Language::Go => "go test -v",
            Language::Python => "pytest -x -q",
            Language::Rust => "cargo test",
            Language::JavaScript | Language::TypeScript | Language::Tsx => "npx vitest run",
        }
    }
}

pub fn detect_language(path: &Path) -> Option<Language> {
    match path.extension()?.to_str()? {
        "go" => Some(Language::Go),
        "py" => Some(Language::Python),
        "rs" => Some(Language::Rust),
        "js" | "mjs" | "cjs" => Some(Language::JavaScript),
        "ts" | "mts" | "cts" => Some(Language::TypeScript),
        "tsx" | "jsx" => Some(Language::Tsx),
        _ => None,
    }
}
