//! Run configuration.
//!
//! Defaults are overridden by an optional `.mutscore.toml` in the working
//! directory, which is in turn overridden by command-line flags.
//!
//! ```toml
//! [run]
//! timeout = "90s"
//! test_cmd = "cargo test"
//! skip_low_lines = false
//! categories = ["relational_operator", "condition_negation"]
//! min_priority = "high"
//! invalid_mutants = "assume-killed"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;
use crate::mutants::{MutationKind, Priority};

pub const CONFIG_FILE: &str = ".mutscore.toml";

/// What to do with a mutant whose text no longer parses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidMutantPolicy {
    /// Run the oracle anyway; the compiler's rejection is a kill signal.
    #[default]
    Test,
    /// Record `killed` without invoking the oracle.
    AssumeKilled,
}

impl InvalidMutantPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            InvalidMutantPolicy::Test => "test",
            InvalidMutantPolicy::AssumeKilled => "assume-killed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Drop mutations below `low_line_threshold` (package and import headers).
    pub skip_low_lines: bool,
    pub low_line_threshold: usize,
    /// 0 means unbounded.
    pub min_line: usize,
    /// 0 means unbounded.
    pub max_line: usize,
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    /// Requested worker count. Anything but 1 is clamped.
    pub max_concurrency: usize,
    pub verbose: bool,
    /// Test command; the language default is used when unset.
    pub test_cmd: Option<String>,
    /// Appended to the test command when non-empty (a Go package, a test file).
    pub scope: String,
    pub invalid_mutants: InvalidMutantPolicy,
    pub max_output_bytes: usize,
    pub progress_every: usize,
    /// Empty means every category.
    pub categories: Vec<MutationKind>,
    pub min_priority: Option<Priority>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            skip_low_lines: true,
            low_line_threshold: 20,
            min_line: 0,
            max_line: 0,
            timeout: Duration::from_secs(60),
            max_concurrency: 1,
            verbose: false,
            test_cmd: None,
            scope: String::new(),
            invalid_mutants: InvalidMutantPolicy::Test,
            max_output_bytes: 10_000,
            progress_every: 10,
            categories: Vec::new(),
            min_priority: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    run: RunConfig,
}

impl RunConfig {
    /// Load `.mutscore.toml` from `dir`. A missing or blank file yields defaults.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Toml { path, source })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: FileConfig = toml::from_str(content)?;
        Ok(file.run)
    }
}

fn deserialize_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

/// Parse `500ms`, `90s`, `2m`, `1h` or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 60s, 2m, 500ms)"))?;
    let multiplier = match unit {
        "ms" => return Ok(Duration::from_millis(value)),
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => return Err(format!("invalid duration unit '{unit}' in '{s}'")),
    };
    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
