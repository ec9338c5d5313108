use std::fmt;
use std::fs;
use std::time::{Duration, Instant};

use similar::{ChangeTag, TextDiff};

use crate::applicator;
use crate::config::{InvalidMutantPolicy, RunConfig};
use crate::error::RunError;
use crate::mutants::{Mutation, MutationResult, MutationStatus};
use crate::oracle::{self, OracleOutcome, TestOracle};
use crate::safety::RestoreGuard;

/// Per-cycle knobs, usually derived from a [`RunConfig`].
#[derive(Debug, Clone)]
pub struct CycleOptions {
    pub scope: String,
    pub timeout: Duration,
    /// Re-parse the mutant before testing it.
    pub verify: bool,
    pub invalid_mutants: InvalidMutantPolicy,
    pub max_output_bytes: usize,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self::from_config(&RunConfig::default())
    }
}

impl CycleOptions {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            scope: config.scope.clone(),
            timeout: config.timeout,
            verify: true,
            invalid_mutants: config.invalid_mutants,
            max_output_bytes: config.max_output_bytes,
        }
    }
}

/// Steps of one cycle. They advance strictly in order; a failing step jumps
/// straight to `Restored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CycleState {
    Start,
    BackedUp,
    Mutated,
    Tested,
    Restored,
    ResultEmitted,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleState::Start => "start",
            CycleState::BackedUp => "backed-up",
            CycleState::Mutated => "mutated",
            CycleState::Tested => "tested",
            CycleState::Restored => "restored",
            CycleState::ResultEmitted => "result-emitted",
        };
        f.write_str(name)
    }
}

struct Cycle<'a> {
    id: &'a str,
    state: CycleState,
}

impl Cycle<'_> {
    fn advance(&mut self, next: CycleState) {
        debug_assert!(next > self.state, "cycle moved backwards: {} -> {}", self.state, next);
        tracing::debug!(mutation = self.id, from = %self.state, to = %next, "cycle");
        self.state = next;
    }
}

/// Run one mutate, test, restore cycle for `mutation`.
///
/// Failures before the oracle runs become a result with status `error`. The
/// only `Err` is a failed restoration, which leaves a mutant on disk.
pub fn run_cycle(
    mutation: &Mutation,
    oracle: &dyn TestOracle,
    options: &CycleOptions,
) -> Result<MutationResult, RunError> {
    let start = Instant::now();
    let mut cycle = Cycle {
        id: &mutation.id,
        state: CycleState::Start,
    };
    let path = mutation.path();

    let mut guard = match RestoreGuard::acquire(path) {
        Ok(guard) => guard,
        Err(e) => {
            let outcome = Verdict::error(format!("Failed to back up {}: {e}", path.display()));
            return Ok(emit(mutation, outcome, start, options, &mut cycle));
        }
    };
    cycle.advance(CycleState::BackedUp);

    let verdict = mutate_and_test(mutation, &guard, oracle, options, &mut cycle);

    if let Err(source) = guard.restore() {
        tracing::error!(
            mutation = %mutation.id,
            path = %path.display(),
            backup = %guard.backup().display(),
            error = %source,
            "CRITICAL: failed to restore original content"
        );
        return Err(RunError::Restore {
            path: path.to_path_buf(),
            backup: guard.backup().to_path_buf(),
            source,
        });
    }
    cycle.advance(CycleState::Restored);

    Ok(emit(mutation, verdict, start, options, &mut cycle))
}

struct Verdict {
    status: MutationStatus,
    output: String,
    diff: String,
}

impl Verdict {
    fn error(output: String) -> Self {
        Self {
            status: MutationStatus::Error,
            output,
            diff: String::new(),
        }
    }
}

fn mutate_and_test(
    mutation: &Mutation,
    guard: &RestoreGuard,
    oracle: &dyn TestOracle,
    options: &CycleOptions,
    cycle: &mut Cycle<'_>,
) -> Verdict {
    let mutated = match applicator::apply(mutation, guard.original()) {
        Ok(text) => text,
        Err(e) => return Verdict::error(format!("Failed to apply mutation: {e}")),
    };
    let diff = generate_diff(guard.original(), &mutated);

    let invalid = if options.verify {
        applicator::verify(mutation, &mutated).err()
    } else {
        None
    };
    if let Some(e) = &invalid {
        tracing::warn!(mutation = %mutation.id, error = %e, "mutant does not parse");
    }

    if let Err(e) = fs::write(guard.path(), &mutated) {
        return Verdict {
            status: MutationStatus::Error,
            output: format!("Failed to write mutated code: {e}"),
            diff,
        };
    }
    cycle.advance(CycleState::Mutated);

    if let (Some(e), InvalidMutantPolicy::AssumeKilled) = (&invalid, options.invalid_mutants) {
        return Verdict {
            status: MutationStatus::Killed,
            output: format!("Mutant does not parse ({e}); oracle skipped"),
            diff,
        };
    }

    let outcome = oracle.run(&options.scope, options.timeout);
    cycle.advance(CycleState::Tested);

    let status = match &outcome {
        OracleOutcome::Passed { .. } => MutationStatus::Survived,
        OracleOutcome::Failed { .. } => MutationStatus::Killed,
        OracleOutcome::TimedOut { .. } => MutationStatus::Timeout,
        OracleOutcome::Interrupted { .. } => MutationStatus::Error,
        OracleOutcome::SpawnFailed { message } => {
            tracing::warn!(mutation = %mutation.id, "{message}");
            MutationStatus::Error
        }
    };
    let output = match outcome {
        OracleOutcome::Interrupted { output } => format!("interrupted\n{output}"),
        other => other.output().to_string(),
    };

    Verdict { status, output, diff }
}

fn emit(
    mutation: &Mutation,
    verdict: Verdict,
    start: Instant,
    options: &CycleOptions,
    cycle: &mut Cycle<'_>,
) -> MutationResult {
    let mut result = MutationResult::new(mutation, verdict.status);
    result.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    result.test_output = oracle::truncate_output(&verdict.output, options.max_output_bytes);
    result.diff = verdict.diff;

    cycle.state = cycle.state.max(CycleState::Restored);
    cycle.advance(CycleState::ResultEmitted);
    tracing::info!(
        mutation = %mutation.id,
        status = %result.status,
        duration_ms = result.duration_ms as u64,
        "{}",
        mutation.description
    );
    result
}

/// Line diff of the mutant, `-`/`+` prefixed with 1-based line numbers.
pub fn generate_diff(original: &str, mutated: &str) -> String {
    let diff = TextDiff::from_lines(original, mutated);
    let mut output = String::new();
    for change in diff.iter_all_changes() {
        let (sign, index) = match change.tag() {
            ChangeTag::Delete => ("-", change.old_index()),
            ChangeTag::Insert => ("+", change.new_index()),
            ChangeTag::Equal => continue,
        };
        let line = index.map(|i| i + 1).unwrap_or_default();
        output.push_str(&format!("{sign}{line}: {}", change.value()));
        if change.missing_newline() {
            output.push('\n');
        }
    }
    output
}
