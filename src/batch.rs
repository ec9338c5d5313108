//! Batch orchestration: filter a catalog, then drive one cycle per mutation.
//!
//! Every cycle rewrites its target file in place, so execution is serial.
//! The worker-pool shape is kept, but the worker count is clamped to 1 and a
//! per-file lock table independently guarantees a single active cycle per
//! file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::RunConfig;
use crate::error::{BatchError, RunError};
use crate::mutants::{Mutation, MutationKind, MutationResult, MutationStatus, Priority};
use crate::oracle::{self, Completion, TestOracle};
use crate::output;
use crate::runner::{self, CycleOptions};
use crate::safety;
use crate::state;

/// Extra time granted to a subprocess cycle beyond the oracle timeout, so the
/// outer deadline never races the inner one.
pub const SUBPROCESS_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub skip_low_lines: bool,
    pub low_line_threshold: usize,
    pub min_line: usize,
    pub max_line: usize,
    pub categories: Vec<MutationKind>,
    pub min_priority: Option<Priority>,
}

impl Default for Filters {
    fn default() -> Self {
        Self::from_config(&RunConfig::default())
    }
}

impl Filters {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            skip_low_lines: config.skip_low_lines,
            low_line_threshold: config.low_line_threshold,
            min_line: config.min_line,
            max_line: config.max_line,
            categories: config.categories.clone(),
            min_priority: config.min_priority,
        }
    }

    /// No filtering at all.
    pub fn none() -> Self {
        Self {
            skip_low_lines: false,
            low_line_threshold: 0,
            min_line: 0,
            max_line: 0,
            categories: Vec::new(),
            min_priority: None,
        }
    }

    pub fn accepts(&self, mutation: &Mutation) -> bool {
        let line = mutation.line;
        if self.skip_low_lines && line < self.low_line_threshold {
            return false;
        }
        if self.min_line > 0 && line < self.min_line {
            return false;
        }
        if self.max_line > 0 && line > self.max_line {
            return false;
        }
        if !self.categories.is_empty() && !self.categories.contains(&mutation.kind) {
            return false;
        }
        self.min_priority.is_none_or(|min| mutation.priority >= min)
    }
}

pub fn filter_mutations(mutations: &[Mutation], filters: &Filters) -> Vec<Mutation> {
    mutations.iter().filter(|m| filters.accepts(m)).cloned().collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Isolation {
    /// Cycles run on this process's worker thread.
    InProcess,
    /// Each cycle re-invokes `program test ...` as a child process.
    Subprocess {
        program: PathBuf,
        catalog: PathBuf,
        test_cmd: Option<String>,
        workdir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub cycle: CycleOptions,
    pub max_concurrency: usize,
    pub progress_every: usize,
    pub verbose: bool,
    pub output_dir: PathBuf,
    pub isolation: Isolation,
}

impl BatchOptions {
    pub fn from_config(config: &RunConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            cycle: CycleOptions::from_config(config),
            max_concurrency: config.max_concurrency,
            progress_every: config.progress_every,
            verbose: config.verbose,
            output_dir: output_dir.into(),
            isolation: Isolation::InProcess,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub killed: usize,
    pub survived: usize,
    pub timeouts: usize,
    pub errors: usize,
    pub duration: Duration,
}

impl BatchSummary {
    pub fn from_results(results: &[MutationResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.status {
                MutationStatus::Killed => summary.killed += 1,
                MutationStatus::Survived => summary.survived += 1,
                MutationStatus::Timeout => summary.timeouts += 1,
                MutationStatus::Error => summary.errors += 1,
            }
        }
        summary
    }

    /// Mutants that ran to a verdict; only timeouts are excluded here.
    pub fn testable(&self) -> usize {
        self.total - self.timeouts
    }

    /// `killed / (total - timeouts) * 100`, 0 when nothing was testable.
    pub fn score(&self) -> f64 {
        match self.testable() {
            0 => 0.0,
            testable => self.killed as f64 / testable as f64 * 100.0,
        }
    }
}

#[derive(Debug)]
pub struct BatchOutcome {
    /// One result per executed mutation, in catalog order.
    pub results: Vec<MutationResult>,
    pub summary: BatchSummary,
    /// Ctrl-C stopped the batch before every mutation ran.
    pub interrupted: bool,
}

/// Clamp a requested worker count to the only safe value.
pub fn effective_concurrency(requested: usize) -> usize {
    if requested != 1 {
        tracing::warn!(requested, "max_concurrency must be 1: mutations modify files in place");
        output::print_warning(&format!(
            "max_concurrency={requested} ignored: mutations modify files in place, running serially"
        ));
    }
    1
}

/// Run every mutation in `mutations` (already filtered) and persist each
/// result under `options.output_dir`.
pub fn run_batch(
    mutations: &[Mutation],
    oracle: &dyn TestOracle,
    options: &BatchOptions,
) -> Result<BatchOutcome, BatchError> {
    std::fs::create_dir_all(&options.output_dir).map_err(|source| BatchError::Io {
        path: options.output_dir.clone(),
        source,
    })?;

    let workers = effective_concurrency(options.max_concurrency);
    let total = mutations.len();
    let start = Instant::now();

    let next = AtomicUsize::new(0);
    let completed = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let slots: Mutex<Vec<Option<MutationResult>>> = Mutex::new(vec![None; total]);
    let fatal: Mutex<Option<RunError>> = Mutex::new(None);
    let locks = FileLocks::default();

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    if stop.load(Ordering::SeqCst) || oracle::is_interrupted() {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(mutation) = mutations.get(index) else {
                        break;
                    };

                    let result = {
                        let _lock = locks.lock(mutation.path());
                        execute(mutation, oracle, options)
                    };
                    let result = match result {
                        Ok(result) => result,
                        Err(e) => {
                            stop.store(true, Ordering::SeqCst);
                            *relock(&fatal) = Some(e);
                            break;
                        }
                    };

                    if options.isolation == Isolation::InProcess {
                        let path = state::result_path(&options.output_dir, &mutation.id);
                        if let Err(e) = state::save_result(&path, &result) {
                            tracing::error!(mutation = %mutation.id, error = %e, "failed to save result");
                        }
                    }

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if should_report(done, total, options) {
                        output::print_progress(done, total, &mutation.id, result.status);
                    }
                    relock(&slots)[index] = Some(result);
                }
            });
        }
    });

    if let Some(e) = fatal.into_inner().unwrap_or_else(PoisonError::into_inner) {
        return Err(e.into());
    }

    let results: Vec<MutationResult> = slots
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .into_iter()
        .flatten()
        .collect();
    let interrupted = results.len() < total;
    if interrupted {
        tracing::warn!(ran = results.len(), total, "batch interrupted");
    }

    let mut summary = BatchSummary::from_results(&results);
    summary.duration = start.elapsed();
    Ok(BatchOutcome {
        results,
        summary,
        interrupted,
    })
}

fn should_report(done: usize, total: usize, options: &BatchOptions) -> bool {
    options.verbose
        || done == total
        || (options.progress_every > 0 && done % options.progress_every == 0)
}

fn execute(
    mutation: &Mutation,
    oracle: &dyn TestOracle,
    options: &BatchOptions,
) -> Result<MutationResult, RunError> {
    match &options.isolation {
        Isolation::InProcess => runner::run_cycle(mutation, oracle, &options.cycle),
        Isolation::Subprocess {
            program,
            catalog,
            test_cmd,
            workdir,
        } => Ok(run_in_subprocess(
            mutation,
            program,
            catalog,
            test_cmd.as_deref(),
            workdir.as_deref(),
            options,
        )),
    }
}

/// Run one cycle through `program test` under an outer deadline. The child
/// writes the result file itself; a killed child leaves its backup behind,
/// which is restored here.
fn run_in_subprocess(
    mutation: &Mutation,
    program: &Path,
    catalog: &Path,
    test_cmd: Option<&str>,
    workdir: Option<&Path>,
    options: &BatchOptions,
) -> MutationResult {
    let result_file = state::result_path(&options.output_dir, &mutation.id);
    let cycle = &options.cycle;

    let mut cmd = Command::new(program);
    cmd.arg("test")
        .arg("--catalog")
        .arg(catalog)
        .arg("--id")
        .arg(&mutation.id)
        .arg("--output")
        .arg(&result_file)
        .arg("--timeout")
        .arg(format!("{}ms", cycle.timeout.as_millis()))
        .arg("--invalid-mutants")
        .arg(cycle.invalid_mutants.as_str());
    if !cycle.scope.is_empty() {
        cmd.arg("--scope").arg(&cycle.scope);
    }
    if let Some(test_cmd) = test_cmd {
        cmd.arg("--test-cmd").arg(test_cmd);
    }
    if let Some(dir) = workdir {
        cmd.arg("--workdir").arg(dir);
    }

    let detail = match oracle::run_with_deadline(cmd, cycle.timeout + SUBPROCESS_GRACE) {
        Ok(Completion::Exited { output, .. }) => output,
        Ok(Completion::TimedOut { output }) | Ok(Completion::Interrupted { output }) => {
            recover(mutation);
            format!("cycle subprocess did not finish in time\n{output}")
        }
        Err(e) => format!("failed to run {}: {e}", program.display()),
    };

    match state::load_result(&result_file) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(mutation = %mutation.id, error = %e, "no result from cycle subprocess");
            let mut result = MutationResult::new(mutation, MutationStatus::Error);
            result.test_output = oracle::truncate_output(&detail, cycle.max_output_bytes);
            result
        }
    }
}

fn recover(mutation: &Mutation) {
    let path = mutation.path();
    if let Some(backup) = safety::check_interrupted_run(path) {
        match safety::restore_from_backup(path, &backup) {
            Ok(()) => tracing::warn!(path = %path.display(), "restored from backup after killed cycle"),
            Err(e) => tracing::error!(
                path = %path.display(),
                backup = %backup.display(),
                error = %e,
                "CRITICAL: failed to restore from backup"
            ),
        }
    }
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Table of files with an active cycle. `lock` blocks until the file is free.
#[derive(Debug, Default)]
pub struct FileLocks {
    held: Mutex<HashSet<PathBuf>>,
    released: Condvar,
}

impl FileLocks {
    pub fn lock(&self, path: &Path) -> FileLock<'_> {
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut held = relock(&self.held);
        while held.contains(&key) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(key.clone());
        FileLock { table: self, key }
    }

    pub fn is_locked(&self, path: &Path) -> bool {
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        relock(&self.held).contains(&key)
    }
}

pub struct FileLock<'a> {
    table: &'a FileLocks,
    key: PathBuf,
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        relock(&self.table.held).remove(&self.key);
        self.table.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_report_every_nth_and_last() {
        let mut options = BatchOptions::from_config(&RunConfig::default(), "out");
        assert!(!should_report(3, 25, &options));
        assert!(should_report(10, 25, &options));
        assert!(should_report(25, 25, &options));

        options.verbose = true;
        assert!(should_report(3, 25, &options));
    }

    #[test]
    fn test_progress_every_zero_reports_only_last() {
        let mut options = BatchOptions::from_config(&RunConfig::default(), "out");
        options.progress_every = 0;
        assert!(!should_report(10, 25, &options));
        assert!(should_report(25, 25, &options));
    }
}
