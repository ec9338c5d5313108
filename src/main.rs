use mutscore::batch::{self, BatchOptions, Filters, Isolation};
use mutscore::config::{self, InvalidMutantPolicy, RunConfig};
use mutscore::error::{BatchError, RunError};
use mutscore::generator::{self, GenerateOptions, LineRange};
use mutscore::mutants::{Mutation, MutationKind, Priority};
use mutscore::oracle::{self, CommandOracle};
use mutscore::report;
use mutscore::runner::{self, CycleOptions};
use mutscore::{applicator, output, safety, state};

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Exit code for bad input: missing files, unknown ids, unparsable sources.
const EXIT_INPUT: i32 = 2;
/// Exit code for environment trouble: restoration failures, recovered runs.
const EXIT_ENVIRONMENT: i32 = 3;

#[derive(Parser)]
#[command(name = "mutscore", version, about = "Mutation testing: generate, apply and score mutants")]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct OracleArgs {
    /// Per-mutation test timeout (e.g. 60s, 2m, 500ms)
    #[arg(long, value_parser = config::parse_duration)]
    timeout: Option<Duration>,
    /// Test command (default: per language, e.g. "go test -v")
    #[arg(long)]
    test_cmd: Option<String>,
    /// Test scope appended to the test command (package, test file)
    #[arg(long)]
    scope: Option<String>,
    /// Directory the test command runs in
    #[arg(long)]
    workdir: Option<PathBuf>,
    /// What to do with mutants that no longer parse
    #[arg(long, value_enum)]
    invalid_mutants: Option<InvalidMutantPolicy>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum IsolationMode {
    InProcess,
    Subprocess,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the mutation catalog for a source file
    Generate {
        /// Source file to analyze
        file: PathBuf,
        /// Only mutate inside this function
        #[arg(short, long)]
        function: Option<String>,
        /// Only mutate this line range (e.g. 100-200)
        #[arg(short, long)]
        lines: Option<String>,
        /// Write the catalog here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the functions declared in a source file
    Functions { file: PathBuf },
    /// Print the mutated text for one mutation without touching the file
    Apply {
        #[arg(short, long)]
        catalog: PathBuf,
        /// Mutation id (e.g. M0)
        #[arg(short, long)]
        id: String,
        /// Write the mutated source here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Skip the re-parse check
        #[arg(long)]
        no_verify: bool,
    },
    /// Run one mutate, test, restore cycle
    Test {
        #[arg(short, long)]
        catalog: PathBuf,
        #[arg(short, long)]
        id: String,
        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        oracle: OracleArgs,
    },
    /// Run every (filtered) mutation in a catalog
    Batch {
        #[arg(short, long)]
        catalog: PathBuf,
        /// Directory for per-mutation result files
        #[arg(long, default_value = "mutation-results")]
        output_dir: PathBuf,
        /// Requested workers. Clamped to 1: mutations rewrite files in place
        #[arg(long)]
        max_concurrency: Option<usize>,
        /// Skip mutations below the low-line threshold (imports, headers)
        #[arg(long, value_name = "BOOL")]
        skip_low_lines: Option<bool>,
        /// Only test mutations at or after this line
        #[arg(long)]
        min_line: Option<usize>,
        /// Only test mutations at or before this line (0 = no limit)
        #[arg(long)]
        max_line: Option<usize>,
        /// Only test these categories (repeatable)
        #[arg(long = "category", value_name = "TYPE")]
        categories: Vec<MutationKind>,
        /// Only test mutations of at least this priority
        #[arg(long)]
        min_priority: Option<Priority>,
        /// Run each cycle in this process or in a child process
        #[arg(long, value_enum, default_value = "in-process")]
        isolation: IsolationMode,
        #[command(flatten)]
        oracle: OracleArgs,
    },
    /// Aggregate result files into a report
    Report {
        /// Glob for result files (e.g. 'mutation-results/*.json')
        #[arg(short, long)]
        results: String,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Restore a file left mutated by an interrupted run
    Restore { file: PathBuf },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{e:#}"));
            exit_code_for(&e)
        }
    };
    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    let restoration = error.chain().any(|cause| {
        cause.downcast_ref::<RunError>().is_some()
            || matches!(cause.downcast_ref::<BatchError>(), Some(BatchError::Run(_)))
    });
    if restoration { EXIT_ENVIRONMENT } else { EXIT_INPUT }
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = RunConfig::load(Path::new(".")).context("failed to load configuration")?;
    config.verbose |= cli.verbose;

    match cli.command {
        Commands::Generate {
            file,
            function,
            lines,
            output,
        } => cmd_generate(&file, function, lines.as_deref(), output.as_deref()),
        Commands::Functions { file } => cmd_functions(&file),
        Commands::Apply {
            catalog,
            id,
            output,
            no_verify,
        } => cmd_apply(&catalog, &id, output.as_deref(), !no_verify),
        Commands::Test {
            catalog,
            id,
            output,
            oracle,
        } => {
            oracle.merge_into(&mut config);
            cmd_test(&catalog, &id, output.as_deref(), oracle.workdir.as_deref(), &config)
        }
        Commands::Batch {
            catalog,
            output_dir,
            max_concurrency,
            skip_low_lines,
            min_line,
            max_line,
            categories,
            min_priority,
            isolation,
            oracle,
        } => {
            oracle.merge_into(&mut config);
            if let Some(n) = max_concurrency {
                config.max_concurrency = n;
            }
            if let Some(skip) = skip_low_lines {
                config.skip_low_lines = skip;
            }
            if let Some(line) = min_line {
                config.min_line = line;
            }
            if let Some(line) = max_line {
                config.max_line = line;
            }
            if !categories.is_empty() {
                config.categories = categories;
            }
            if min_priority.is_some() {
                config.min_priority = min_priority;
            }
            cmd_batch(&catalog, output_dir, isolation, oracle.workdir.as_deref(), &config)
        }
        Commands::Report { results, output } => cmd_report(&results, output.as_deref()),
        Commands::Restore { file } => cmd_restore(&file),
    }
}

impl OracleArgs {
    fn merge_into(&self, config: &mut RunConfig) {
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(cmd) = &self.test_cmd {
            config.test_cmd = Some(cmd.clone());
        }
        if let Some(scope) = &self.scope {
            config.scope = scope.clone();
        }
        if let Some(policy) = self.invalid_mutants {
            config.invalid_mutants = policy;
        }
    }
}

fn write_or_print(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
            std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn cmd_generate(
    file: &Path,
    function: Option<String>,
    lines: Option<&str>,
    output_path: Option<&Path>,
) -> Result<i32> {
    let lines = lines.map(str::parse::<LineRange>).transpose()?;
    let options = GenerateOptions { function, lines };
    let mutations = generator::generate_file(file, &options)?;

    match output_path {
        Some(path) => state::save_catalog(path, &mutations)?,
        None => println!("{}", serde_json::to_string_pretty(&mutations)?),
    }
    output::print_catalog_summary(&file.display().to_string(), &mutations);
    Ok(0)
}

fn cmd_functions(file: &Path) -> Result<i32> {
    let language = mutscore::detect_language(file)
        .ok_or_else(|| anyhow::anyhow!("unsupported file type: {}", file.display()))?;
    let source =
        std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let names = generator::list_functions(language, &source)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    for name in names {
        println!("{name}");
    }
    Ok(0)
}

fn load_mutation(catalog: &Path, id: &str) -> Result<Mutation> {
    let mutations = state::load_catalog(catalog)?;
    Ok(state::find_mutation(&mutations, id)?.clone())
}

fn cmd_apply(catalog: &Path, id: &str, output_path: Option<&Path>, verify: bool) -> Result<i32> {
    let mutation = load_mutation(catalog, id)?;
    let source = std::fs::read_to_string(mutation.path())
        .with_context(|| format!("failed to read {}", mutation.file))?;
    let mutated = applicator::apply(&mutation, &source)
        .with_context(|| format!("failed to apply mutation {}", mutation.id))?;

    if verify {
        if let Err(e) = applicator::verify(&mutation, &mutated) {
            output::print_warning(&format!(
                "mutated code does not parse ({e}); the compiler will likely reject it"
            ));
        }
    }

    write_or_print(output_path, &mutated)?;
    if output_path.is_some() {
        output::print_success(&format!("{}: {}", mutation.id, mutation.description));
    }
    Ok(0)
}

/// Recover a file left behind by an interrupted cycle. Returns true when a
/// recovery happened and the caller should stop.
fn recover_interrupted(file: &Path) -> Result<bool> {
    let Some(backup) = safety::check_interrupted_run(file) else {
        return Ok(false);
    };
    safety::restore_from_backup(file, &backup)
        .with_context(|| format!("failed to restore {} from {}", file.display(), backup.display()))?;
    output::print_error(&format!(
        "Recovered {} from a previously interrupted run. Re-run to continue.",
        file.display()
    ));
    Ok(true)
}

fn build_oracle(config: &RunConfig, mutations: &[Mutation], workdir: Option<&Path>) -> Result<CommandOracle> {
    let test_cmd = match &config.test_cmd {
        Some(cmd) => cmd.clone(),
        None => {
            let language = mutations
                .iter()
                .find_map(|m| mutscore::detect_language(m.path()))
                .ok_or_else(|| anyhow::anyhow!("cannot pick a default test command; pass --test-cmd"))?;
            language.default_test_cmd().to_string()
        }
    };
    if test_cmd.trim().is_empty() {
        bail!("test command is empty");
    }
    let oracle = CommandOracle::new(&test_cmd);
    Ok(match workdir {
        Some(dir) => oracle.with_working_dir(dir),
        None => oracle,
    })
}

fn cmd_test(
    catalog: &Path,
    id: &str,
    output_path: Option<&Path>,
    workdir: Option<&Path>,
    config: &RunConfig,
) -> Result<i32> {
    let mutation = load_mutation(catalog, id)?;
    if recover_interrupted(mutation.path())? {
        return Ok(EXIT_ENVIRONMENT);
    }
    if let Err(e) = oracle::install_interrupt_handler() {
        tracing::warn!(error = %e, "Ctrl-C handler not installed");
    }

    let test_oracle = build_oracle(config, std::slice::from_ref(&mutation), workdir)?;
    let result = runner::run_cycle(&mutation, &test_oracle, &CycleOptions::from_config(config))?;

    match output_path {
        Some(path) => state::save_result(path, &result)?,
        None => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    output::print_result(&result);
    Ok(0)
}

fn cmd_batch(
    catalog: &Path,
    output_dir: PathBuf,
    isolation: IsolationMode,
    workdir: Option<&Path>,
    config: &RunConfig,
) -> Result<i32> {
    let mutations = state::load_catalog(catalog)?;
    let filtered = batch::filter_mutations(&mutations, &Filters::from_config(config));
    println!(
        "Loaded {} mutations, testing {} mutations (filtered: {})",
        mutations.len(),
        filtered.len(),
        mutations.len() - filtered.len()
    );
    if filtered.is_empty() {
        println!("No mutations to test");
        return Ok(0);
    }

    let mut files: Vec<&Path> = filtered.iter().map(Mutation::path).collect();
    files.sort();
    files.dedup();
    for file in files {
        if recover_interrupted(file)? {
            return Ok(EXIT_ENVIRONMENT);
        }
    }
    if let Err(e) = oracle::install_interrupt_handler() {
        tracing::warn!(error = %e, "Ctrl-C handler not installed");
    }

    let test_oracle = build_oracle(config, &filtered, workdir)?;
    let mut options = BatchOptions::from_config(config, &output_dir);
    if isolation == IsolationMode::Subprocess {
        options.isolation = Isolation::Subprocess {
            program: std::env::current_exe().context("cannot locate own executable")?,
            catalog: catalog.to_path_buf(),
            test_cmd: config.test_cmd.clone(),
            workdir: workdir.map(Path::to_path_buf),
        };
    }

    let outcome = batch::run_batch(&filtered, &test_oracle, &options)?;
    output::print_batch_summary(&outcome.summary);
    eprintln!(
        "\nAggregate with:\n  mutscore report --results '{}/*.json' --output mutation-report.json",
        output_dir.display()
    );
    if outcome.interrupted {
        output::print_warning("batch interrupted; remaining mutations were not run");
        return Ok(130);
    }
    Ok(0)
}

fn cmd_report(pattern: &str, output_path: Option<&Path>) -> Result<i32> {
    let results = report::load_results(pattern)?;
    let aggregated = report::aggregate(results);

    match output_path {
        Some(path) => {
            state::save_json(path, &aggregated)?;
            output::print_success(&format!("Results written to {}", path.display()));
        }
        None => println!("{}", serde_json::to_string_pretty(&aggregated)?),
    }
    output::print_report_summary(&aggregated);
    Ok(0)
}

fn cmd_restore(file: &Path) -> Result<i32> {
    match safety::check_interrupted_run(file) {
        Some(backup) => {
            safety::restore_from_backup(file, &backup).with_context(|| {
                format!("failed to restore {} from {}", file.display(), backup.display())
            })?;
            output::print_success(&format!("Restored {} from {}", file.display(), backup.display()));
        }
        None => output::print_success(&format!("{}: no backup found, nothing to restore", file.display())),
    }
    Ok(0)
}
