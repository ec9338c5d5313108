use console::Style;

use crate::batch::BatchSummary;
use crate::mutants::{Mutation, MutationResult, MutationStatus};
use crate::report::{AggregatedReport, Verdict};

pub fn print_error(msg: &str) {
    let style = Style::new().red().bold();
    eprintln!("{} {}", style.apply_to("✗"), msg);
}

pub fn print_success(msg: &str) {
    let style = Style::new().green().bold();
    eprintln!("{} {}", style.apply_to("✓"), msg);
}

pub fn print_warning(msg: &str) {
    let style = Style::new().yellow().bold();
    eprintln!("{} {}", style.apply_to("WARNING:"), msg);
}

fn status_style(status: MutationStatus) -> Style {
    match status {
        MutationStatus::Killed => Style::new().green(),
        MutationStatus::Survived => Style::new().red().bold(),
        MutationStatus::Timeout => Style::new().yellow(),
        MutationStatus::Error => Style::new().magenta(),
    }
}

pub fn print_progress(done: usize, total: usize, id: &str, status: MutationStatus) {
    let dim = Style::new().dim();
    println!(
        "{} {}: {}",
        dim.apply_to(format!("[{done}/{total}]")),
        id,
        status_style(status).apply_to(status)
    );
}

pub fn print_catalog_summary(file: &str, mutations: &[Mutation]) {
    let high = mutations
        .iter()
        .filter(|m| m.priority == crate::mutants::Priority::High)
        .count();
    print_success(&format!(
        "{}: {} mutations ({} high priority)",
        file,
        mutations.len(),
        high
    ));
}

pub fn print_result(result: &MutationResult) {
    let style = status_style(result.status);
    eprintln!(
        "{} {} {}:{} {}",
        style.apply_to(result.status.to_string().to_uppercase()),
        result.mutation_id,
        result.file,
        result.line,
        Style::new().dim().apply_to(&result.description)
    );
    if result.status == MutationStatus::Survived && !result.diff.is_empty() {
        for line in result.diff.lines() {
            let style = if line.starts_with('-') {
                Style::new().red()
            } else {
                Style::new().green()
            };
            eprintln!("    {}", style.apply_to(line));
        }
    }
}

pub fn print_batch_summary(summary: &BatchSummary) {
    let rule = "=".repeat(60);
    let percent = |n: usize| {
        if summary.total == 0 {
            0.0
        } else {
            n as f64 / summary.total as f64 * 100.0
        }
    };

    println!("\n{rule}");
    println!("Mutation Testing Complete");
    println!("{rule}");
    println!("Total:    {}", summary.total);
    println!("Killed:   {} ({:.1}%)", summary.killed, percent(summary.killed));
    println!("Survived: {} ({:.1}%)", summary.survived, percent(summary.survived));
    println!("Timeout:  {}", summary.timeouts);
    println!("Errors:   {}", summary.errors);
    if summary.testable() > 0 {
        println!(
            "\nMutation Score: {:.1}% ({}/{} killed, {} timeouts excluded)",
            summary.score(),
            summary.killed,
            summary.testable(),
            summary.timeouts
        );
    }
    println!("Duration: {:.1}s", summary.duration.as_secs_f64());
    println!("{rule}");
}

pub fn print_report_summary(report: &AggregatedReport) {
    let percent = |n: usize| {
        if report.total_mutations == 0 {
            0.0
        } else {
            n as f64 / report.total_mutations as f64 * 100.0
        }
    };
    let heading = Style::new().bold();

    eprintln!("\n{}", heading.apply_to("=== Mutation Testing Summary ==="));
    eprintln!("Total Mutations: {}", report.total_mutations);
    eprintln!("Killed: {} ({:.1}%)", report.killed, percent(report.killed));
    eprintln!("Survived: {} ({:.1}%)", report.survived, percent(report.survived));
    eprintln!("Timeouts: {}", report.timeouts);
    eprintln!("Errors: {}", report.errors);
    eprintln!("\nMutation Score: {:.1}%", report.mutation_score);
    eprintln!("Total Duration: {:.2} seconds", report.total_duration_ms / 1000.0);

    if !report.survivors.is_empty() {
        eprintln!("\n{}", heading.apply_to("=== Surviving Mutants ==="));
        let loc = Style::new().dim();
        for survivor in &report.survivors {
            eprintln!(
                "- {} - {} ({})",
                loc.apply_to(format!("{}:{}", survivor.file, survivor.line)),
                survivor.description,
                survivor.mutation_id
            );
        }

        eprintln!("\n{}", heading.apply_to("=== Survivors by Type ==="));
        for (kind, count) in &report.survivors_by_type {
            eprintln!("- {kind}: {count}");
        }
    }

    let verdict = report.verdict();
    let (mark, style) = match verdict {
        Verdict::Excellent | Verdict::Good => ("✓", Style::new().green().bold()),
        Verdict::Fair => ("!", Style::new().yellow().bold()),
        Verdict::Poor => ("✗", Style::new().red().bold()),
    };
    eprintln!("\n{}", heading.apply_to("=== Quality Assessment ==="));
    eprintln!(
        "{} {}: {}",
        style.apply_to(mark),
        style.apply_to(verdict),
        verdict.message()
    );
}
