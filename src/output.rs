//! Output formatting and styling module.
//!
//! All user-facing console output goes through [`OutputFormatter`], so plan
//! previews, summaries and progress share one look. Diagnostics go through
//! `tracing` instead and land on stderr.

use crate::enrich::EnrichReport;
use crate::executor::ExecutionSummary;
use crate::plan::{Action, Plan, PlanKind};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use vidtidy::output::OutputFormatter;
    /// OutputFormatter::success("Plan saved");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for applying `total` operations.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use vidtidy::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_with_message("done");
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints every operation in a plan followed by its skipped folders.
    pub fn plan_preview(plan: &Plan) {
        Self::header(&format!("PLAN: {}", plan.kind()));

        if plan.is_empty() {
            Self::info("Nothing to do.");
        }
        for op in plan.operations() {
            let action = match op.action {
                Action::Move => op.action.to_string().yellow(),
                Action::Rename => op.action.to_string().blue(),
                Action::Unsupported => op.action.to_string().red(),
            };
            println!(
                " {:<6} {} ({:.2} MB)",
                action,
                op.source.display(),
                op.size_mb
            );
            println!("        → {}", op.destination.display().to_string().green());
        }

        if !plan.skipped().is_empty() {
            Self::header("SKIPPED");
            for skipped in plan.skipped() {
                println!(" - {}: {}", skipped.path.display(), skipped.reason);
            }
        }

        let unmapped = plan.unmapped_performers();
        if !unmapped.is_empty() {
            Self::warning(&format!(
                "{} performer(s) need a name mapping in [actors.mapping]: {}",
                unmapped.len(),
                unmapped.join(", ")
            ));
        }
    }

    /// Prints operation counts and sizes grouped by planner and action.
    pub fn plan_summary(plan: &Plan) {
        let mut rows: BTreeMap<(PlanKind, String), (usize, f64)> = BTreeMap::new();
        for op in plan.operations() {
            let row = rows
                .entry((op.origin, op.action.to_string()))
                .or_insert((0, 0.0));
            row.0 += 1;
            row.1 += op.size_mb;
        }

        Self::header("SUMMARY");
        let width = rows
            .keys()
            .map(|(kind, action)| kind.as_str().len() + action.len() + 1)
            .max()
            .unwrap_or(0)
            .max(9);

        println!(
            "{:<width$} | {:>5} | {}",
            "Operation".bold(),
            "Count".bold(),
            "Size".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 24));
        for ((kind, action), (count, size)) in &rows {
            println!(
                "{:<width$} | {:>5} | {:.2} MB",
                format!("{kind}/{action}"),
                count.to_string().green(),
                size,
                width = width
            );
        }
        println!("{}", "-".repeat(width + 24));
        println!(
            "{:<width$} | {:>5} | {:.2} MB",
            "Total".bold(),
            plan.len().to_string().green().bold(),
            plan.total_size_mb(),
            width = width
        );
    }

    /// Prints the outcome of applying one or more batches.
    pub fn execution_summary(summary: &ExecutionSummary) {
        Self::header("RESULT");
        println!("  Applied:            {}", summary.succeeded.to_string().green());
        let failures = [
            ("Source missing", summary.source_missing),
            ("Destination exists", summary.destination_exists),
            ("Unsupported action", summary.unsupported),
            ("I/O errors", summary.io_errors),
        ];
        for (label, count) in failures {
            if count > 0 {
                println!("  {:<19} {}", format!("{label}:"), count.to_string().red());
            }
        }
        for (path, reason) in &summary.failures {
            eprintln!("    - {}: {}", path.display(), reason);
        }
    }

    pub fn enrich_summary(report: &EnrichReport) {
        Self::header("ENRICH");
        println!("  Updated:   {}", report.updated.to_string().green());
        println!("  Unchanged: {}", report.unchanged);
        if !report.failed.is_empty() {
            println!("  Failed:    {}", report.failed.len().to_string().red());
            for (path, reason) in &report.failed {
                eprintln!("    - {}: {}", path.display(), reason);
            }
        }
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}
