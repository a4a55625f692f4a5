//! Command-line interface module for vidtidy.
//!
//! Parses arguments with clap and orchestrates the library: load
//! configuration, scan, build a plan, preview it, and optionally persist or
//! apply reviewed batches.

use crate::config::Config;
use crate::enrich::enrich_tree;
use crate::executor::{ExecutionSummary, Executor, FsExecutor};
use crate::output::OutputFormatter;
use crate::plan::{PlanKind, PlanStore};
use crate::planners::{planner_for, scan_root};
use crate::scanner::TreeScanner;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "vidtidy")]
#[command(about = "Plan reviewable move/rename operations for a video library", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./.vidtidyrc.toml, then ~/.config/vidtidy/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Library root, overriding `library.root`
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the library and preview a plan
    Plan {
        #[arg(value_enum)]
        kind: PlanArg,

        /// Write the plan to the plan directory for later review
        #[arg(long)]
        save: bool,
    },
    /// Apply one or more reviewed plan files in order
    Apply {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print the operations without touching the filesystem
        #[arg(long)]
        dry_run: bool,
    },
    /// Add placeholder performers to metadata files that lack any
    Enrich,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanArg {
    CleanFolders,
    CleanFiles,
    Rename,
    Actors,
    Wide,
    Movies,
}

impl From<PlanArg> for PlanKind {
    fn from(arg: PlanArg) -> Self {
        match arg {
            PlanArg::CleanFolders => PlanKind::CleanFolders,
            PlanArg::CleanFiles => PlanKind::CleanFiles,
            PlanArg::Rename => PlanKind::Rename,
            PlanArg::Actors => PlanKind::ActorClassify,
            PlanArg::Wide => PlanKind::WideVideo,
            PlanArg::Movies => PlanKind::MovieOrganize,
        }
    }
}

/// Runs the command described by `cli`.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use vidtidy::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["vidtidy", "--root", "/videos", "plan", "clean-folders"]);
/// if let Err(e) = run_cli(cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: Cli) -> Result<(), String> {
    let mut config = Config::load(cli.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    if let Some(root) = cli.root {
        config.library.root = root;
    }

    match cli.command {
        Commands::Plan { kind, save } => plan(&config, kind.into(), save),
        Commands::Apply { files, dry_run } => apply(&files, dry_run),
        Commands::Enrich => enrich(&config),
    }
}

fn plan(config: &Config, kind: PlanKind, save: bool) -> Result<(), String> {
    let root = scan_root(kind, config);
    OutputFormatter::info(&format!("Scanning {}", root.display()));

    let scanner =
        TreeScanner::new(config).map_err(|e| format!("Error compiling filters: {}", e))?;
    let tree = scanner
        .scan(root)
        .map_err(|e| format!("Error scanning library: {}", e))?;
    let planner =
        planner_for(kind, config).map_err(|e| format!("Error loading resolver: {}", e))?;
    let plan = planner.plan(&tree);

    OutputFormatter::plan_preview(&plan);
    if plan.is_empty() {
        return Ok(());
    }
    OutputFormatter::plan_summary(&plan);

    if !save {
        OutputFormatter::dry_run_notice("Nothing was changed. Re-run with --save to write the plan.");
        return Ok(());
    }

    let store = PlanStore::new(&config.library.plan_dir, config.library.batch_size);
    let written = store
        .save(&plan)
        .map_err(|e| format!("Error saving plan: {}", e))?;
    for path in &written {
        OutputFormatter::success(&format!("Plan written to {}", path.display()));
    }
    OutputFormatter::plain("Review the file(s), then run 'vidtidy apply <FILE>' to execute.");
    Ok(())
}

fn apply(files: &[PathBuf], dry_run: bool) -> Result<(), String> {
    let mut batches = Vec::with_capacity(files.len());
    for path in files {
        let operations =
            PlanStore::load(path).map_err(|e| format!("Error reading plan: {}", e))?;
        batches.push(operations);
    }

    if dry_run {
        for op in batches.iter().flatten() {
            OutputFormatter::dry_run_notice(&format!(
                "{} {} → {}",
                op.action,
                op.source.display(),
                op.destination.display()
            ));
        }
        return Ok(());
    }

    let total: usize = batches.iter().map(Vec::len).sum();
    let pb = OutputFormatter::create_progress_bar(total as u64);
    let executor = FsExecutor;
    let mut summary = ExecutionSummary::default();

    for (path, operations) in files.iter().zip(&batches) {
        pb.set_message(path.display().to_string());
        summary.merge(executor.apply_all(operations));
        pb.inc(operations.len() as u64);
    }
    pb.finish_with_message("done");
    info!(
        succeeded = summary.succeeded,
        failed = summary.failure_count(),
        "plan applied"
    );

    OutputFormatter::execution_summary(&summary);
    if summary.is_complete_success() {
        OutputFormatter::success("All operations applied.");
    } else {
        OutputFormatter::warning(&format!(
            "{} of {} operations failed. Re-plan to pick up the current state.",
            summary.failure_count(),
            summary.total()
        ));
    }
    Ok(())
}

fn enrich(config: &Config) -> Result<(), String> {
    let root = &config.library.root;
    let scanner =
        TreeScanner::new(config).map_err(|e| format!("Error compiling filters: {}", e))?;
    let tree = scanner
        .scan(root)
        .map_err(|e| format!("Error scanning library: {}", e))?;

    let report = enrich_tree(&tree, &config.actors.placeholder_codes);
    OutputFormatter::enrich_summary(&report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan_command() {
        let cli = Cli::parse_from(["vidtidy", "--root", "/videos", "plan", "actors", "--save"]);
        assert_eq!(cli.root, Some(PathBuf::from("/videos")));
        match cli.command {
            Commands::Plan { kind, save } => {
                assert_eq!(PlanKind::from(kind), PlanKind::ActorClassify);
                assert!(save);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_apply_requires_files() {
        assert!(Cli::try_parse_from(["vidtidy", "apply"]).is_err());
        let cli = Cli::try_parse_from(["vidtidy", "apply", "a.json", "b.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Apply { ref files, dry_run: false } if files.len() == 2));
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::parse_from(["vidtidy", "enrich", "--config", "lib.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("lib.toml")));
        assert!(matches!(cli.command, Commands::Enrich));
    }
}
