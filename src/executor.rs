//! Plan execution.
//!
//! Applies reviewed operations to the filesystem one by one. Each operation
//! re-checks the world before acting: the source must still exist and the
//! destination must still be free. A failure is counted and the run goes on.

use crate::plan::{Action, Operation, PlanStore, PlanStoreError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Why a single operation could not be applied.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("Source no longer exists: {}", .0.display())]
    SourceMissing(PathBuf),
    #[error("Destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),
    #[error("Unsupported action for {}", .0.display())]
    Unsupported(PathBuf),
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// Outcome counts for a batch of operations.
#[derive(Debug, Default, Clone)]
pub struct ExecutionSummary {
    pub succeeded: usize,
    pub source_missing: usize,
    pub destination_exists: usize,
    pub unsupported: usize,
    pub io_errors: usize,
    /// Every failed operation's source and error message.
    pub failures: Vec<(PathBuf, String)>,
}

impl ExecutionSummary {
    /// Records the outcome of one operation.
    pub fn record(&mut self, operation: &Operation, result: Result<(), ExecuteError>) {
        let err = match result {
            Ok(()) => {
                self.succeeded += 1;
                return;
            }
            Err(err) => err,
        };

        match &err {
            ExecuteError::SourceMissing(_) => self.source_missing += 1,
            ExecuteError::DestinationExists(_) => self.destination_exists += 1,
            ExecuteError::Unsupported(_) => self.unsupported += 1,
            ExecuteError::DirectoryCreationFailed { .. } | ExecuteError::MoveFailed { .. } => {
                self.io_errors += 1
            }
        }
        warn!(error = %err, "operation failed");
        self.failures.push((operation.source.clone(), err.to_string()));
    }

    pub fn failure_count(&self) -> usize {
        self.source_missing + self.destination_exists + self.unsupported + self.io_errors
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failure_count()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failure_count() == 0
    }

    /// Adds another summary's counts to this one.
    pub fn merge(&mut self, other: ExecutionSummary) {
        self.succeeded += other.succeeded;
        self.source_missing += other.source_missing;
        self.destination_exists += other.destination_exists;
        self.unsupported += other.unsupported;
        self.io_errors += other.io_errors;
        self.failures.extend(other.failures);
    }
}

pub trait Executor {
    fn apply(&self, operation: &Operation) -> Result<(), ExecuteError>;

    /// Applies every operation in order, recording each outcome.
    fn apply_all(&self, operations: &[Operation]) -> ExecutionSummary {
        let mut summary = ExecutionSummary::default();
        for operation in operations {
            summary.record(operation, self.apply(operation));
        }
        summary
    }

    /// Loads a persisted batch and applies it.
    fn apply_batch(&self, path: &Path) -> Result<ExecutionSummary, PlanStoreError> {
        let operations = PlanStore::load(path)?;
        Ok(self.apply_all(&operations))
    }
}

/// Applies operations with plain filesystem renames.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsExecutor;

impl Executor for FsExecutor {
    fn apply(&self, operation: &Operation) -> Result<(), ExecuteError> {
        if operation.action == Action::Unsupported {
            return Err(ExecuteError::Unsupported(operation.source.clone()));
        }
        if !operation.source.exists() {
            return Err(ExecuteError::SourceMissing(operation.source.clone()));
        }
        if operation.destination.exists() {
            return Err(ExecuteError::DestinationExists(
                operation.destination.clone(),
            ));
        }

        if let Some(parent) = operation.destination.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|source| ExecuteError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::rename(&operation.source, &operation.destination).map_err(|source| {
            ExecuteError::MoveFailed {
                from: operation.source.clone(),
                to: operation.destination.clone(),
                source,
            }
        })?;

        debug!(
            action = %operation.action,
            from = %operation.source.display(),
            to = %operation.destination.display(),
            "operation applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Plan, PlanKind};
    use tempfile::TempDir;

    fn operation(action: Action, source: PathBuf, destination: PathBuf) -> Operation {
        Operation {
            origin: PlanKind::CleanFiles,
            action,
            source,
            destination,
            size_mb: 0.0,
        }
    }

    #[test]
    fn test_apply_creates_missing_parents() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let base = temp.path();
        let source = base.join("junk.txt");
        fs::write(&source, "x").expect("Failed to write test file");

        let destination = base.join(".delete/20240102/junk.txt");
        FsExecutor
            .apply(&operation(Action::Move, source.clone(), destination.clone()))
            .expect("Failed to apply operation");

        assert!(!source.exists());
        assert!(destination.exists());
    }

    #[test]
    fn test_apply_moves_directories() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let base = temp.path();
        fs::create_dir_all(base.join("A/inner")).unwrap();
        fs::write(base.join("A/inner/file.txt"), "x").unwrap();

        FsExecutor
            .apply(&operation(Action::Rename, base.join("A"), base.join("B")))
            .unwrap();

        assert!(base.join("B/inner/file.txt").exists());
    }

    #[test]
    fn test_apply_refuses_existing_destination() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let base = temp.path();
        fs::write(base.join("a.txt"), "a").unwrap();
        fs::write(base.join("b.txt"), "b").unwrap();

        let result = FsExecutor.apply(&operation(
            Action::Rename,
            base.join("a.txt"),
            base.join("b.txt"),
        ));

        assert!(matches!(result, Err(ExecuteError::DestinationExists(_))));
        assert_eq!(fs::read_to_string(base.join("b.txt")).unwrap(), "b");
    }

    #[test]
    fn test_apply_all_counts_each_failure_kind() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let base = temp.path();
        fs::write(base.join("ok.txt"), "x").unwrap();
        fs::write(base.join("taken.txt"), "x").unwrap();
        fs::write(base.join("src.txt"), "x").unwrap();

        let operations = vec![
            operation(Action::Move, base.join("ok.txt"), base.join("moved/ok.txt")),
            operation(Action::Move, base.join("gone.txt"), base.join("moved/gone.txt")),
            operation(Action::Rename, base.join("src.txt"), base.join("taken.txt")),
            operation(Action::Unsupported, base.join("src.txt"), base.join("copy.txt")),
        ];
        let summary = FsExecutor.apply_all(&operations);

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.source_missing, 1);
        assert_eq!(summary.destination_exists, 1);
        assert_eq!(summary.unsupported, 1);
        assert_eq!(summary.io_errors, 0);
        assert_eq!(summary.failures.len(), 3);
        assert_eq!(summary.total(), 4);
        assert!(!summary.is_complete_success());
    }

    #[test]
    fn test_apply_batch_from_store() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let base = temp.path();
        fs::write(base.join("a.txt"), "x").unwrap();

        let mut plan = Plan::new(PlanKind::Rename);
        plan.push(Action::Rename, base.join("a.txt"), base.join("b.txt"), 1);
        let files = PlanStore::new(base.join("ops"), 10)
            .save_with_timestamp(&plan, "20240101_000000")
            .unwrap();

        let summary = FsExecutor.apply_batch(&files[0]).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert!(base.join("b.txt").exists());
    }

    #[test]
    fn test_summary_merge() {
        let mut total = ExecutionSummary {
            succeeded: 2,
            ..ExecutionSummary::default()
        };
        total.merge(ExecutionSummary {
            succeeded: 1,
            io_errors: 1,
            failures: vec![(PathBuf::from("/x"), "boom".to_string())],
            ..ExecutionSummary::default()
        });
        assert_eq!(total.succeeded, 3);
        assert_eq!(total.failure_count(), 1);
        assert_eq!(total.failures.len(), 1);
    }
}
