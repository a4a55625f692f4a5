/// Operation plans and their persistence.
///
/// A plan is the reviewable output of a planner: an ordered list of move or
/// rename operations that nothing has executed yet. Plans are written to disk
/// as JSON batches so they can be inspected, edited, and applied later.
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// The filesystem action an operation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Move,
    Rename,
    /// Anything a hand-edited plan file names that we do not understand.
    #[serde(other)]
    Unsupported,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move => write!(f, "MOVE"),
            Action::Rename => write!(f, "RENAME"),
            Action::Unsupported => write!(f, "UNSUPPORTED"),
        }
    }
}

/// The planner that produced an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    CleanFolders,
    CleanFiles,
    Rename,
    ActorClassify,
    WideVideo,
    MovieOrganize,
}

impl PlanKind {
    /// Identifier used in plan files and batch file names.
    pub fn as_str(self) -> &'static str {
        match self {
            PlanKind::CleanFolders => "clean_folders",
            PlanKind::CleanFiles => "clean_files",
            PlanKind::Rename => "rename",
            PlanKind::ActorClassify => "actor_classify",
            PlanKind::WideVideo => "wide_video",
            PlanKind::MovieOrganize => "movie_organize",
        }
    }
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single planned move or rename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "function")]
    pub origin: PlanKind,
    pub action: Action,
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Size of the moved file or folder in megabytes, two decimals.
    pub size_mb: f64,
}

/// Converts a byte count to megabytes rounded to two decimals.
pub fn size_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

/// Why a planner left a folder alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The performer's script needs a configured name mapping.
    UnmappedPerformer(String),
    /// A video already carries a multi-part marker.
    AlreadyMarked,
    /// More parts than the sequence pattern has values.
    SequenceExhausted(usize),
    /// The folder name already ends in the done marker.
    AlreadyOrganized,
    /// Folder metadata lacks the fields the planner needs.
    MissingMetadata,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnmappedPerformer(name) => {
                write!(f, "performer '{name}' has no name mapping")
            }
            SkipReason::AlreadyMarked => write!(f, "videos already carry part markers"),
            SkipReason::SequenceExhausted(count) => {
                write!(f, "{count} parts exceed the sequence pattern")
            }
            SkipReason::AlreadyOrganized => write!(f, "already organized"),
            SkipReason::MissingMetadata => write!(f, "no usable metadata"),
        }
    }
}

/// A folder a planner chose not to touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFolder {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// An ordered list of operations produced by one planner run.
///
/// The plan guarantees each source appears at most once and that no two
/// operations share a destination, provided destinations are obtained with
/// [`Plan::claim`].
#[derive(Debug, Clone)]
pub struct Plan {
    kind: PlanKind,
    operations: Vec<Operation>,
    sources: HashSet<PathBuf>,
    destinations: HashSet<PathBuf>,
    skipped: Vec<SkippedFolder>,
}

impl Plan {
    pub fn new(kind: PlanKind) -> Self {
        Self {
            kind,
            operations: Vec::new(),
            sources: HashSet::new(),
            destinations: HashSet::new(),
            skipped: Vec::new(),
        }
    }

    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    /// Appends an operation.
    ///
    /// Operations whose destination equals their source are dropped, as are
    /// operations for a source that is already planned. Returns whether the
    /// operation was added.
    pub fn push(
        &mut self,
        action: Action,
        source: PathBuf,
        destination: PathBuf,
        size_bytes: u64,
    ) -> bool {
        self.destinations.insert(destination.clone());
        if source == destination {
            debug!(path = %source.display(), "skipping no-op operation");
            return false;
        }
        if !self.sources.insert(source.clone()) {
            warn!(path = %source.display(), "source already planned, dropping duplicate");
            return false;
        }
        self.operations.push(Operation {
            origin: self.kind,
            action,
            source,
            destination,
            size_mb: size_mb(size_bytes),
        });
        true
    }

    /// Marks a destination as taken without planning an operation for it.
    pub fn reserve(&mut self, path: PathBuf) {
        self.destinations.insert(path);
    }

    /// Returns the first free destination produced by `candidate`.
    ///
    /// `candidate(None)` is the preferred path; `candidate(Some(n))` for
    /// `n = 2, 3, ...` yields discriminated alternatives.
    pub fn claim(&self, candidate: impl Fn(Option<usize>) -> PathBuf) -> PathBuf {
        let preferred = candidate(None);
        if !self.destinations.contains(&preferred) {
            return preferred;
        }
        let mut n = 2;
        loop {
            let path = candidate(Some(n));
            if !self.destinations.contains(&path) {
                debug!(
                    preferred = %preferred.display(),
                    chosen = %path.display(),
                    "destination collision resolved"
                );
                return path;
            }
            n += 1;
        }
    }

    pub fn skip(&mut self, path: PathBuf, reason: SkipReason) {
        debug!(path = %path.display(), %reason, "folder skipped");
        self.skipped.push(SkippedFolder { path, reason });
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn skipped(&self) -> &[SkippedFolder] {
        &self.skipped
    }

    /// Performer names that were skipped for lack of a name mapping, deduplicated.
    pub fn unmapped_performers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .skipped
            .iter()
            .filter_map(|s| match &s.reason {
                SkipReason::UnmappedPerformer(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn total_size_mb(&self) -> f64 {
        self.operations.iter().map(|op| op.size_mb).sum()
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}

/// Errors from reading or writing plan files.
#[derive(Debug, Error)]
pub enum PlanStoreError {
    #[error("Failed to create plan directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write plan file {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read plan file {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid plan file {}: {reason}", path.display())]
    InvalidFormat { path: PathBuf, reason: String },
}

/// Persists plans as JSON batch files.
#[derive(Debug, Clone)]
pub struct PlanStore {
    dir: PathBuf,
    batch_size: usize,
}

impl PlanStore {
    pub fn new(dir: impl Into<PathBuf>, batch_size: usize) -> Self {
        Self {
            dir: dir.into(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the plan using the current local time as the batch timestamp.
    pub fn save(&self, plan: &Plan) -> Result<Vec<PathBuf>, PlanStoreError> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        self.save_with_timestamp(plan, &timestamp)
    }

    /// Writes the plan as `{kind}_{timestamp}.json`, or as numbered
    /// `{kind}_{timestamp}_batchNNN.json` files when it exceeds the batch size.
    ///
    /// An empty plan writes nothing.
    pub fn save_with_timestamp(
        &self,
        plan: &Plan,
        timestamp: &str,
    ) -> Result<Vec<PathBuf>, PlanStoreError> {
        if plan.is_empty() {
            info!(kind = %plan.kind(), "plan is empty, nothing to save");
            return Ok(Vec::new());
        }

        fs::create_dir_all(&self.dir).map_err(|source| {
            PlanStoreError::DirectoryCreationFailed {
                path: self.dir.clone(),
                source,
            }
        })?;

        let operations = plan.operations();
        let single = operations.len() <= self.batch_size;
        let mut written = Vec::new();

        for (index, batch) in operations.chunks(self.batch_size).enumerate() {
            let file_name = if single {
                format!("{}_{}.json", plan.kind(), timestamp)
            } else {
                format!("{}_{}_batch{:03}.json", plan.kind(), timestamp, index + 1)
            };
            let path = self.dir.join(file_name);

            let json = serde_json::to_string_pretty(batch).map_err(|e| {
                PlanStoreError::InvalidFormat {
                    path: path.clone(),
                    reason: format!("JSON serialization failed: {e}"),
                }
            })?;
            fs::write(&path, json).map_err(|source| PlanStoreError::WriteFailed {
                path: path.clone(),
                source,
            })?;

            info!(path = %path.display(), operations = batch.len(), "plan batch written");
            written.push(path);
        }

        Ok(written)
    }

    /// Reads the operations of one batch file.
    pub fn load(path: &Path) -> Result<Vec<Operation>, PlanStoreError> {
        let json = fs::read_to_string(path).map_err(|source| PlanStoreError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|e| PlanStoreError::InvalidFormat {
            path: path.to_path_buf(),
            reason: format!("JSON parse error: {e}"),
        })
    }
}
