//! vidtidy - plan reviewable reorganizations of a personal video library
//!
//! A library is scanned once into a [`scanner::DirTree`]; planners read that
//! snapshot and emit a [`plan::Plan`] of move and rename operations without
//! touching the disk. Plans are persisted as JSON batches, reviewed, and
//! applied later by an [`executor::Executor`].

pub mod actor;
pub mod cli;
pub mod config;
pub mod enrich;
pub mod executor;
pub mod file_category;
pub mod logging;
pub mod metadata;
pub mod movie_name;
pub mod naming;
pub mod output;
pub mod plan;
pub mod planners;
pub mod resolver;
pub mod scanner;

pub use actor::{ActorClassification, ActorClassifier, Bucket, Script};
pub use config::{Config, ConfigError};
pub use executor::{ExecuteError, ExecutionSummary, Executor, FsExecutor};
pub use file_category::{FileClassifier, FileKind};
pub use metadata::{FolderMetadata, MovieMetadata, VideoInfo};
pub use plan::{Action, Operation, Plan, PlanKind, PlanStore};
pub use planners::{Planner, planner_for};
pub use scanner::{DirTree, TreeScanner};

pub use cli::{Cli, run_cli};
