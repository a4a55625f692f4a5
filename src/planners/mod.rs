//! Planners turn a scanned [`DirTree`] into a [`Plan`].
//!
//! Planners never touch the filesystem; they read the snapshot and emit
//! operations. Each is independent and can be run on its own.

mod actor;
mod clean;
mod movie;
mod rename;
mod wide;

pub use actor::ActorClassifyPlanner;
pub use clean::{CleanFilesPlanner, CleanFoldersPlanner};
pub use movie::MovieOrganizePlanner;
pub use rename::RenamePlanner;
pub use wide::WideVideoPlanner;

use crate::config::Config;
use crate::plan::{Plan, PlanKind};
use crate::resolver::{
    JsonFileResolver, MovieNameResolver, NoResolver, ResolveError, RetryPolicy, RetryingResolver,
};
use crate::scanner::DirTree;
use chrono::Local;
use std::path::{Path, PathBuf};

pub trait Planner {
    fn kind(&self) -> PlanKind;

    fn plan(&self, tree: &DirTree) -> Plan;
}

/// Dated holding area for discarded folders and files:
/// `root/{delete_dir}/{YYYYMMDD}/{relative path}`.
#[derive(Debug, Clone)]
pub struct DeleteArea {
    delete_dir: String,
    date_stamp: String,
}

impl DeleteArea {
    pub fn today(delete_dir: &str) -> Self {
        Self::with_date_stamp(delete_dir, &Local::now().format("%Y%m%d").to_string())
    }

    pub fn with_date_stamp(delete_dir: &str, date_stamp: &str) -> Self {
        Self {
            delete_dir: delete_dir.to_string(),
            date_stamp: date_stamp.to_string(),
        }
    }

    /// Destination for `path`, preserving its position relative to `root`.
    pub fn destination_for(&self, root: &Path, path: &Path) -> PathBuf {
        let relative = path
            .strip_prefix(root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(|| path.file_name().map(PathBuf::from))
            .unwrap_or_default();
        root.join(&self.delete_dir)
            .join(&self.date_stamp)
            .join(relative)
    }
}

/// Builds the resolver configured for the movie planner.
pub fn configured_resolver(config: &Config) -> Result<Box<dyn MovieNameResolver>, ResolveError> {
    let resolver: Box<dyn MovieNameResolver> = match &config.movies.resolver_file {
        Some(path) => Box::new(RetryingResolver::new(
            JsonFileResolver::load(path)?,
            RetryPolicy::from(&config.movies.retry),
        )),
        None => Box::new(NoResolver),
    };
    Ok(resolver)
}

/// Builds the planner for `kind` from configuration.
pub fn planner_for(
    kind: PlanKind,
    config: &Config,
) -> Result<Box<dyn Planner>, ResolveError> {
    let planner: Box<dyn Planner> = match kind {
        PlanKind::CleanFolders => Box::new(CleanFoldersPlanner::new(config)),
        PlanKind::CleanFiles => Box::new(CleanFilesPlanner::new(config)),
        PlanKind::Rename => Box::new(RenamePlanner::new(config)),
        PlanKind::ActorClassify => Box::new(ActorClassifyPlanner::new(config)),
        PlanKind::WideVideo => Box::new(WideVideoPlanner::new(config)),
        PlanKind::MovieOrganize => Box::new(MovieOrganizePlanner::new(
            config,
            configured_resolver(config)?,
        )),
    };
    Ok(planner)
}

/// Root a planner of `kind` scans.
pub fn scan_root(kind: PlanKind, config: &Config) -> &Path {
    match kind {
        PlanKind::MovieOrganize => config.movie_root(),
        _ => &config.library.root,
    }
}

#[cfg(test)]
mod test_support {
    use std::fs::{self, File};
    use std::path::Path;

    pub const MB: u64 = 1024 * 1024;

    pub fn video(path: &Path, mb: u64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap().set_len(mb * MB).unwrap();
    }

    pub fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}
