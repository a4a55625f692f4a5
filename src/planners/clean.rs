use super::{DeleteArea, Planner};
use crate::config::Config;
use crate::file_category::FileKind;
use crate::plan::{Action, Plan, PlanKind};
use crate::scanner::{DirNode, DirTree, FileEntry, Visit};
use std::collections::HashSet;
use tracing::info;

/// Moves every folder that holds no qualifying video, anywhere in its
/// subtree, to the delete area. The root itself is never moved.
#[derive(Debug, Clone)]
pub struct CleanFoldersPlanner {
    delete_area: DeleteArea,
}

impl CleanFoldersPlanner {
    pub fn new(config: &Config) -> Self {
        Self {
            delete_area: DeleteArea::today(&config.library.delete_dir),
        }
    }

    pub fn with_delete_area(mut self, delete_area: DeleteArea) -> Self {
        self.delete_area = delete_area;
        self
    }
}

impl Planner for CleanFoldersPlanner {
    fn kind(&self) -> PlanKind {
        PlanKind::CleanFolders
    }

    fn plan(&self, tree: &DirTree) -> Plan {
        let mut plan = Plan::new(self.kind());
        let root = &tree.root().path;

        let doomed = tree.list_media_folders(|node| {
            if node.depth == 0 || node.is_video_folder() {
                Visit::Descend
            } else {
                Visit::Emit
            }
        });

        for id in doomed {
            let node = tree.node(id);
            plan.push(
                Action::Move,
                node.path.clone(),
                self.delete_area.destination_for(root, &node.path),
                node.total_size(),
            );
        }

        info!(folders = plan.len(), "clean-folders plan built");
        plan
    }
}

/// Moves files that do not belong to a video out of video folders.
///
/// Videos are always kept. Images and metadata files are kept when their
/// stem shares its first `match_length` characters (case-insensitively) with
/// a qualifying video in the same folder; images are also kept when their
/// stem is a configured keyword. Subtitles follow the prefix rule only when
/// `keep_matching_subtitles` is set. Everything else is discarded.
#[derive(Debug, Clone)]
pub struct CleanFilesPlanner {
    delete_area: DeleteArea,
    image_keywords: HashSet<String>,
    match_length: usize,
    keep_matching_subtitles: bool,
}

impl CleanFilesPlanner {
    pub fn new(config: &Config) -> Self {
        Self {
            delete_area: DeleteArea::today(&config.library.delete_dir),
            image_keywords: config
                .files
                .image_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            match_length: config.files.match_length,
            keep_matching_subtitles: config.files.keep_matching_subtitles,
        }
    }

    pub fn with_delete_area(mut self, delete_area: DeleteArea) -> Self {
        self.delete_area = delete_area;
        self
    }

    fn prefix(&self, stem: &str) -> String {
        stem.chars().take(self.match_length).collect::<String>().to_lowercase()
    }

    fn discards<'a>(&self, node: &'a DirNode) -> Vec<&'a FileEntry> {
        let video_prefixes: HashSet<String> = node
            .qualifying_videos()
            .map(|video| self.prefix(video.stem()))
            .collect();

        let companion = |file: &FileEntry| video_prefixes.contains(&self.prefix(file.stem()));

        node.files
            .iter()
            .filter(|file| match file.kind {
                FileKind::QualifyingVideo | FileKind::SmallVideo => false,
                FileKind::Image => {
                    !(self.image_keywords.contains(&file.stem().to_lowercase()) || companion(file))
                }
                FileKind::Metadata => !companion(file),
                FileKind::Subtitle => !(self.keep_matching_subtitles && companion(file)),
                FileKind::Other => true,
            })
            .collect()
    }
}

impl Planner for CleanFilesPlanner {
    fn kind(&self) -> PlanKind {
        PlanKind::CleanFiles
    }

    fn plan(&self, tree: &DirTree) -> Plan {
        let mut plan = Plan::new(self.kind());
        let root = &tree.root().path;

        // A folder without videos below it has no descendant that could have any.
        let folders = tree.list_media_folders(|node| {
            if node.is_video_folder() {
                Visit::EmitAndDescend
            } else {
                Visit::Prune
            }
        });

        for id in folders {
            for file in self.discards(tree.node(id)) {
                plan.push(
                    Action::Move,
                    file.path.clone(),
                    self.delete_area.destination_for(root, &file.path),
                    file.size,
                );
            }
        }

        info!(files = plan.len(), "clean-files plan built");
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{video, write};
    use super::*;
    use crate::scanner::TreeScanner;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn config() -> Config {
        let mut config = Config::default();
        config.files.min_video_size_mb = 300.0;
        config
    }

    fn scan(config: &Config, root: &Path) -> DirTree {
        TreeScanner::new(config).unwrap().scan(root).unwrap()
    }

    fn area() -> DeleteArea {
        DeleteArea::with_date_stamp(".delete", "20240102")
    }

    #[test]
    fn test_clean_folders_moves_folder_below_threshold() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join("A/clip.mp4"), 200);
        video(&root.join("B/film.mp4"), 400);

        let config = config();
        let plan = CleanFoldersPlanner::new(&config)
            .with_delete_area(area())
            .plan(&scan(&config, root));

        assert_eq!(plan.len(), 1);
        let op = &plan.operations()[0];
        assert_eq!(op.action, Action::Move);
        assert_eq!(op.source, root.join("A"));
        assert_eq!(op.destination, root.join(".delete/20240102/A"));
        assert_eq!(op.size_mb, 200.0);
    }

    #[test]
    fn test_clean_folders_moves_topmost_empty_subtree_only() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join("Show/ep1.mkv"), 400);
        write(&root.join("Show/extras/deleted/scene.txt"), "x");
        write(&root.join("Junk/deep/file.txt"), "x");

        let config = config();
        let plan = CleanFoldersPlanner::new(&config)
            .with_delete_area(area())
            .plan(&scan(&config, root));

        let sources: Vec<PathBuf> = plan.operations().iter().map(|op| op.source.clone()).collect();
        assert_eq!(sources, vec![root.join("Junk"), root.join("Show/extras")]);
    }

    #[test]
    fn test_clean_folders_never_moves_root() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("notes.txt"), "x");

        let config = config();
        let plan = CleanFoldersPlanner::new(&config).plan(&scan(&config, temp.path()));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_clean_files_keeps_companions() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join("M/Movie.Name.2019.mkv"), 400);
        video(&root.join("M/sample.mkv"), 10);
        write(&root.join("M/Movie.Name.nfo"), "<movie/>");
        write(&root.join("M/movie.name.chs.srt"), "1");
        write(&root.join("M/poster.jpg"), "x");
        write(&root.join("M/screenshot.jpg"), "x");
        write(&root.join("M/www.site.com.txt"), "x");
        write(&root.join("M/other.nfo"), "<movie/>");

        let config = config();
        let plan = CleanFilesPlanner::new(&config)
            .with_delete_area(area())
            .plan(&scan(&config, root));

        let mut sources: Vec<PathBuf> =
            plan.operations().iter().map(|op| op.source.clone()).collect();
        sources.sort();
        assert_eq!(
            sources,
            vec![
                root.join("M/movie.name.chs.srt"),
                root.join("M/other.nfo"),
                root.join("M/screenshot.jpg"),
                root.join("M/www.site.com.txt"),
            ]
        );
        assert_eq!(
            plan.operations()[0].destination.parent().unwrap(),
            root.join(".delete/20240102/M")
        );
    }

    #[test]
    fn test_clean_files_can_keep_matching_subtitles() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join("M/Movie.Name.2019.mkv"), 400);
        write(&root.join("M/movie.name.chs.srt"), "1");
        write(&root.join("M/random.srt"), "1");

        let mut config = config();
        config.files.keep_matching_subtitles = true;
        let plan = CleanFilesPlanner::new(&config)
            .with_delete_area(area())
            .plan(&scan(&config, root));

        let sources: Vec<PathBuf> = plan.operations().iter().map(|op| op.source.clone()).collect();
        assert_eq!(sources, vec![root.join("M/random.srt")]);
    }

    #[test]
    fn test_clean_files_skips_folders_without_videos() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join("Small/clip.mkv"), 10);
        write(&root.join("Small/readme.txt"), "x");

        let config = config();
        let plan = CleanFilesPlanner::new(&config).plan(&scan(&config, root));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_clean_files_processes_parent_of_video_folder() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join("Series/S01/ep1.mkv"), 400);
        write(&root.join("Series/banner.jpg"), "x");
        write(&root.join("Series/torrent.url"), "x");

        let config = config();
        let plan = CleanFilesPlanner::new(&config)
            .with_delete_area(area())
            .plan(&scan(&config, root));

        let sources: Vec<PathBuf> = plan.operations().iter().map(|op| op.source.clone()).collect();
        assert_eq!(sources, vec![root.join("Series/torrent.url")]);
    }
}
