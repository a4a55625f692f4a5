//! Library tree scanning.
//!
//! The scanner walks a library root once, bottom-up, and builds an in-memory
//! [`DirTree`] with every file classified and two per-folder facts cached:
//! whether the subtree holds a qualifying video and its total size. Planners
//! only ever read this snapshot.

use crate::config::{Config, ConfigError};
use crate::file_category::{FileClassifier, FileKind};
use glob::Pattern;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Library root does not exist: {}", .0.display())]
    RootNotFound(PathBuf),
    #[error("Library root is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),
    #[error("Library root is unreadable: {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A classified file inside a scanned folder.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub kind: FileKind,
}

impl FileEntry {
    /// File name without its final extension.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(dot) if dot > 0 => &self.name[..dot],
            _ => &self.name,
        }
    }

    /// Final extension including the leading dot, or an empty string.
    pub fn dot_extension(&self) -> &str {
        match self.name.rfind('.') {
            Some(dot) if dot > 0 => &self.name[dot..],
            _ => "",
        }
    }
}

pub type NodeId = usize;

/// A folder in the scanned tree.
#[derive(Debug, Clone)]
pub struct DirNode {
    pub path: PathBuf,
    pub name: String,
    /// Depth below the scan root; the root itself is 0.
    pub depth: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Direct files, sorted by name.
    pub files: Vec<FileEntry>,
    contains_video: bool,
    total_size: u64,
}

impl DirNode {
    fn new(path: PathBuf, depth: usize) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            depth,
            parent: None,
            children: Vec::new(),
            files: Vec::new(),
            contains_video: false,
            total_size: 0,
        }
    }

    /// Whether this folder or any descendant holds a qualifying video.
    pub fn is_video_folder(&self) -> bool {
        self.contains_video
    }

    /// Recursive size of every file below this folder, in bytes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn qualifying_videos(&self) -> impl Iterator<Item = &FileEntry> {
        self.files_of(FileKind::QualifyingVideo)
    }

    pub fn files_of(&self, kind: FileKind) -> impl Iterator<Item = &FileEntry> {
        self.files.iter().filter(move |f| f.kind == kind)
    }

    pub fn has_direct_video(&self) -> bool {
        self.qualifying_videos().next().is_some()
    }

    /// The first metadata document in the folder, by name.
    pub fn metadata_file(&self) -> Option<&FileEntry> {
        self.files_of(FileKind::Metadata).next()
    }
}

/// Traversal decision returned by a [`DirTree::list_media_folders`] policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Report the folder and do not look inside it.
    Emit,
    /// Report the folder and keep descending.
    EmitAndDescend,
    /// Skip the folder but examine its children.
    Descend,
    /// Skip the folder and everything below it.
    Prune,
}

/// A snapshot of a library subtree.
#[derive(Debug, Clone)]
pub struct DirTree {
    nodes: Vec<DirNode>,
    root: NodeId,
}

impl DirTree {
    pub fn root(&self) -> &DirNode {
        &self.nodes[self.root]
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &DirNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks the tree top-down in name order, letting `policy` decide which
    /// folders to report and which subtrees to enter.
    pub fn list_media_folders(&self, mut policy: impl FnMut(&DirNode) -> Visit) -> Vec<NodeId> {
        let mut emitted = Vec::new();
        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            let descend = match policy(node) {
                Visit::Emit => {
                    emitted.push(id);
                    false
                }
                Visit::EmitAndDescend => {
                    emitted.push(id);
                    true
                }
                Visit::Descend => true,
                Visit::Prune => false,
            };
            if descend {
                stack.extend(node.children.iter().rev().copied());
            }
        }

        emitted
    }

    /// Every file at or below `id`, direct files first, then each child
    /// folder in name order.
    pub fn subtree_files(&self, id: NodeId) -> Vec<&FileEntry> {
        let mut files = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            files.extend(node.files.iter());
            stack.extend(node.children.iter().rev().copied());
        }
        files
    }

    /// Path of a folder relative to the scan root.
    pub fn relative_path(&self, id: NodeId) -> &Path {
        let path = &self.nodes[id].path;
        path.strip_prefix(&self.root().path).unwrap_or(path)
    }
}

/// Folder names that are themselves the output of a classification run.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedNames {
    numeric: HashSet<String>,
    auxiliary: HashSet<String>,
}

impl ClassifiedNames {
    pub fn new(
        numeric: impl IntoIterator<Item = u32>,
        auxiliary: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            numeric: numeric.into_iter().map(|n| n.to_string()).collect(),
            auxiliary: auxiliary.into_iter().collect(),
        }
    }

    /// True for a single uppercase ASCII letter, a configured numeric bucket,
    /// or a configured auxiliary root name.
    pub fn is_already_classified(&self, name: &str) -> bool {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next())
            && c.is_ascii_uppercase()
        {
            return true;
        }
        self.numeric.contains(name) || self.auxiliary.contains(name)
    }
}

/// Builds [`DirTree`] snapshots of a library root.
#[derive(Debug, Clone)]
pub struct TreeScanner {
    classifier: FileClassifier,
    delete_dir: String,
    skip_hidden: bool,
    excludes: Vec<Pattern>,
}

impl TreeScanner {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            classifier: FileClassifier::new(&config.files),
            delete_dir: config.library.delete_dir.clone(),
            skip_hidden: config.library.skip_hidden,
            excludes: config.compile_excludes()?,
        })
    }

    pub fn classifier(&self) -> &FileClassifier {
        &self.classifier
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        if self.excludes.iter().any(|p| p.matches_path(entry.path())) {
            return true;
        }
        if !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        name == self.delete_dir.as_str() || (self.skip_hidden && name.starts_with('.'))
    }

    /// Scans `root` into a tree.
    ///
    /// Unreadable subdirectories are logged and left out of the tree. Symbolic
    /// links are not followed.
    pub fn scan(&self, root: &Path) -> Result<DirTree, ScanError> {
        if !root.exists() {
            return Err(ScanError::RootNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::RootNotDirectory(root.to_path_buf()));
        }
        fs::read_dir(root).map_err(|source| ScanError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;

        let mut builder = TreeBuilder::default();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .contents_first(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_pruned(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    warn!(path = %path.display(), error = %err, "skipping unreadable entry");
                    builder.unreadable.insert(path);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                debug!(path = %entry.path().display(), "skipping symbolic link");
            } else if file_type.is_dir() {
                builder.close_dir(entry.path(), entry.depth());
            } else if file_type.is_file() {
                let size = match entry.metadata() {
                    Ok(meta) => meta.len(),
                    Err(err) => {
                        warn!(path = %entry.path().display(), error = %err, "cannot read file size");
                        0
                    }
                };
                let name = entry.file_name().to_string_lossy().into_owned();
                let kind = self.classifier.classify(&name, size);
                builder.add_file(
                    entry.depth(),
                    FileEntry {
                        path: entry.path().to_path_buf(),
                        name,
                        size,
                        kind,
                    },
                );
            }
        }

        let tree = builder.finish(root);
        info!(
            root = %root.display(),
            folders = tree.len(),
            video_folder = tree.root().is_video_folder(),
            "library scanned"
        );
        Ok(tree)
    }
}

/// Accumulates nodes in post-order as the walker yields them.
#[derive(Default)]
struct TreeBuilder {
    nodes: Vec<DirNode>,
    index: HashMap<PathBuf, NodeId>,
    unreadable: HashSet<PathBuf>,
}

impl TreeBuilder {
    fn node_for(&mut self, path: &Path, depth: usize) -> NodeId {
        if let Some(&id) = self.index.get(path) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(DirNode::new(path.to_path_buf(), depth));
        self.index.insert(path.to_path_buf(), id);
        id
    }

    fn add_file(&mut self, depth: usize, file: FileEntry) {
        let Some(parent) = file.path.parent().map(Path::to_path_buf) else {
            return;
        };
        let id = self.node_for(&parent, depth.saturating_sub(1));
        self.nodes[id].files.push(file);
    }

    /// Called once every entry below `path` has been seen.
    fn close_dir(&mut self, path: &Path, depth: usize) {
        if self.unreadable.contains(path) {
            return;
        }
        let id = self.node_for(path, depth);

        let node = &self.nodes[id];
        let mut contains_video = node.has_direct_video();
        let mut total_size: u64 = node.files.iter().map(|f| f.size).sum();
        for &child in &node.children {
            contains_video |= self.nodes[child].contains_video;
            total_size += self.nodes[child].total_size;
        }
        let node = &mut self.nodes[id];
        node.contains_video = contains_video;
        node.total_size = total_size;

        if depth > 0
            && let Some(parent_path) = path.parent()
        {
            let parent = self.node_for(parent_path, depth - 1);
            self.nodes[id].parent = Some(parent);
            self.nodes[parent].children.push(id);
        }
    }

    fn finish(mut self, root: &Path) -> DirTree {
        let root_id = self.node_for(root, 0);
        DirTree {
            nodes: self.nodes,
            root: root_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    const MB: u64 = 1024 * 1024;

    fn video(path: &Path, mb: u64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap().set_len(mb * MB).unwrap();
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn scanner() -> TreeScanner {
        let mut config = Config::default();
        config.files.min_video_size_mb = 300.0;
        TreeScanner::new(&config).unwrap()
    }

    fn child<'a>(tree: &'a DirTree, parent: &DirNode, name: &str) -> &'a DirNode {
        parent
            .children
            .iter()
            .map(|&id| tree.node(id))
            .find(|n| n.name == name)
            .unwrap()
    }

    #[test]
    fn test_scan_caches_video_flag_and_sizes() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join("A/clip.mp4"), 200);
        video(&root.join("B/film.mkv"), 400);
        touch(&root.join("B/extras/notes.txt"));

        let tree = scanner().scan(root).unwrap();
        let a = child(&tree, tree.root(), "A");
        let b = child(&tree, tree.root(), "B");

        assert!(tree.root().is_video_folder());
        assert!(!a.is_video_folder());
        assert_eq!(a.total_size(), 200 * MB);
        assert!(b.is_video_folder());
        assert!(b.has_direct_video());
        assert_eq!(b.total_size(), 400 * MB + 1);
        assert!(!child(&tree, b, "extras").is_video_folder());
    }

    #[test]
    fn test_children_and_files_are_name_ordered() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("c/1.txt"));
        touch(&root.join("a/2.txt"));
        touch(&root.join("b/3.txt"));
        touch(&root.join("z.txt"));
        touch(&root.join("m.txt"));

        let tree = scanner().scan(root).unwrap();
        let names: Vec<&str> = tree
            .root()
            .children
            .iter()
            .map(|&id| tree.node(id).name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        let files: Vec<&str> = tree.root().files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(files, vec!["m.txt", "z.txt"]);
    }

    #[test]
    fn test_scan_prunes_delete_hidden_and_excluded() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join(".delete/20240101/old/movie.mkv"), 400);
        video(&root.join(".hidden/movie.mkv"), 400);
        video(&root.join("@eaDir/movie.mkv"), 400);
        touch(&root.join("visible/readme.txt"));

        let mut config = Config::default();
        config.files.min_video_size_mb = 300.0;
        config.library.exclude = vec!["**/@eaDir".to_string()];
        let tree = TreeScanner::new(&config).unwrap().scan(root).unwrap();

        let names: Vec<&str> = tree
            .root()
            .children
            .iter()
            .map(|&id| tree.node(id).name.as_str())
            .collect();
        assert_eq!(names, vec!["visible"]);
        assert!(!tree.root().is_video_folder());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let result = scanner().scan(Path::new("/non/existent/library"));
        assert!(matches!(result, Err(ScanError::RootNotFound(_))));
    }

    #[test]
    fn test_list_media_folders_policy() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join("A/a.mkv"), 400);
        video(&root.join("A/nested/b.mkv"), 400);
        video(&root.join("B/inner/c.mkv"), 400);
        touch(&root.join("C/readme.txt"));

        let tree = scanner().scan(root).unwrap();
        let emitted = tree.list_media_folders(|node| {
            if node.depth == 0 {
                Visit::Descend
            } else if !node.is_video_folder() {
                Visit::Prune
            } else if node.has_direct_video() {
                Visit::Emit
            } else {
                Visit::Descend
            }
        });
        let rel: Vec<PathBuf> = emitted
            .iter()
            .map(|&id| tree.relative_path(id).to_path_buf())
            .collect();

        assert_eq!(rel, vec![PathBuf::from("A"), PathBuf::from("B/inner")]);
    }

    #[test]
    fn test_subtree_files_are_pre_ordered() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("M/z.nfo"));
        touch(&root.join("M/B/b.srt"));
        touch(&root.join("M/A/inner/deep.jpg"));
        touch(&root.join("M/A/a.srt"));

        let tree = scanner().scan(root).unwrap();
        let id = tree.root().children[0];
        assert_eq!(tree.node(id).name, "M");

        let names: Vec<&str> = tree
            .subtree_files(id)
            .into_iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["z.nfo", "a.srt", "deep.jpg", "b.srt"]);
    }

    #[test]
    fn test_classified_names() {
        let names = ClassifiedNames::new([0, 99], ["BIG".to_string()]);
        assert!(names.is_already_classified("T"));
        assert!(names.is_already_classified("0"));
        assert!(names.is_already_classified("99"));
        assert!(names.is_already_classified("BIG"));
        assert!(!names.is_already_classified("t"));
        assert!(!names.is_already_classified("TS"));
        assert!(!names.is_already_classified("7"));
    }

    #[test]
    fn test_file_entry_stem_and_extension() {
        let entry = FileEntry {
            path: PathBuf::from("/x/Movie.Name.mkv"),
            name: "Movie.Name.mkv".to_string(),
            size: 0,
            kind: FileKind::SmallVideo,
        };
        assert_eq!(entry.stem(), "Movie.Name");
        assert_eq!(entry.dot_extension(), ".mkv");
    }
}
