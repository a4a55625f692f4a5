use super::Planner;
use crate::actor::{ActorClassification, ActorClassifier};
use crate::config::Config;
use crate::metadata::FolderMetadata;
use crate::naming::{discriminate_dir, extract_release_code, format_title};
use crate::plan::{Action, Plan, PlanKind, SkipReason};
use crate::scanner::{ClassifiedNames, DirNode, DirTree, NodeId, Visit};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Topmost folders below the root that directly hold a qualifying video,
/// skipping anything already inside a classification bucket.
pub(super) fn media_folders(tree: &DirTree, classified: &ClassifiedNames) -> Vec<NodeId> {
    tree.list_media_folders(|node| {
        if node.depth == 0 {
            Visit::Descend
        } else if classified.is_already_classified(&node.name) || !node.is_video_folder() {
            Visit::Prune
        } else if node.has_direct_video() {
            Visit::Emit
        } else {
            Visit::Descend
        }
    })
}

/// A media folder together with what its metadata says about it.
pub(super) struct Subject<'a> {
    pub node: &'a DirNode,
    pub metadata: FolderMetadata,
    pub classification: ActorClassification,
    pub performer: Option<String>,
}

impl<'a> Subject<'a> {
    pub fn read(node: &'a DirNode, classifier: &ActorClassifier) -> Self {
        let metadata = node
            .metadata_file()
            .map(|file| FolderMetadata::read(&file.path))
            .unwrap_or_default();
        let performer = metadata.first_actor().map(str::to_string);
        let classification = classifier.classify(performer.as_deref().unwrap_or_default());
        Self {
            node,
            metadata,
            classification,
            performer,
        }
    }

    /// Folder title: the metadata title, else a release code found in the
    /// folder name, else the folder name itself.
    pub fn title(&self, max_len: usize) -> String {
        let raw = self
            .metadata
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| extract_release_code(&self.node.name))
            .unwrap_or_else(|| self.node.name.clone());
        format_title(&raw, max_len)
    }

    /// Records a skip and returns true when the performer needs a mapping.
    pub fn skip_if_unmapped(&self, plan: &mut Plan) -> bool {
        if !self.classification.needs_manual_mapping() {
            return false;
        }
        plan.skip(
            self.node.path.clone(),
            SkipReason::UnmappedPerformer(self.performer.clone().unwrap_or_default()),
        );
        true
    }
}

/// `base/{bucket}/{initial}/{display name}/{title}`, or
/// `base/{bucket}/{title}` for unknown performers.
pub(super) fn classified_destination(
    base: &Path,
    classification: &ActorClassification,
    title: &str,
    discriminator: Option<usize>,
) -> PathBuf {
    let leaf = match discriminator {
        Some(n) => discriminate_dir(title, n),
        None => title.to_string(),
    };
    let bucket = base.join(classification.bucket().to_string());
    match (classification.sort_initial(), classification.display_name()) {
        (Some(initial), Some(display)) => bucket.join(initial.to_string()).join(display).join(leaf),
        _ => bucket.join(leaf),
    }
}

/// Files media folders into per-performer buckets under the library root.
#[derive(Debug, Clone)]
pub struct ActorClassifyPlanner {
    classifier: ActorClassifier,
    classified: ClassifiedNames,
    title_max_length: usize,
}

impl ActorClassifyPlanner {
    pub fn new(config: &Config) -> Self {
        Self {
            classifier: ActorClassifier::new(&config.actors),
            classified: config.classified_names(),
            title_max_length: config.actors.title_max_length,
        }
    }
}

impl Planner for ActorClassifyPlanner {
    fn kind(&self) -> PlanKind {
        PlanKind::ActorClassify
    }

    fn plan(&self, tree: &DirTree) -> Plan {
        let mut plan = Plan::new(self.kind());
        let root = &tree.root().path;

        for id in media_folders(tree, &self.classified) {
            let subject = Subject::read(tree.node(id), &self.classifier);
            if subject.skip_if_unmapped(&mut plan) {
                continue;
            }

            let title = subject.title(self.title_max_length);
            let destination = plan
                .claim(|n| classified_destination(root, &subject.classification, &title, n));
            debug!(
                folder = %subject.node.path.display(),
                performer = subject.performer.as_deref().unwrap_or("-"),
                bucket = %subject.classification.bucket(),
                "folder classified"
            );
            plan.push(
                Action::Move,
                subject.node.path.clone(),
                destination,
                subject.node.total_size(),
            );
        }

        info!(
            folders = plan.len(),
            unmapped = plan.unmapped_performers().len(),
            "actor plan built"
        );
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{video, write};
    use super::*;
    use crate::executor::{Executor, FsExecutor};
    use crate::scanner::TreeScanner;
    use tempfile::TempDir;

    fn config() -> Config {
        let mut config = Config::default();
        config.files.min_video_size_mb = 300.0;
        config
    }

    fn scan(config: &Config, root: &Path) -> DirTree {
        TreeScanner::new(config).unwrap().scan(root).unwrap()
    }

    fn nfo(actor: &str, title: &str) -> String {
        format!("<movie><title>{title}</title><actor><name>{actor}</name></actor></movie>")
    }

    fn library(root: &Path) {
        video(&root.join("dl/one/a.mkv"), 400);
        write(&root.join("dl/one/a.nfo"), &nfo("Tom Cruise", "ABC-123 Mission"));
        video(&root.join("dl/two/b.mkv"), 400);
        write(&root.join("dl/two/b.nfo"), &nfo("张三", "XYZ-001"));
        video(&root.join("dl/three/c.mkv"), 400);
        write(&root.join("dl/three/c.nfo"), &nfo("蒼井そら", "JP-777"));
        video(&root.join("four ABC-999/d.mkv"), 400);
    }

    #[test]
    fn test_classify_destinations() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        library(root);

        let config = config();
        let plan = ActorClassifyPlanner::new(&config).plan(&scan(&config, root));
        let moves: Vec<(PathBuf, PathBuf)> = plan
            .operations()
            .iter()
            .map(|op| (op.source.clone(), op.destination.clone()))
            .collect();

        assert_eq!(
            moves,
            vec![
                (root.join("dl/one"), root.join("T/T/Tom Cruise/ABC-123 Mission")),
                (root.join("dl/three"), root.join("0/蒼/蒼井そら/JP-777")),
                (root.join("dl/two"), root.join("Z/张/张三/XYZ-001")),
                (root.join("four ABC-999"), root.join("99/ABC-999")),
            ]
        );
    }

    #[test]
    fn test_classification_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        library(root);

        let config = config();
        let planner = ActorClassifyPlanner::new(&config);
        let plan = planner.plan(&scan(&config, root));
        for op in plan.operations() {
            FsExecutor.apply(op).unwrap();
        }

        let second = planner.plan(&scan(&config, root));
        assert!(second.is_empty());
    }

    #[test]
    fn test_colliding_titles_are_discriminated() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join("a/x.mkv"), 400);
        write(&root.join("a/x.nfo"), &nfo("Tom Cruise", "Same"));
        video(&root.join("b/y.mkv"), 400);
        write(&root.join("b/y.nfo"), &nfo("Tom Cruise", "Same"));

        let config = config();
        let plan = ActorClassifyPlanner::new(&config).plan(&scan(&config, root));
        let destinations: Vec<PathBuf> =
            plan.operations().iter().map(|op| op.destination.clone()).collect();
        assert_eq!(
            destinations,
            vec![
                root.join("T/T/Tom Cruise/Same"),
                root.join("T/T/Tom Cruise/Same (2)")
            ]
        );
    }

    #[test]
    fn test_unmapped_kana_performer_is_reported() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join("a/x.mkv"), 400);
        write(&root.join("a/x.nfo"), &nfo("あおい", "T-1"));

        let mut config = config();
        config.actors.require_mapping = true;
        let plan = ActorClassifyPlanner::new(&config).plan(&scan(&config, root));

        assert!(plan.is_empty());
        assert_eq!(plan.unmapped_performers(), vec!["あおい"]);
    }

    #[test]
    fn test_direct_root_videos_are_not_moved() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join("loose.mkv"), 400);

        let config = config();
        let plan = ActorClassifyPlanner::new(&config).plan(&scan(&config, root));
        assert!(plan.is_empty());
    }
}
