use super::Planner;
use super::actor::{Subject, classified_destination, media_folders};
use crate::actor::ActorClassifier;
use crate::config::Config;
use crate::plan::{Action, Plan, PlanKind, SkipReason};
use crate::scanner::{ClassifiedNames, DirTree};
use tracing::info;

/// Files high-resolution, non-16:9 videos into a separate root, classified
/// by performer the same way as [`super::ActorClassifyPlanner`].
#[derive(Debug, Clone)]
pub struct WideVideoPlanner {
    classifier: ActorClassifier,
    classified: ClassifiedNames,
    title_max_length: usize,
    root_name: String,
    width_threshold: u32,
}

impl WideVideoPlanner {
    pub fn new(config: &Config) -> Self {
        Self {
            classifier: ActorClassifier::new(&config.actors),
            classified: config.classified_names(),
            title_max_length: config.actors.title_max_length,
            root_name: config.wide.root_name.clone(),
            width_threshold: config.wide.width_threshold,
        }
    }
}

impl Planner for WideVideoPlanner {
    fn kind(&self) -> PlanKind {
        PlanKind::WideVideo
    }

    fn plan(&self, tree: &DirTree) -> Plan {
        let mut plan = Plan::new(self.kind());
        let base = tree.root().path.join(&self.root_name);

        for id in media_folders(tree, &self.classified) {
            let subject = Subject::read(tree.node(id), &self.classifier);
            let Some(video) = &subject.metadata.video else {
                if subject.node.metadata_file().is_some() {
                    plan.skip(subject.node.path.clone(), SkipReason::MissingMetadata);
                }
                continue;
            };
            if video.width <= self.width_threshold || video.is_sixteen_nine() {
                continue;
            }
            if subject.skip_if_unmapped(&mut plan) {
                continue;
            }

            let title = subject.title(self.title_max_length);
            let destination = plan
                .claim(|n| classified_destination(&base, &subject.classification, &title, n));
            plan.push(
                Action::Move,
                subject.node.path.clone(),
                destination,
                subject.node.total_size(),
            );
        }

        info!(folders = plan.len(), "wide-video plan built");
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

    fn nfo(width: u32, height: u32, aspect: &str) -> String {
        format!(
            "<movie><title>ABC-123</title><actor><name>Tom Cruise</name></actor>\
             <fileinfo><streamdetails><video><width>{width}</width><height>{height}</height>\
             <aspect>{aspect}</aspect></video></streamdetails></fileinfo></movie>"
        )
    }

    fn plan_for(root: &Path) -> Plan {
        let mut config = Config::default();
        config.files.min_video_size_mb = 300.0;
        let tree = TreeScanner::new(&config).unwrap().scan(root).unwrap();
        WideVideoPlanner::new(&config).plan(&tree)
    }

    #[test]
    fn test_wide_video_is_moved_under_wide_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join("vr/a.mkv"), 400);
        write(&root.join("vr/a.nfo"), &nfo(3840, 1920, "2:1"));

        let plan = plan_for(root);
        let destinations: Vec<PathBuf> =
            plan.operations().iter().map(|op| op.destination.clone()).collect();
        assert_eq!(destinations, vec![root.join("BIG/T/T/Tom Cruise/ABC-123")]);
    }

    #[test]
    fn test_sixteen_nine_and_narrow_videos_stay() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join("uhd/a.mkv"), 400);
        write(&root.join("uhd/a.nfo"), &nfo(3840, 2160, "1.78"));
        video(&root.join("narrow/b.mkv"), 400);
        write(&root.join("narrow/b.nfo"), &nfo(1920, 800, "2.40"));
        video(&root.join("bare/c.mkv"), 400);

        assert!(plan_for(root).is_empty());
    }

    #[test]
    fn test_wide_root_is_not_rescanned() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        video(&root.join("BIG/T/T/Tom Cruise/ABC-123/a.mkv"), 400);
        write(
            &root.join("BIG/T/T/Tom Cruise/ABC-123/a.nfo"),
            &nfo(3840, 1920, "2:1"),
        );

        assert!(plan_for(root).is_empty());
    }
}
