use super::Planner;
use crate::config::{Config, SequencePattern};
use crate::movie_name::part_marker;
use crate::naming::sanitize_component;
use crate::plan::{Action, Plan, PlanKind, SkipReason};
use crate::scanner::{DirNode, DirTree, FileEntry, Visit};
use tracing::{info, warn};

/// Gives the parts of a multi-part video a shared prefix and a `-cdN` marker.
#[derive(Debug, Clone)]
pub struct RenamePlanner {
    pattern: SequencePattern,
}

impl RenamePlanner {
    pub fn new(config: &Config) -> Self {
        Self::with_pattern(config.rename.pattern)
    }

    pub fn with_pattern(pattern: SequencePattern) -> Self {
        Self { pattern }
    }

    fn plan_folder(&self, node: &DirNode, plan: &mut Plan) {
        let videos: Vec<&FileEntry> = node.qualifying_videos().collect();

        if videos.iter().any(|v| part_marker(v.stem()).is_some()) {
            plan.skip(node.path.clone(), SkipReason::AlreadyMarked);
            return;
        }

        let markers: Option<Vec<String>> =
            (0..videos.len()).map(|i| self.pattern.value(i)).collect();
        let Some(markers) = markers else {
            warn!(folder = %node.path.display(), parts = videos.len(), "too many parts for pattern");
            plan.skip(node.path.clone(), SkipReason::SequenceExhausted(videos.len()));
            return;
        };

        let stems: Vec<&str> = videos.iter().map(|v| v.stem()).collect();
        let prefix = common_prefix(&stems);
        let prefix = if prefix.is_empty() {
            sanitize_component(&node.name)
        } else {
            prefix
        };

        for (video, marker) in videos.iter().zip(markers) {
            let file_name = format!("{prefix}-cd{marker}{}", video.dot_extension());
            plan.push(
                Action::Rename,
                video.path.clone(),
                node.path.join(file_name),
                video.size,
            );
        }
    }
}

/// Longest common character prefix, with trailing `-`, `_`, `.`, and spaces
/// removed.
pub fn common_prefix(names: &[&str]) -> String {
    let Some((first, rest)) = names.split_first() else {
        return String::new();
    };
    let mut len = first.chars().count();
    for name in rest {
        len = first
            .chars()
            .zip(name.chars())
            .take(len)
            .take_while(|(a, b)| a == b)
            .count();
    }
    let prefix: String = first.chars().take(len).collect();
    prefix
        .trim_end_matches(['-', '_', '.', ' '])
        .to_string()
}

impl Planner for RenamePlanner {
    fn kind(&self) -> PlanKind {
        PlanKind::Rename
    }

    fn plan(&self, tree: &DirTree) -> Plan {
        let mut plan = Plan::new(self.kind());

        let folders = tree.list_media_folders(|node| {
            if node.qualifying_videos().nth(1).is_some() {
                Visit::EmitAndDescend
            } else {
                Visit::Descend
            }
        });
        for id in folders {
            self.plan_folder(tree.node(id), &mut plan);
        }

        info!(files = plan.len(), "rename plan built");
        plan
    }
}
