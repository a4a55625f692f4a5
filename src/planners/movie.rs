use super::Planner;
use crate::config::{Config, MovieConfig};
use crate::file_category::FileKind;
use crate::metadata::{FolderMetadata, MovieMetadata};
use crate::movie_name::{
    canonical_folder_name, dotted, image_role, is_organized, movie_file_base, parse_folder_name,
    part_marker, subtitle_language, VideoTechInfo,
};
use crate::naming::{clean_component, discriminate_file};
use crate::plan::{Action, Plan, PlanKind, SkipReason};
use crate::resolver::{MovieNameResolver, ResolveRequest};
use crate::scanner::{DirNode, DirTree, FileEntry, NodeId, Visit};
use std::path::Path;
use tracing::{debug, info, warn};

/// Names a movie folder and its files end up with.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MovieNames {
    chinese: Option<String>,
    english: String,
    year: Option<String>,
}

/// Normalises movie folders under the movie root.
///
/// Each movie ends up as an immediate child of the root named
/// `{chinese.}{english} ({year}).{marker}`, with its video, subtitle, image,
/// and metadata files renamed to match.
pub struct MovieOrganizePlanner {
    settings: MovieConfig,
    resolver: Box<dyn MovieNameResolver>,
}

impl MovieOrganizePlanner {
    pub fn new(config: &Config, resolver: Box<dyn MovieNameResolver>) -> Self {
        Self {
            settings: config.movies.clone(),
            resolver,
        }
    }

    fn candidates(&self, tree: &DirTree, plan: &mut Plan) -> Vec<NodeId> {
        let mut organized = Vec::new();
        let found = tree.list_media_folders(|node| {
            if node.depth == 0 {
                return Visit::Descend;
            }
            if !node.is_video_folder() {
                return Visit::Prune;
            }
            if !self.settings.force_reorganize && is_organized(&node.name, &self.settings.done_marker)
            {
                organized.push(node.path.clone());
                return Visit::Prune;
            }
            Visit::Emit
        });
        for path in organized {
            plan.skip(path, SkipReason::AlreadyOrganized);
        }
        found
    }

    fn names_for(&self, node: &DirNode, files: &[&FileEntry]) -> MovieNames {
        let metadata = files
            .iter()
            .find(|file| file.kind == FileKind::Metadata)
            .map(|file| FolderMetadata::read(&file.path))
            .unwrap_or_default();
        let request = ResolveRequest {
            folder_name: node.name.clone(),
            video_file_names: files
                .iter()
                .filter(|file| file.kind == FileKind::QualifyingVideo)
                .map(|file| file.name.clone())
                .collect(),
            metadata_summary: MovieMetadata::from(&metadata).summary(),
        };

        match self.resolver.resolve(&request) {
            Ok(Some(identity)) if identity.is_complete() => {
                debug!(folder = %node.name, confidence = identity.confidence, "resolver answered");
                return MovieNames {
                    chinese: identity
                        .chinese_name
                        .map(|c| clean_component(&c))
                        .filter(|c| !c.is_empty()),
                    english: dotted(&identity.english_name),
                    year: identity.year,
                };
            }
            Ok(_) => {}
            Err(err) => warn!(folder = %node.name, error = %err, "resolver failed, using heuristics"),
        }

        let suffix = format!(".{}", self.settings.done_marker);
        let base_name = node.name.strip_suffix(&suffix).unwrap_or(&node.name);
        let parsed = parse_folder_name(base_name);
        MovieNames {
            english: parsed
                .english_name
                .or_else(|| parsed.chinese_name.is_none().then(|| dotted(base_name)))
                .unwrap_or_default(),
            chinese: parsed.chinese_name,
            year: parsed.year.or_else(|| metadata.year.clone().filter(|y| y.len() == 4)),
        }
    }

    /// New name for one file, or `None` to leave it as it is. `disc` is the
    /// name of the subfolder holding the file, if any.
    fn file_name_for(
        &self,
        file: &FileEntry,
        disc: Option<&str>,
        names: &MovieNames,
        subtitle_base: &str,
    ) -> Option<String> {
        let ext = file.dot_extension();
        match file.kind {
            FileKind::QualifyingVideo => {
                let tech = VideoTechInfo::extract(file.stem());
                let mut base = movie_file_base(&names.english, names.year.as_deref(), &tech);
                let marker = part_marker(file.stem())
                    .or_else(|| disc.and_then(|d| part_marker(&format!(" {d}"))));
                if let Some(marker) = marker {
                    base.push_str(&marker);
                }
                Some(format!("{base}{ext}"))
            }
            FileKind::Subtitle => {
                let lang = subtitle_language(file.stem(), &self.settings.subtitle_languages);
                Some(match lang {
                    Some(lang) => format!("{subtitle_base}.{}{ext}", lang.to_lowercase()),
                    None => format!("{subtitle_base}{ext}"),
                })
            }
            FileKind::Image => image_role(file.stem(), &self.settings.image_keywords)
                .map(|role| format!("{role}{ext}")),
            FileKind::Metadata => Some(self.settings.metadata_name.clone()),
            FileKind::SmallVideo | FileKind::Other => None,
        }
    }

    /// Renames every file of the movie, flattening subfolders into `target`.
    /// Sources are given as they will be once the folder itself is renamed.
    fn plan_files(
        &self,
        node: &DirNode,
        files: &[&FileEntry],
        target: &Path,
        names: &MovieNames,
        plan: &mut Plan,
    ) {
        let subtitle_base = files
            .iter()
            .find(|file| file.kind == FileKind::QualifyingVideo)
            .map(|video| {
                let tech = VideoTechInfo::extract(video.stem());
                movie_file_base(&names.english, names.year.as_deref(), &tech)
            })
            .unwrap_or_else(|| names.english.clone());

        let mut renames = Vec::new();
        for file in files {
            let relative = file.path.strip_prefix(&node.path).unwrap_or(&file.path);
            let source = target.join(relative);
            let disc = relative
                .parent()
                .and_then(Path::file_name)
                .map(|d| d.to_string_lossy().into_owned());

            match self.file_name_for(file, disc.as_deref(), names, &subtitle_base) {
                Some(name) if source != target.join(&name) => renames.push((file, source, name)),
                // Files already carrying their final name keep it.
                _ if disc.is_none() => plan.reserve(source),
                _ => {}
            }
        }

        for (file, source, name) in renames {
            let destination = plan.claim(|n| match n {
                None => target.join(&name),
                Some(n) => target.join(discriminate_file(&name, n)),
            });
            plan.push(Action::Rename, source, destination, file.size);
        }
    }
}

impl Planner for MovieOrganizePlanner {
    fn kind(&self) -> PlanKind {
        PlanKind::MovieOrganize
    }

    fn plan(&self, tree: &DirTree) -> Plan {
        let mut plan = Plan::new(self.kind());
        let root = tree.root().path.clone();

        // Names of root children that stay where they are.
        for &child in &tree.root().children {
            plan.reserve(tree.node(child).path.clone());
        }

        for id in self.candidates(tree, &mut plan) {
            let node = tree.node(id);
            let files = tree.subtree_files(id);
            let names = self.names_for(node, &files);
            if names.english.is_empty() && names.chinese.is_none() {
                plan.skip(node.path.clone(), SkipReason::MissingMetadata);
                continue;
            }

            let folder_name = |n: Option<usize>| {
                canonical_folder_name(
                    names.chinese.as_deref(),
                    &names.english,
                    names.year.as_deref(),
                    &self.settings.done_marker,
                    n,
                )
            };
            let preferred = root.join(folder_name(None));
            let target = if preferred == node.path {
                preferred
            } else {
                plan.claim(|n| root.join(folder_name(n)))
            };

            plan.push(Action::Rename, node.path.clone(), target.clone(), node.total_size());
            self.plan_files(node, &files, &target, &names, &mut plan);
        }

        info!(
            operations = plan.len(),
            skipped = plan.skipped().len(),
            "movie plan built"
        );
        plan
    }
}
