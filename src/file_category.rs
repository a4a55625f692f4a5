/// File classification for video library contents.
///
/// Every file the scanner sees is mapped to a [`FileKind`] by extension,
/// case-insensitively. Videos are further split by size: only videos at or
/// above the configured threshold make a folder a video folder.
///
/// # Examples
///
/// ```
/// use vidtidy::config::FilesConfig;
/// use vidtidy::file_category::{FileClassifier, FileKind};
///
/// let classifier = FileClassifier::new(&FilesConfig::default());
/// let big = 600 * 1024 * 1024;
/// assert_eq!(classifier.classify("Movie.MKV", big), FileKind::QualifyingVideo);
/// assert_eq!(classifier.classify("sample.mkv", 1024), FileKind::SmallVideo);
/// assert_eq!(classifier.classify("poster.jpg", 0), FileKind::Image);
/// assert_eq!(classifier.classify("readme.txt", 0), FileKind::Other);
/// ```
use crate::config::FilesConfig;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// The role a file plays inside a media folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Video at or above the size threshold.
    QualifyingVideo,
    /// Video extension but below the size threshold (samples, trailers).
    SmallVideo,
    Image,
    Subtitle,
    /// XML metadata document (`.nfo`).
    Metadata,
    Other,
}

/// Maps file names and sizes to [`FileKind`]s.
#[derive(Debug, Clone)]
pub struct FileClassifier {
    video: HashSet<String>,
    image: HashSet<String>,
    subtitle: HashSet<String>,
    metadata: HashSet<String>,
    min_video_bytes: u64,
}

impl FileClassifier {
    pub fn new(config: &FilesConfig) -> Self {
        Self {
            video: extension_set(&config.video_extensions),
            image: extension_set(&config.image_extensions),
            subtitle: extension_set(&config.subtitle_extensions),
            metadata: extension_set(&config.metadata_extensions),
            min_video_bytes: (config.min_video_size_mb * 1024.0 * 1024.0) as u64,
        }
    }

    /// Classifies a file by name and size in bytes.
    pub fn classify(&self, file_name: impl AsRef<Path>, size: u64) -> FileKind {
        let Some(ext) = file_name
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
        else {
            return FileKind::Other;
        };

        if self.video.contains(&ext) {
            if size >= self.min_video_bytes {
                FileKind::QualifyingVideo
            } else {
                FileKind::SmallVideo
            }
        } else if self.image.contains(&ext) {
            FileKind::Image
        } else if self.subtitle.contains(&ext) {
            FileKind::Subtitle
        } else if self.metadata.contains(&ext) {
            FileKind::Metadata
        } else {
            FileKind::Other
        }
    }

    /// Whether the file at `path` is a video at or above the size threshold.
    ///
    /// Files whose size cannot be read are treated as non-matching.
    pub fn is_qualifying_video(&self, path: &Path) -> bool {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => {
                self.classify(path, meta.len()) == FileKind::QualifyingVideo
            }
            _ => false,
        }
    }
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::new(&FilesConfig::default())
    }
}

fn extension_set(extensions: &[String]) -> HashSet<String> {
    extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_classify_by_extension() {
        let classifier = FileClassifier::default();
        assert_eq!(classifier.classify("a.srt", 0), FileKind::Subtitle);
        assert_eq!(classifier.classify("a.ASS", 0), FileKind::Subtitle);
        assert_eq!(classifier.classify("movie.nfo", 0), FileKind::Metadata);
        assert_eq!(classifier.classify("fanart.webp", 0), FileKind::Image);
        assert_eq!(classifier.classify("noext", 0), FileKind::Other);
    }

    #[test]
    fn test_video_size_threshold() {
        let classifier = FileClassifier::default();
        assert_eq!(
            classifier.classify("a.mp4", 500 * MB),
            FileKind::QualifyingVideo
        );
        assert_eq!(
            classifier.classify("a.mp4", 500 * MB - 1),
            FileKind::SmallVideo
        );
    }

    #[test]
    fn test_extensions_with_leading_dot_are_accepted() {
        let config = FilesConfig {
            video_extensions: vec![".MP4".to_string()],
            min_video_size_mb: 0.0,
            ..FilesConfig::default()
        };
        let classifier = FileClassifier::new(&config);
        assert_eq!(classifier.classify("clip.mp4", 0), FileKind::QualifyingVideo);
        assert_eq!(classifier.classify("clip.mkv", 0), FileKind::Other);
    }

    #[test]
    fn test_is_qualifying_video_reads_size() {
        let temp = TempDir::new().unwrap();
        let big = temp.path().join("big.mkv");
        let small = temp.path().join("small.mkv");
        File::create(&big).unwrap().set_len(600 * MB).unwrap();
        File::create(&small).unwrap().set_len(MB).unwrap();

        let classifier = FileClassifier::default();
        assert!(classifier.is_qualifying_video(&big));
        assert!(!classifier.is_qualifying_video(&small));
        assert!(!classifier.is_qualifying_video(&temp.path().join("missing.mkv")));
    }
}
