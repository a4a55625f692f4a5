//! Library layout and planning configuration.
//!
//! Configuration is stored in TOML. Every section and field is optional and
//! falls back to the defaults shown here:
//!
//! ```toml
//! [library]
//! root = "/srv/videos"
//! movie_root = "/srv/movies"
//! delete_dir = ".delete"
//! plan_dir = "operations"
//! batch_size = 500
//! skip_hidden = true
//! exclude = ["**/@eaDir"]
//!
//! [files]
//! video_extensions = ["mp4", "mkv", "avi"]
//! min_video_size_mb = 500
//! image_keywords = ["poster", "fanart"]
//! match_length = 5
//!
//! [rename]
//! pattern = "number2"
//!
//! [actors]
//! kana_bucket = 0
//! unknown_bucket = 99
//! title_max_length = 20
//!
//! [actors.mapping]
//! "蒼井そら" = "苍井空"
//!
//! [wide]
//! root_name = "BIG"
//! width_threshold = 2000
//!
//! [movies]
//! done_marker = "fixed"
//!
//! [movies.retry]
//! max_attempts = 3
//! ```

use crate::scanner::ClassifiedNames;
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// Invalid glob pattern in `library.exclude`.
    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    /// A value is syntactically fine but unusable.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(#[from] std::io::Error),
}

/// Top-level configuration, one field per TOML section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub files: FilesConfig,
    pub rename: RenameConfig,
    pub actors: ActorConfig,
    pub wide: WideConfig,
    pub movies: MovieConfig,
}

/// Where the library lives and how plans are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root of the video library scanned by every planner except movies.
    pub root: PathBuf,
    /// Root of the movie collection. Falls back to `root` when unset.
    pub movie_root: Option<PathBuf>,
    /// Name of the holding area for discarded folders and files.
    pub delete_dir: String,
    /// Directory that receives persisted plan batches.
    pub plan_dir: PathBuf,
    /// Maximum number of operations per persisted batch.
    pub batch_size: usize,
    /// Whether directories whose name starts with "." are skipped.
    pub skip_hidden: bool,
    /// Glob patterns for paths the scanner never enters.
    pub exclude: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            movie_root: None,
            delete_dir: ".delete".to_string(),
            plan_dir: PathBuf::from("operations"),
            batch_size: 500,
            skip_hidden: true,
            exclude: Vec::new(),
        }
    }
}

/// File classification rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub video_extensions: Vec<String>,
    /// Videos smaller than this are ignored when deciding what is a video folder.
    pub min_video_size_mb: f64,
    pub image_extensions: Vec<String>,
    pub subtitle_extensions: Vec<String>,
    pub metadata_extensions: Vec<String>,
    /// Image stems that are always kept by the file cleaner.
    pub image_keywords: Vec<String>,
    /// Number of leading characters a companion file must share with a video.
    pub match_length: usize,
    /// Let subtitles survive the file cleaner under the same prefix rule as
    /// metadata. Off by default, so stray subtitles are discarded.
    pub keep_matching_subtitles: bool,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            video_extensions: strings(&[
                "mp4", "mkv", "avi", "wmv", "mov", "flv", "rmvb", "rm", "3gp", "m4v", "m2ts",
                "ts", "mpg",
            ]),
            min_video_size_mb: 500.0,
            image_extensions: strings(&["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff"]),
            subtitle_extensions: strings(&["srt", "ass", "ssa", "sub", "idx", "vtt"]),
            metadata_extensions: strings(&["nfo"]),
            image_keywords: strings(&[
                "poster",
                "movie",
                "folder",
                "cover",
                "fanart",
                "banner",
                "clearart",
                "thumb",
                "landscape",
                "logo",
                "clearlogo",
                "disc",
                "discart",
                "backdrop",
                "keyart",
            ]),
            match_length: 5,
            keep_matching_subtitles: false,
        }
    }
}

/// Sequence style used for multi-part disambiguation markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequencePattern {
    /// `1`, `2`, `3`, ...
    Number,
    /// `A`, `B`, `C`, ...
    Letter,
    /// `01`, `02`, `03`, ...
    #[default]
    Number2,
}

impl SequencePattern {
    /// Returns the marker value for the zero-based `index`, or `None` once
    /// the pattern has run out of values.
    pub fn value(self, index: usize) -> Option<String> {
        match self {
            SequencePattern::Number if index < 99 => Some((index + 1).to_string()),
            SequencePattern::Letter if index < 26 => {
                Some(char::from(b'A' + index as u8).to_string())
            }
            SequencePattern::Number2 if index < 99 => Some(format!("{:02}", index + 1)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameConfig {
    pub pattern: SequencePattern,
}

/// Performer classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bucket for names written in Japanese kana.
    pub kana_bucket: u32,
    /// Bucket for names that cannot be classified.
    pub unknown_bucket: u32,
    /// Character cap on the last hyphen-delimited segment of a folder title.
    pub title_max_length: usize,
    /// Skip kana-script performers that have no entry in `mapping`.
    pub require_mapping: bool,
    /// Title codes that stand in for a performer when none is listed.
    pub placeholder_codes: Vec<String>,
    /// Raw performer name to canonical display name.
    pub mapping: BTreeMap<String, String>,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            kana_bucket: 0,
            unknown_bucket: 99,
            title_max_length: 20,
            require_mapping: false,
            placeholder_codes: strings(&["FC2-PPV", "FC2", "PPV"]),
            mapping: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WideConfig {
    /// Folder under the library root that collects wide-aspect videos.
    pub root_name: String,
    /// Videos wider than this many pixels are candidates.
    pub width_threshold: u32,
}

impl Default for WideConfig {
    fn default() -> Self {
        Self {
            root_name: "BIG".to_string(),
            width_threshold: 2000,
        }
    }
}

/// Movie folder normalisation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieConfig {
    /// Suffix appended to organized folder names, without the leading dot.
    pub done_marker: String,
    /// Re-plan folders that already carry the done marker.
    pub force_reorganize: bool,
    /// File name every metadata document is renamed to.
    pub metadata_name: String,
    /// Image roles, checked in order against each image stem.
    pub image_keywords: Vec<String>,
    /// Language codes preserved on subtitle renames.
    pub subtitle_languages: Vec<String>,
    /// Optional JSON file of precomputed name-resolution answers.
    pub resolver_file: Option<PathBuf>,
    pub retry: RetryConfig,
}

impl Default for MovieConfig {
    fn default() -> Self {
        Self {
            done_marker: "fixed".to_string(),
            force_reorganize: false,
            metadata_name: "movie.nfo".to_string(),
            image_keywords: strings(&["poster", "fanart", "banner", "clearart", "logo", "thumb"]),
            subtitle_languages: strings(&[
                "chs", "cht", "eng", "jpn", "kor", "zh", "en", "ja", "ko", "zh-cn", "zh-tw",
            ]),
            resolver_file: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Bounds applied to every name-resolution request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 2000,
            timeout_secs: 60,
        }
    }
}

impl RetryConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.vidtidyrc.toml` in the current directory
    /// 3. Look for `~/.config/vidtidy/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but
    /// cannot be read, or if any loaded file fails validation.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".vidtidyrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("vidtidy")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make planning meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.library.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "library.batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.library.delete_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "library.delete_dir",
                reason: "must not be empty".to_string(),
            });
        }
        if self.files.match_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "files.match_length",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.files.min_video_size_mb < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "files.min_video_size_mb",
                reason: "must not be negative".to_string(),
            });
        }
        if self.actors.kana_bucket == self.actors.unknown_bucket {
            return Err(ConfigError::InvalidValue {
                field: "actors.kana_bucket",
                reason: "must differ from actors.unknown_bucket".to_string(),
            });
        }
        if self.movies.done_marker.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "movies.done_marker",
                reason: "must not be empty".to_string(),
            });
        }
        if self.movies.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "movies.retry.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        self.compile_excludes()?;
        Ok(())
    }

    /// Pre-compile the `library.exclude` glob patterns.
    pub fn compile_excludes(&self) -> Result<Vec<Pattern>, ConfigError> {
        self.library
            .exclude
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect()
    }

    /// Folder names that are themselves classification output.
    pub fn classified_names(&self) -> ClassifiedNames {
        ClassifiedNames::new(
            [self.actors.kana_bucket, self.actors.unknown_bucket],
            [self.wide.root_name.clone()],
        )
    }

    /// Root scanned by the movie planner.
    pub fn movie_root(&self) -> &Path {
        self.library
            .movie_root
            .as_deref()
            .unwrap_or(&self.library.root)
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.library.delete_dir, ".delete");
        assert_eq!(config.rename.pattern, SequencePattern::Number2);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [library]
            root = "/videos"

            [files]
            min_video_size_mb = 300
            "#,
        )
        .unwrap();

        assert_eq!(config.library.root, PathBuf::from("/videos"));
        assert_eq!(config.files.min_video_size_mb, 300.0);
        assert_eq!(config.files.match_length, 5);
        assert_eq!(config.actors.unknown_bucket, 99);
    }

    #[test]
    fn test_actor_mapping_table() {
        let config = Config::from_toml(
            r#"
            [actors.mapping]
            "蒼井そら" = "苍井空"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.actors.mapping.get("蒼井そら").map(String::as_str),
            Some("苍井空")
        );
    }

    #[test]
    fn test_unknown_rename_pattern_is_rejected() {
        let result = Config::from_toml(
            r#"
            [rename]
            pattern = "roman"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let result = Config::from_toml(
            r#"
            [library]
            batch_size = 0
            "#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                field: "library.batch_size",
                ..
            })
        ));
    }

    #[test]
    fn test_colliding_numeric_buckets_are_rejected() {
        let result = Config::from_toml(
            r#"
            [actors]
            kana_bucket = 7
            unknown_bucket = 7
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_exclude_glob_returns_error() {
        let result = Config::from_toml(
            r#"
            [library]
            exclude = ["[invalid"]
            "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidGlobPattern(_))));
    }

    #[test]
    fn test_sequence_pattern_values() {
        assert_eq!(SequencePattern::Number.value(0).as_deref(), Some("1"));
        assert_eq!(SequencePattern::Letter.value(1).as_deref(), Some("B"));
        assert_eq!(SequencePattern::Number2.value(8).as_deref(), Some("09"));
        assert_eq!(SequencePattern::Letter.value(26), None);
        assert_eq!(SequencePattern::Number2.value(99), None);
    }

    #[test]
    fn test_movie_root_falls_back_to_library_root() {
        let mut config = Config::default();
        config.library.root = PathBuf::from("/library");
        assert_eq!(config.movie_root(), Path::new("/library"));

        config.library.movie_root = Some(PathBuf::from("/movies"));
        assert_eq!(config.movie_root(), Path::new("/movies"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = Config::load(Some(Path::new("/non/existent/vidtidy.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }
}
