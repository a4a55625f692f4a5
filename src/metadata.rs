//! Reading `.nfo` metadata documents.
//!
//! Only a handful of fields matter for planning: performers, titles, the
//! release year, and the dimensions of the video stream. Everything else in
//! the document is ignored.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Failed to read metadata file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Document has no root element")]
    NoRoot,
    #[error("Unclosed element <{0}>")]
    Unclosed(String),
}

/// Dimensions of the first video stream described by the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Raw aspect value as written, e.g. `16:9`, `2.35`, or `2.35:1`.
    pub aspect: Option<String>,
}

impl VideoInfo {
    /// Aspect ratio as a number, from the `aspect` field when parsable and
    /// from the dimensions otherwise.
    pub fn ratio(&self) -> Option<f64> {
        if let Some(ratio) = self.aspect.as_deref().and_then(parse_aspect) {
            return Some(ratio);
        }
        (self.height > 0).then(|| f64::from(self.width) / f64::from(self.height))
    }

    /// Whether the stream is (close to) 16:9.
    pub fn is_sixteen_nine(&self) -> bool {
        self.ratio()
            .is_some_and(|ratio| (ratio - 16.0 / 9.0).abs() <= 0.05)
    }
}

fn parse_aspect(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let ratio = match raw.split_once(':') {
        Some((w, h)) => {
            let w: f64 = w.trim().parse().ok()?;
            let h: f64 = h.trim().parse().ok()?;
            if h == 0.0 {
                return None;
            }
            w / h
        }
        None => raw.parse().ok()?,
    };
    (ratio.is_finite() && ratio > 0.0).then_some(ratio)
}

/// The fields planners read from a folder's metadata document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderMetadata {
    pub actor_names: Vec<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub year: Option<String>,
    pub video: Option<VideoInfo>,
    /// Number of `<actor>` elements, including ones without a name.
    pub actor_elements: usize,
}

impl FolderMetadata {
    /// Reads and parses a metadata file, returning an empty result with a
    /// warning when the file is unreadable or malformed.
    pub fn read(path: &Path) -> Self {
        let parsed = fs::read(path)
            .map_err(MetadataError::from)
            .and_then(|bytes| Self::parse(&String::from_utf8_lossy(&bytes)));
        match parsed {
            Ok(meta) => meta,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable metadata");
                Self::default()
            }
        }
    }

    pub fn parse(xml: &str) -> Result<Self, MetadataError> {
        let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));
        reader.config_mut().trim_text(true);

        let mut meta = Self::default();
        let mut stack: Vec<String> = Vec::new();
        let mut saw_root = false;
        let mut in_video = false;
        let mut video_done = false;
        let mut video = VideoInfo::default();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                    saw_root = true;
                    if name == "actor" {
                        meta.actor_elements += 1;
                    }
                    if name == "video" && !video_done {
                        in_video = true;
                    }
                    stack.push(name);
                }
                Event::Empty(e) => {
                    saw_root = true;
                    if e.local_name().as_ref().eq_ignore_ascii_case(b"actor") {
                        meta.actor_elements += 1;
                    }
                }
                Event::End(_) => {
                    if let Some(name) = stack.pop()
                        && name == "video"
                        && in_video
                    {
                        in_video = false;
                        video_done = true;
                        meta.video = Some(std::mem::take(&mut video));
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape()?.trim().to_string();
                    meta.record(&stack, text, in_video, &mut video);
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).trim().to_string();
                    meta.record(&stack, text, in_video, &mut video);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(MetadataError::Unclosed(open));
        }
        if !saw_root {
            return Err(MetadataError::NoRoot);
        }
        Ok(meta)
    }

    fn record(&mut self, stack: &[String], text: String, in_video: bool, video: &mut VideoInfo) {
        if text.is_empty() {
            return;
        }
        let Some(current) = stack.last().map(String::as_str) else {
            return;
        };

        if in_video {
            match current {
                "width" if video.width == 0 => video.width = text.parse().unwrap_or(0),
                "height" if video.height == 0 => video.height = text.parse().unwrap_or(0),
                "aspect" if video.aspect.is_none() => video.aspect = Some(text),
                _ => {}
            }
            return;
        }

        let parent = stack.len().checked_sub(2).map(|i| stack[i].as_str());
        match (parent, current) {
            (Some("actor"), "name") | (_, "actor") => self.actor_names.push(text),
            _ if stack.len() == 2 => match current {
                "title" if self.title.is_none() => self.title = Some(text),
                "originaltitle" if self.original_title.is_none() => {
                    self.original_title = Some(text)
                }
                "year" if self.year.is_none() => self.year = Some(text),
                _ => {}
            },
            _ => {}
        }
    }

    pub fn first_actor(&self) -> Option<&str> {
        self.actor_names.first().map(String::as_str)
    }
}

/// Movie-level summary handed to the name resolver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieMetadata {
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub year: Option<String>,
    /// At most three performers.
    pub actors: Vec<String>,
}

impl From<&FolderMetadata> for MovieMetadata {
    fn from(meta: &FolderMetadata) -> Self {
        Self {
            title: meta.title.clone(),
            original_title: meta.original_title.clone(),
            year: meta.year.clone(),
            actors: meta.actor_names.iter().take(3).cloned().collect(),
        }
    }
}

impl MovieMetadata {
    /// One-line description, e.g. `Title: Heat; Year: 1995; Actors: Al Pacino`.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(title) = &self.title {
            parts.push(format!("Title: {title}"));
        }
        if let Some(original) = &self.original_title {
            parts.push(format!("Original title: {original}"));
        }
        if let Some(year) = &self.year {
            parts.push(format!("Year: {year}"));
        }
        if !self.actors.is_empty() {
            parts.push(format!("Actors: {}", self.actors.join(", ")));
        }
        parts.join("; ")
    }
}
