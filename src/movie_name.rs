//! Movie name heuristics.
//!
//! Used when no resolver answer is available: pulls a Chinese title, an
//! English title, and a year out of a release folder name, and extracts
//! technical tags from video file names.

use crate::naming::clean_component;
use regex::Regex;
use std::sync::LazyLock;

macro_rules! tag_regex {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(concat!(r"(?i)(?:^|[^a-z0-9])(", $pattern, r")(?:$|[^a-z0-9])"))
                .expect("valid tag regex")
        });
    };
}

tag_regex!(RESOLUTION, r"2160p|1080p|1080i|720p|576p|480p|4k|uhd");
tag_regex!(VIDEO_CODEC, r"x264|x265|h\.?264|h\.?265|hevc|avc|xvid|divx|vp9|av1");
tag_regex!(
    AUDIO_CODEC,
    r"dts-hd(?:\.ma)?|dts-x|dts|truehd|atmos|ddp?5\.1|dd\+|e-?ac-?3|ac-?3|aac(?:2\.0)?|flac|mp3"
);
tag_regex!(
    SOURCE,
    r"blu-?ray|bdrip|brrip|bdremux|remux|web-?dl|webrip|hdtv|dvdrip|hdrip|hdcam"
);
tag_regex!(EXTRAS, r"hdr10\+?|hdr|dolby\.?vision|dv|10bit|imax|extended|unrated|remastered");

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]|【[^】]*】|\{[^}]*\}").expect("valid bracket regex"));

static PAREN_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(（]((?:19|20)\d{2})[)）]").expect("valid year regex"));

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|（[^）]*）").expect("valid parentheses regex"));

static TOKEN_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[.\s_\-])((?:19|20)\d{2})(?:$|[.\s_\-])").expect("valid year token regex")
});

static SITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:www\.)?[a-z0-9\-]+\.(?:com|net|org|cc|xyz|info)\b")
        .expect("valid site regex")
});

static CD_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[-_. ]cd\d+").expect("valid part marker regex"));

/// Names extracted from a release folder name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieNameParts {
    pub chinese_name: Option<String>,
    /// Dot-separated, e.g. `The.Matrix`.
    pub english_name: Option<String>,
    pub year: Option<String>,
}

fn is_han(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
}

fn is_separator(c: char) -> bool {
    matches!(c, '.' | '_' | '-' | ' ' | '·' | '：' | ':')
}

/// Converts a title to dot-separated form.
pub fn dotted(name: &str) -> String {
    clean_component(name)
        .split(|c: char| c.is_whitespace() || c == '_' || c == '.')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// Parses a release folder name into Chinese title, English title, and year.
///
/// Bracketed groups and site promotions are dropped. The year is taken from
/// a parenthesized `(YYYY)` first, then from a delimited four-digit token;
/// everything after the year is treated as release tags. Without a year,
/// the name is cut at the first technical tag.
pub fn parse_folder_name(name: &str) -> MovieNameParts {
    let stripped = BRACKETED.replace_all(name, " ");
    let stripped = SITE.replace_all(&stripped, " ").into_owned();

    let (year, title_part) = if let Some(caps) = PAREN_YEAR.captures(&stripped) {
        let whole = caps.get(0).map_or(0, |m| m.start());
        (
            caps.get(1).map(|m| m.as_str().to_string()),
            stripped[..whole].to_string(),
        )
    } else if let Some(caps) = TOKEN_YEAR.captures(&stripped) {
        let year = caps.get(1);
        // A leading year is more likely part of the title, e.g. "2012".
        match year {
            Some(m) if m.start() > 0 => (
                Some(m.as_str().to_string()),
                stripped[..m.start()].to_string(),
            ),
            _ => (None, cut_at_first_tag(&stripped).to_string()),
        }
    } else {
        (None, cut_at_first_tag(&stripped).to_string())
    };

    let title_part = PARENTHESIZED.replace_all(&title_part, " ");
    let title_part = title_part.trim_matches(|c: char| c.is_whitespace() || is_separator(c));

    let han_end = if title_part.starts_with(is_han) {
        title_part
            .char_indices()
            .find(|&(_, c)| !(is_han(c) || c.is_ascii_digit() || matches!(c, '·' | '：')))
            .map_or(title_part.len(), |(i, _)| i)
    } else {
        0
    };
    let chinese = clean_component(title_part[..han_end].trim_matches(is_separator));
    let english = dotted(title_part[han_end..].trim_matches(is_separator));

    MovieNameParts {
        chinese_name: Some(chinese).filter(|c| !c.is_empty()),
        english_name: Some(english).filter(|e| !e.is_empty()),
        year,
    }
}

fn cut_at_first_tag(text: &str) -> &str {
    [&RESOLUTION, &VIDEO_CODEC, &SOURCE, &AUDIO_CODEC]
        .iter()
        .filter_map(|re| re.find(text).map(|m| m.start()))
        .min()
        .map_or(text, |at| &text[..at])
}

/// Canonical movie folder name: `{chinese.}{english} ({year}).{marker}`.
///
/// `discriminator` is inserted before the marker when two movies would
/// otherwise collide.
pub fn canonical_folder_name(
    chinese: Option<&str>,
    english: &str,
    year: Option<&str>,
    marker: &str,
    discriminator: Option<usize>,
) -> String {
    let mut name = match (chinese, english.is_empty()) {
        (Some(cn), false) => format!("{cn}.{english}"),
        (Some(cn), true) => cn.to_string(),
        (None, _) => english.to_string(),
    };
    if let Some(year) = year {
        name.push_str(&format!(" ({year})"));
    }
    if let Some(n) = discriminator {
        name.push_str(&format!(" ({n})"));
    }
    format!("{name}.{marker}")
}

/// Whether a folder name ends with the done marker.
pub fn is_organized(name: &str, marker: &str) -> bool {
    name.ends_with(&format!(".{marker}"))
}

/// Technical tags found in a video file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoTechInfo {
    pub resolution: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub source: Option<String>,
    pub extras: Vec<String>,
}

fn first_tag(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

impl VideoTechInfo {
    pub fn extract(stem: &str) -> Self {
        let mut extras: Vec<String> = Vec::new();
        // Matches may share a delimiter, so scan from each delimiter in turn.
        let mut offset = 0;
        while let Some(caps) = EXTRAS.captures_at(stem, offset) {
            let Some(tag) = caps.get(1) else { break };
            if !extras.iter().any(|e| e.eq_ignore_ascii_case(tag.as_str())) {
                extras.push(tag.as_str().to_string());
            }
            offset = tag.end();
        }

        Self {
            resolution: first_tag(&RESOLUTION, stem),
            video_codec: first_tag(&VIDEO_CODEC, stem),
            audio_codec: first_tag(&AUDIO_CODEC, stem),
            source: first_tag(&SOURCE, stem),
            extras,
        }
    }

    /// Tags in resolution, video codec, audio codec, source, extras order.
    pub fn tags(&self) -> Vec<&str> {
        [
            &self.resolution,
            &self.video_codec,
            &self.audio_codec,
            &self.source,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .chain(self.extras.iter().map(String::as_str))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tags().is_empty()
    }
}

/// The `-cdN` part marker of a video stem, normalised to lowercase.
pub fn part_marker(stem: &str) -> Option<String> {
    CD_MARKER
        .find(stem)
        .map(|m| format!("-{}", m.as_str()[1..].to_lowercase()))
}

/// Base name shared by a movie's video and subtitle files:
/// `English.Year.tags`.
pub fn movie_file_base(english: &str, year: Option<&str>, tech: &VideoTechInfo) -> String {
    let mut parts = vec![english];
    if let Some(year) = year {
        parts.push(year);
    }
    parts.extend(tech.tags());
    parts.join(".")
}

/// The language code at the end of a subtitle stem, if it is a known one.
pub fn subtitle_language<'a>(stem: &'a str, languages: &[String]) -> Option<&'a str> {
    let (_, code) = stem.rsplit_once(['.', '_'])?;
    languages
        .iter()
        .any(|lang| lang.eq_ignore_ascii_case(code))
        .then_some(code)
}

/// The first role keyword contained in an image stem.
pub fn image_role<'a>(stem: &str, keywords: &'a [String]) -> Option<&'a str> {
    let stem = stem.to_lowercase();
    keywords
        .iter()
        .find(|keyword| stem.contains(&keyword.to_lowercase()))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(cn: Option<&str>, en: Option<&str>, year: Option<&str>) -> MovieNameParts {
        MovieNameParts {
            chinese_name: cn.map(String::from),
            english_name: en.map(String::from),
            year: year.map(String::from),
        }
    }

    #[test]
    fn test_parse_scene_release() {
        assert_eq!(
            parse_folder_name("The.Matrix.1999.1080p.BluRay.x264-GROUP"),
            parts(None, Some("The.Matrix"), Some("1999"))
        );
    }

    #[test]
    fn test_parse_chinese_and_english() {
        assert_eq!(
            parse_folder_name("[电影天堂www.dytt89.com]黑客帝国.The Matrix (1999) [1080p]"),
            parts(Some("黑客帝国"), Some("The.Matrix"), Some("1999"))
        );
    }

    #[test]
    fn test_parse_without_year_cuts_at_tags() {
        assert_eq!(
            parse_folder_name("Inception 1080p WEB-DL"),
            parts(None, Some("Inception"), None)
        );
    }

    #[test]
    fn test_leading_year_is_title() {
        let parsed = parse_folder_name("2012.720p.HDTV");
        assert_eq!(parsed.year, None);
        assert_eq!(parsed.english_name.as_deref(), Some("2012"));
    }

    #[test]
    fn test_canonical_folder_name() {
        assert_eq!(
            canonical_folder_name(Some("黑客帝国"), "The.Matrix", Some("1999"), "fixed", None),
            "黑客帝国.The.Matrix (1999).fixed"
        );
        assert_eq!(
            canonical_folder_name(None, "Heat", None, "fixed", Some(2)),
            "Heat (2).fixed"
        );
        assert!(is_organized("Heat (1995).fixed", "fixed"));
        assert!(!is_organized("Heat (1995)", "fixed"));
        assert!(is_organized("Heat (1995) (2).fixed", "fixed"));
        assert!(!is_organized("Movie.fixed.1080p", "fixed"));
    }

    #[test]
    fn test_tech_info_order() {
        let tech = VideoTechInfo::extract("the.matrix.1999.BluRay.HDR.x265.2160p.DTS-HD.MA.10bit");
        assert_eq!(
            tech.tags(),
            vec!["2160p", "x265", "DTS-HD.MA", "BluRay", "HDR", "10bit"]
        );
    }

    #[test]
    fn test_tech_info_empty() {
        assert!(VideoTechInfo::extract("home movie").is_empty());
    }

    #[test]
    fn test_movie_file_base() {
        let tech = VideoTechInfo::extract("x.1080p.x264");
        assert_eq!(
            movie_file_base("The.Matrix", Some("1999"), &tech),
            "The.Matrix.1999.1080p.x264"
        );
        assert_eq!(
            movie_file_base("Heat", None, &VideoTechInfo::default()),
            "Heat"
        );
    }

    #[test]
    fn test_part_marker() {
        assert_eq!(part_marker("movie-CD2").as_deref(), Some("-cd2"));
        assert_eq!(part_marker("movie.cd1").as_deref(), Some("-cd1"));
        assert_eq!(part_marker("movie"), None);
    }

    #[test]
    fn test_subtitle_language() {
        let langs = vec!["chs".to_string(), "eng".to_string()];
        assert_eq!(subtitle_language("Movie.chs", &langs), Some("chs"));
        assert_eq!(subtitle_language("Movie_ENG", &langs), Some("ENG"));
        assert_eq!(subtitle_language("Movie.forced", &langs), None);
        assert_eq!(subtitle_language("Movie", &langs), None);
    }

    #[test]
    fn test_image_role() {
        let keywords = vec!["poster".to_string(), "fanart".to_string()];
        assert_eq!(image_role("movie-poster", &keywords), Some("poster"));
        assert_eq!(image_role("FANART", &keywords), Some("fanart"));
        assert_eq!(image_role("screenshot1", &keywords), None);
    }
}
