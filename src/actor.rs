//! Performer name classification.
//!
//! A performer name is sorted into a bucket based on the script it is
//! written in:
//!
//! * Latin names go under their uppercased first letter.
//! * Chinese names go under the first letter of the first character's pinyin.
//! * Japanese names (any kana present) go under a fixed numeric bucket.
//! * Everything else goes under the unknown bucket.
//!
//! A name containing kana is never treated as Chinese even when it starts
//! with a kanji that has a pinyin reading.

use crate::config::ActorConfig;
use crate::naming::clean_component;
use pinyin::ToPinyin;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|（[^）]*）").expect("valid parentheses regex"));

static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\w\s\u{3040}-\u{309F}\u{30A0}-\u{30FF}\p{Han}]").expect("valid noise regex")
});

/// The writing system a performer name was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Latin,
    Han,
    Kana,
    Unknown,
}

/// Top-level bucket folder a classified performer is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Letter(char),
    Numeric(u32),
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Letter(c) => write!(f, "{c}"),
            Bucket::Numeric(n) => write!(f, "{n}"),
        }
    }
}

/// Result of classifying one performer name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorClassification {
    Latin {
        initial: char,
        display_name: String,
    },
    Han {
        initial: char,
        display_name: String,
    },
    Kana {
        bucket: u32,
        display_name: String,
        needs_manual_mapping: bool,
    },
    Unknown {
        bucket: u32,
    },
}

impl ActorClassification {
    pub fn script(&self) -> Script {
        match self {
            ActorClassification::Latin { .. } => Script::Latin,
            ActorClassification::Han { .. } => Script::Han,
            ActorClassification::Kana { .. } => Script::Kana,
            ActorClassification::Unknown { .. } => Script::Unknown,
        }
    }

    pub fn bucket(&self) -> Bucket {
        match self {
            ActorClassification::Latin { initial, .. } | ActorClassification::Han { initial, .. } => {
                Bucket::Letter(*initial)
            }
            ActorClassification::Kana { bucket, .. } | ActorClassification::Unknown { bucket } => {
                Bucket::Numeric(*bucket)
            }
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            ActorClassification::Latin { display_name, .. }
            | ActorClassification::Han { display_name, .. }
            | ActorClassification::Kana { display_name, .. } => Some(display_name),
            ActorClassification::Unknown { .. } => None,
        }
    }

    /// Second-level folder: the first character of the display name.
    pub fn sort_initial(&self) -> Option<char> {
        self.display_name()
            .and_then(|name| name.chars().next())
            .map(|c| c.to_ascii_uppercase())
    }

    pub fn needs_manual_mapping(&self) -> bool {
        matches!(
            self,
            ActorClassification::Kana {
                needs_manual_mapping: true,
                ..
            }
        )
    }
}

fn is_kana(c: char) -> bool {
    matches!(c, '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}')
}

/// Classifies performer names into buckets.
#[derive(Debug, Clone)]
pub struct ActorClassifier {
    kana_bucket: u32,
    unknown_bucket: u32,
    require_mapping: bool,
    mapping: BTreeMap<String, String>,
}

impl ActorClassifier {
    pub fn new(config: &ActorConfig) -> Self {
        Self {
            kana_bucket: config.kana_bucket,
            unknown_bucket: config.unknown_bucket,
            require_mapping: config.require_mapping,
            mapping: config.mapping.clone(),
        }
    }

    /// Strips parenthesized annotations and punctuation, keeping letters,
    /// digits, whitespace, kana, and Han characters.
    pub fn clean_name(raw: &str) -> String {
        let without_parens = PARENTHESIZED.replace_all(raw, "");
        NOISE.replace_all(&without_parens, "").trim().to_string()
    }

    pub fn classify(&self, raw: &str) -> ActorClassification {
        let cleaned = Self::clean_name(raw);
        let Some(first) = cleaned.chars().next() else {
            return ActorClassification::Unknown {
                bucket: self.unknown_bucket,
            };
        };

        if first.is_ascii_alphabetic() {
            return ActorClassification::Latin {
                initial: first.to_ascii_uppercase(),
                display_name: self.display_name(raw, &cleaned),
            };
        }

        let has_kana = cleaned.chars().any(is_kana);
        if !has_kana
            && let Some(reading) = first.to_pinyin()
            && let Some(initial) = reading.plain().chars().next()
            && initial.is_ascii_alphabetic()
        {
            return ActorClassification::Han {
                initial: initial.to_ascii_uppercase(),
                display_name: self.display_name(raw, &cleaned),
            };
        }

        let converted = kakasi::convert(&cleaned);
        if has_kana || converted.hiragana.chars().any(is_kana) {
            let mapped = self.mapped_name(raw, &cleaned).is_some();
            return ActorClassification::Kana {
                bucket: self.kana_bucket,
                display_name: self.display_name(raw, &cleaned),
                needs_manual_mapping: self.require_mapping && !mapped,
            };
        }

        ActorClassification::Unknown {
            bucket: self.unknown_bucket,
        }
    }

    fn mapped_name(&self, raw: &str, cleaned: &str) -> Option<&str> {
        self.mapping
            .get(raw.trim())
            .or_else(|| self.mapping.get(cleaned))
            .map(String::as_str)
    }

    /// The mapped name when configured, otherwise the cleaned raw name.
    fn display_name(&self, raw: &str, cleaned: &str) -> String {
        let mapped = self
            .mapped_name(raw, cleaned)
            .map(clean_component)
            .filter(|name| !name.is_empty());
        mapped.unwrap_or_else(|| clean_component(cleaned))
    }
}
