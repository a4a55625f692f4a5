//! Placeholder performer enrichment for metadata documents.
//!
//! Some releases list no performer at all; their title carries a code such
//! as `FC2-PPV` instead. Enrichment inserts those codes as `<actor>` entries
//! so the actor planner files them under a predictable name. It is the only
//! operation that writes to disk outside of plan application.

use crate::scanner::DirTree;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed XML in {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

/// What enrichment did to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// Performers were inserted.
    Added(Vec<String>),
    /// The document already lists performers; left untouched.
    AlreadyHasPerformers,
    /// The title carries no placeholder code.
    NoPlaceholderCode,
    NoTitle,
}

/// Totals for an enrichment run over a tree.
#[derive(Debug, Default)]
pub struct EnrichReport {
    pub updated: usize,
    pub unchanged: usize,
    pub failed: Vec<(PathBuf, String)>,
}

/// Scans a document for its title and whether it has `<actor>` elements.
fn inspect(xml: &str) -> Result<(Option<String>, bool), quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut depth = 0usize;
    let mut in_title = false;
    let mut title = None;
    let mut has_actor = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                let name = e.local_name();
                if name.as_ref().eq_ignore_ascii_case(b"actor") {
                    has_actor = true;
                }
                in_title = depth == 2 && name.as_ref().eq_ignore_ascii_case(b"title");
            }
            Event::Empty(e) => {
                if e.local_name().as_ref().eq_ignore_ascii_case(b"actor") {
                    has_actor = true;
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                in_title = false;
            }
            Event::Text(e) if in_title && title.is_none() => {
                title = Some(e.unescape()?.trim().to_string());
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok((title, has_actor))
}

/// Copies the document, inserting one `<actor>` per code before the root
/// element closes.
fn insert_performers(xml: &str, codes: &[String]) -> Result<Vec<u8>, String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    for code in codes {
                        let performer = [
                            Event::Text(BytesText::new("  ")),
                            Event::Start(BytesStart::new("actor")),
                            Event::Start(BytesStart::new("name")),
                            Event::Text(BytesText::new(code)),
                            Event::End(BytesEnd::new("name")),
                            Event::End(BytesEnd::new("actor")),
                            Event::Text(BytesText::new("\n")),
                        ];
                        for part in performer {
                            writer.write_event(part).map_err(|e| e.to_string())?;
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        writer.write_event(event).map_err(|e| e.to_string())?;
    }

    Ok(writer.into_inner().into_inner())
}

/// Adds placeholder performers to the document at `path` when it has no
/// `<actor>` element and its title contains one of `codes`.
///
/// Codes are matched case-insensitively and inserted in the configured order.
/// Running this twice on the same file changes nothing the second time.
pub fn enrich_placeholder_performers(
    path: &Path,
    codes: &[String],
) -> Result<EnrichOutcome, EnrichError> {
    let bytes = fs::read(path).map_err(|source| EnrichError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let xml = String::from_utf8_lossy(&bytes);
    let malformed = |reason: String| EnrichError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let (title, has_actor) = inspect(&xml).map_err(|e| malformed(e.to_string()))?;
    if has_actor {
        return Ok(EnrichOutcome::AlreadyHasPerformers);
    }
    let Some(title) = title.filter(|t| !t.is_empty()) else {
        return Ok(EnrichOutcome::NoTitle);
    };

    let upper = title.to_uppercase();
    let found: Vec<String> = codes
        .iter()
        .filter(|code| upper.contains(&code.to_uppercase()))
        .cloned()
        .collect();
    if found.is_empty() {
        return Ok(EnrichOutcome::NoPlaceholderCode);
    }

    let rewritten = insert_performers(&xml, &found).map_err(malformed)?;
    fs::write(path, rewritten).map_err(|source| EnrichError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), performers = ?found, "placeholder performers added");
    Ok(EnrichOutcome::Added(found))
}

/// Enriches every metadata document in the tree.
pub fn enrich_tree(tree: &DirTree, codes: &[String]) -> EnrichReport {
    let mut report = EnrichReport::default();
    let mut stack = vec![tree.root_id()];

    while let Some(id) = stack.pop() {
        let node = tree.node(id);
        stack.extend(node.children.iter().rev().copied());

        for file in node.files_of(crate::file_category::FileKind::Metadata) {
            match enrich_placeholder_performers(&file.path, codes) {
                Ok(EnrichOutcome::Added(_)) => report.updated += 1,
                Ok(outcome) => {
                    debug!(path = %file.path.display(), ?outcome, "metadata left unchanged");
                    report.unchanged += 1;
                }
                Err(err) => {
                    warn!(error = %err, "enrichment failed");
                    report.failed.push((file.path.clone(), err.to_string()));
                }
            }
        }
    }

    report
}
