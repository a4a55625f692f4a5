//! Movie name resolution.
//!
//! A resolver turns a folder name, its video file names, and a metadata
//! summary into canonical movie names. The movie planner calls it first and
//! falls back to local heuristics whenever it has no answer.

use crate::config::RetryConfig;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The resolver could not be reached or failed mid-request.
    #[error("Resolver request failed: {0}")]
    Transient(String),
    #[error("Resolver is rate limiting requests")]
    RateLimited,
    #[error("Invalid resolver response: {0}")]
    InvalidResponse(String),
    #[error("Failed to load resolver answers from {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },
}

impl ResolveError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::Transient(_) | ResolveError::RateLimited)
    }
}

/// What the movie planner knows about a candidate folder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveRequest {
    pub folder_name: String,
    pub video_file_names: Vec<String>,
    pub metadata_summary: String,
}

/// Canonical names for one movie.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MovieIdentity {
    #[serde(default)]
    pub chinese_name: Option<String>,
    #[serde(default)]
    pub english_name: String,
    #[serde(default, deserialize_with = "year_field")]
    pub year: Option<String>,
    #[serde(default)]
    pub confidence: f32,
}

impl MovieIdentity {
    /// An identity is usable only with an English title.
    pub fn is_complete(&self) -> bool {
        !self.english_name.trim().is_empty()
    }
}

fn year_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Year {
        Number(u32),
        Text(String),
    }

    let year = Option::<Year>::deserialize(deserializer)?.map(|y| match y {
        Year::Number(n) => n.to_string(),
        Year::Text(s) => s.trim().to_string(),
    });
    Ok(year.filter(|y| y.len() == 4 && y.chars().all(|c| c.is_ascii_digit())))
}

/// Source of canonical movie names.
///
/// `Ok(None)` means the resolver has no answer; errors are reserved for
/// failures that might succeed on retry or that indicate a broken resolver.
pub trait MovieNameResolver {
    fn resolve(&self, request: &ResolveRequest) -> Result<Option<MovieIdentity>, ResolveError>;
}

impl<R: MovieNameResolver + ?Sized> MovieNameResolver for Box<R> {
    fn resolve(&self, request: &ResolveRequest) -> Result<Option<MovieIdentity>, ResolveError> {
        (**self).resolve(request)
    }
}

/// A resolver that never has an answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResolver;

impl MovieNameResolver for NoResolver {
    fn resolve(&self, _request: &ResolveRequest) -> Result<Option<MovieIdentity>, ResolveError> {
        Ok(None)
    }
}

/// Answers from a JSON object keyed by folder name.
///
/// ```json
/// { "黑客帝国.The.Matrix.1999.1080p": { "chinese_name": "黑客帝国", "english_name": "The.Matrix", "year": 1999 } }
/// ```
#[derive(Debug, Default, Clone)]
pub struct JsonFileResolver {
    answers: HashMap<String, MovieIdentity>,
}

impl JsonFileResolver {
    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let load_error = |reason: String| ResolveError::Load {
            path: path.to_path_buf(),
            reason,
        };
        let json = fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let answers: HashMap<String, MovieIdentity> =
            serde_json::from_str(&json).map_err(|e| load_error(e.to_string()))?;
        info!(path = %path.display(), answers = answers.len(), "resolver answers loaded");
        Ok(Self { answers })
    }

    pub fn from_answers(answers: HashMap<String, MovieIdentity>) -> Self {
        Self { answers }
    }
}

impl MovieNameResolver for JsonFileResolver {
    fn resolve(&self, request: &ResolveRequest) -> Result<Option<MovieIdentity>, ResolveError> {
        Ok(self.answers.get(&request.folder_name).cloned())
    }
}

/// Bounds on how long a resolver may be retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    /// Overall deadline across all attempts of one request.
    pub timeout: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff(),
            timeout: config.timeout(),
        }
    }
}

/// Wraps a resolver with bounded retries and exponential backoff.
///
/// Exhausted or non-retryable failures are logged and reported as "no
/// answer" so planning can fall back instead of aborting.
pub struct RetryingResolver<R> {
    inner: R,
    policy: RetryPolicy,
}

impl<R: MovieNameResolver> RetryingResolver<R> {
    pub fn new(inner: R, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<R: MovieNameResolver> MovieNameResolver for RetryingResolver<R> {
    fn resolve(&self, request: &ResolveRequest) -> Result<Option<MovieIdentity>, ResolveError> {
        let deadline = Instant::now() + self.policy.timeout;
        let mut backoff = self.policy.initial_backoff;

        for attempt in 1..=self.policy.max_attempts {
            let err = match self.inner.resolve(request) {
                Ok(answer) => return Ok(answer),
                Err(err) => err,
            };

            if !err.is_retryable() {
                warn!(folder = %request.folder_name, error = %err, "resolver failed");
                return Ok(None);
            }
            if matches!(err, ResolveError::RateLimited) {
                backoff *= 2;
            }
            if attempt == self.policy.max_attempts || Instant::now() + backoff > deadline {
                warn!(
                    folder = %request.folder_name,
                    attempts = attempt,
                    error = %err,
                    "resolver retries exhausted"
                );
                return Ok(None);
            }

            debug!(
                folder = %request.folder_name,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %err,
                "retrying resolver"
            );
            thread::sleep(backoff);
            backoff *= 2;
        }

        Ok(None)
    }
}
