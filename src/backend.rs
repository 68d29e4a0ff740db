use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::ajax::{AjaxClient, AjaxError, RequestOptions};
use crate::data_models::{Level, SearchRequest, SearchResponse, SearchResults, SimilarIssue, Solution};
use crate::location::PageLocation;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("upstream search failed: {0}")]
    Upstream(#[from] AjaxError),
    #[error("failed to read fixtures from {path}: {source}")]
    FixtureIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse fixtures from {path}: {source}")]
    FixtureParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The ranking service behind the `results` endpoint.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, BackendError>;
}

/// Most solutions returned for a level; stricter levels return fewer.
pub fn max_solutions(level: Level) -> Option<usize> {
    match level.value() {
        1 => Some(50),
        2 => Some(30),
        3 => Some(15),
        _ => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureEntry {
    /// Matched case-insensitively as a substring of the query.
    pub pattern: String,
    #[serde(default)]
    pub solutions: Vec<Solution>,
    #[serde(default)]
    pub similar: Vec<SimilarIssue>,
}

/// Canned results keyed by query substrings, in file order.
#[derive(Debug, Clone, Default)]
pub struct FixtureBackend {
    entries: Vec<FixtureEntry>,
}

impl FixtureBackend {
    pub fn new(entries: Vec<FixtureEntry>) -> Self {
        Self { entries }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| BackendError::FixtureIo {
            path: path.display().to_string(),
            source,
        })?;
        let entries: Vec<FixtureEntry> =
            serde_json::from_str(&raw).map_err(|source| BackendError::FixtureParse {
                path: path.display().to_string(),
                source,
            })?;
        log::info!("loaded {} fixture entries from {}", entries.len(), path.display());
        Ok(Self::new(entries))
    }
}

#[async_trait]
impl SearchBackend for FixtureBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, BackendError> {
        let query = request.query.to_lowercase();
        let mut results = SearchResults::default();
        if query.trim().is_empty() {
            return Ok(results);
        }

        for entry in &self.entries {
            if query.contains(&entry.pattern.to_lowercase()) {
                results.solutions.extend(entry.solutions.iter().cloned());
                results.similar.extend(entry.similar.iter().cloned());
            }
        }

        if let Some(max) = max_solutions(request.level) {
            results.solutions.truncate(max);
        }
        Ok(results)
    }
}

/// Forwards to another deployment's `results` endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamBackend {
    client: AjaxClient,
    location: PageLocation,
}

impl UpstreamBackend {
    pub fn new(client: AjaxClient, location: PageLocation) -> Self {
        Self { client, location }
    }
}

#[async_trait]
impl SearchBackend for UpstreamBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, BackendError> {
        let url = self.location.results_url(request);
        let res: SearchResponse = self
            .client
            .fetch_json(&url, RequestOptions::default())
            .await?;
        if !res.has_results {
            return Ok(SearchResults::default());
        }
        Ok(res.results)
    }
}
