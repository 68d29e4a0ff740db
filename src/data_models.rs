use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Number of positions on the strictness slider. The backend level is the
/// slider value counted from the other end.
pub const SLIDER_MAX: u8 = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("slider value {0} is outside 1..=4")]
    SliderOutOfRange(i64),
    #[error("level {0} is outside 0..=3")]
    LevelOutOfRange(i64),
}

/// Backend-facing strictness filter, always in `0..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Level(u8);

impl Level {
    /// Level for a raw slider position (`4 - slider`).
    pub fn from_slider(slider: i64) -> Result<Level, FormError> {
        if !(1..=SLIDER_MAX as i64).contains(&slider) {
            return Err(FormError::SliderOutOfRange(slider));
        }
        Ok(Level(SLIDER_MAX - slider as u8))
    }

    pub fn new(level: i64) -> Result<Level, FormError> {
        if !(0..SLIDER_MAX as i64).contains(&level) {
            return Err(FormError::LevelOutOfRange(level));
        }
        Ok(Level(level as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// The slider position that produces this level.
    pub fn slider(self) -> u8 {
        SLIDER_MAX - self.0
    }
}

impl Default for Level {
    fn default() -> Self {
        Level(0)
    }
}

impl TryFrom<i64> for Level {
    type Error = FormError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Level::new(value)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        level.0
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw contents of the search form as the user left it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchForm {
    pub query: String,
    pub slider: i64,
}

impl SearchForm {
    pub fn new(query: impl Into<String>, slider: i64) -> SearchForm {
        SearchForm {
            query: query.into(),
            slider,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub level: Level,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, level: Level) -> SearchRequest {
        SearchRequest {
            query: query.into(),
            level,
        }
    }

    /// Empty queries are passed through untouched; the endpoint decides.
    pub fn from_form(form: &SearchForm) -> Result<SearchRequest, FormError> {
        Ok(SearchRequest {
            query: form.query.clone(),
            level: Level::from_slider(form.slider)?,
        })
    }
}

/// Link targets must be absolute `http`/`https` urls; anything else fails the
/// whole response.
fn deserialize_link<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let url = url::Url::parse(&raw)
        .map_err(|e| D::Error::custom(format!("invalid html_url {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(raw),
        other => Err(D::Error::custom(format!(
            "html_url {raw:?} has unsupported scheme {other}"
        ))),
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Solution {
    pub body: String,
    #[serde(deserialize_with = "deserialize_link")]
    pub html_url: String,
    pub positive_score: serde_json::Number,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SimilarIssue {
    pub title: String,
    #[serde(deserialize_with = "deserialize_link")]
    pub html_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SearchResults {
    #[serde(default)]
    pub solutions: Vec<Solution>,
    #[serde(default)]
    pub similar: Vec<SimilarIssue>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty() && self.similar.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub q: String,
    pub has_results: bool,
    pub results: SearchResults,
    /// Slider position echoed back by the endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default)]
    pub search_made: bool,
}

impl SearchResponse {
    /// Response for `request` with `has_results` derived from the groups.
    pub fn for_request(request: &SearchRequest, results: SearchResults) -> SearchResponse {
        SearchResponse {
            q: request.query.clone(),
            has_results: !results.is_empty(),
            results,
            level: Some(request.level.slider()),
            search_made: true,
        }
    }
}

#[test]
fn test_level_from_slider() {
    assert_eq!(Level::from_slider(1).unwrap().value(), 3);
    assert_eq!(Level::from_slider(2).unwrap().value(), 2);
    assert_eq!(Level::from_slider(3).unwrap().value(), 1);
    assert_eq!(Level::from_slider(4).unwrap().value(), 0);
    assert_eq!(Level::from_slider(0), Err(FormError::SliderOutOfRange(0)));
    assert_eq!(Level::from_slider(5), Err(FormError::SliderOutOfRange(5)));
    for v in 1..=4 {
        assert_eq!(Level::from_slider(v).unwrap().slider() as i64, v);
    }
}

#[test]
fn test_links_must_be_absolute_http() {
    let issue = |url: &str| {
        serde_json::from_value::<SimilarIssue>(serde_json::json!({"title": "t", "html_url": url}))
    };
    assert!(issue("https://github.com/a/b/issues/1").is_ok());
    assert!(issue("http://tracker.local/7#c2").is_ok());
    assert!(issue("javascript:alert(document.cookie)").is_err());
    assert!(issue("/a/b/issues/1").is_err());
    assert!(issue("not a url at all").is_err());
    assert!(issue("data:text/html,<b>x</b>").is_err());
}
