use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Url;
use thiserror::Error;

use crate::data_models::SearchRequest;

/// Path segment of the JSON endpoint, relative to the page directory.
pub const RESULTS_SEGMENT: &str = "results";

/// Characters left alone by `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

fn query_string(request: &SearchRequest) -> String {
    format!("q={}&level={}", encode_component(&request.query), request.level)
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("invalid page url {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("page url {0} has no host")]
    NoHost(String),
}

/// How the address bar is rewritten after a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    /// Origin and page path only; the query string is dropped.
    #[default]
    BasePath,
    /// Keep `?q=..&level=..` so the address can be bookmarked.
    WithQuery,
}

impl std::str::FromStr for AddressMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base" | "base-path" => Ok(AddressMode::BasePath),
            "query" | "with-query" => Ok(AddressMode::WithQuery),
            other => Err(format!("unknown address mode: {other}")),
        }
    }
}

/// Origin and directory path of the page hosting the search form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    origin: String,
    path: String,
}

impl PageLocation {
    /// Any query or fragment on `page_url` is ignored. A path that does not end
    /// in `/` is cut back to its directory.
    pub fn parse(page_url: &str) -> Result<PageLocation, LocationError> {
        let url = Url::parse(page_url).map_err(|source| LocationError::Parse {
            url: page_url.to_string(),
            source,
        })?;
        PageLocation::from_url(&url)
    }

    pub fn from_url(url: &Url) -> Result<PageLocation, LocationError> {
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(LocationError::NoHost(url.to_string()));
        }
        let origin = origin.ascii_serialization();
        let path = url.path();
        let path = match path.rfind('/') {
            Some(idx) => path[..=idx].to_string(),
            None => "/".to_string(),
        };
        Ok(PageLocation { origin, path })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn page_url(&self) -> String {
        format!("{}{}", self.origin, self.path)
    }

    /// `<origin><path>results?q=<encoded>&level=<level>`
    pub fn results_url(&self, request: &SearchRequest) -> String {
        format!(
            "{}{}{}?{}",
            self.origin,
            self.path,
            RESULTS_SEGMENT,
            query_string(request)
        )
    }

    /// Address shown after a submission: the page url, followed by the
    /// request's query string only in [`AddressMode::WithQuery`].
    pub fn display_url(&self, request: &SearchRequest, mode: AddressMode) -> String {
        match mode {
            AddressMode::BasePath => self.page_url(),
            AddressMode::WithQuery => format!("{}?{}", self.page_url(), query_string(request)),
        }
    }
}

/// Address bar stand-in: records pushed entries without navigating.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new(initial: impl Into<String>) -> History {
        History {
            entries: vec![initial.into()],
        }
    }

    pub fn push_state(&mut self, url: String) {
        log::debug!("history push: {url}");
        self.entries.push(url);
    }

    pub fn current(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[test]
fn test_encode_component_matches_uri_component_rules() {
    assert_eq!(encode_component("error: null pointer"), "error%3A%20null%20pointer");
    assert_eq!(encode_component("a&b=c?d/e#f"), "a%26b%3Dc%3Fd%2Fe%23f");
    assert_eq!(encode_component("keep-_.!~*'()"), "keep-_.!~*'()");
    assert_eq!(encode_component("100% + ü"), "100%25%20%2B%20%C3%BC");
    assert_eq!(encode_component(""), "");
}
