use std::collections::BTreeMap;

use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AjaxError {
    #[error("invalid request url {0}")]
    InvalidUrl(String),
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: StatusCode },
    #[error("malformed json from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Per-call overrides. `GET` data goes to the query string, anything else is
/// sent as a form body.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub data: BTreeMap<String, String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            method: Method::GET,
            data: BTreeMap::new(),
        }
    }
}

impl RequestOptions {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Thin JSON request helper. One network call per invocation, no retries.
#[derive(Debug, Clone, Default)]
pub struct AjaxClient {
    client: reqwest::Client,
}

impl AjaxClient {
    pub fn new() -> AjaxClient {
        AjaxClient {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> AjaxClient {
        AjaxClient { client }
    }

    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<T, AjaxError> {
        let parsed = url::Url::parse(url).map_err(|_| AjaxError::InvalidUrl(url.to_string()))?;

        let mut req = self
            .client
            .request(options.method.clone(), parsed)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        if !options.data.is_empty() {
            req = if options.method == Method::GET {
                req.query(&options.data)
            } else {
                req.form(&options.data)
            };
        }

        log::debug!("{} {url}", options.method);
        let res = req.send().await.map_err(|source| AjaxError::Network {
            url: url.to_string(),
            source,
        })?;

        let status = res.status();
        if !status.is_success() {
            return Err(AjaxError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = res.text().await.map_err(|source| AjaxError::Network {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|source| AjaxError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Callback flavour: `on_success` runs only when the call succeeded and
    /// the body decoded as `T`.
    pub async fn send<T, F>(
        &self,
        url: &str,
        on_success: F,
        options: Option<RequestOptions>,
    ) -> Result<(), AjaxError>
    where
        T: DeserializeOwned,
        F: FnOnce(T),
    {
        let value = self.fetch_json(url, options.unwrap_or_default()).await?;
        on_success(value);
        Ok(())
    }
}
