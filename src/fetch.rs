use std::time::Duration;

use anyhow::Context as _;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use url::Url;

use crate::chapter::SOURCE_PREFIX;
use crate::error::FetchError;

/// Request shape for chapter pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub referer: String,
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0".to_owned(),
            referer: SOURCE_PREFIX.to_owned(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Retrieves the raw markup of one chapter page. One call, one request; no retries.
pub trait MarkupFetcher {
    fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

impl<T: MarkupFetcher + ?Sized> MarkupFetcher for &T {
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        (**self).fetch(url)
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("user agent header")?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&config.referer).context("referer header")?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .default_headers(headers)
            .build()
            .context("build chapter http client")?;

        Ok(Self { client })
    }
}

impl MarkupFetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })
    }
}
