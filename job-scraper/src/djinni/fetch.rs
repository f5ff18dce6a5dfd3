use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use url::Url;

use crate::djinni::{Error, ErrorKind, Result};

/// Raw page transport, everything above it only sees response bodies.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, url: &Url) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Skips TLS certificate validation. On by default to match how the site
    /// has always been scraped; turn it off once the target's chain verifies.
    pub accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            accept_invalid_certs: true,
        }
    }
}

/// One pooled `reqwest::Client` shared by every request of a crawl.
/// Connections are released when the client is dropped.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.accept_invalid_certs {
            log::warn!("TLS certificate validation is disabled for this crawl");
        }
        let client = Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpClient {
    async fn get(&self, url: &Url) -> Result<String> {
        log::debug!("GET {}", url);
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let error_body = resp.text().await;
            log::error!(
                "request not successful, url: {}, status: {}, error resp body: {:?}",
                url,
                status,
                error_body,
            );
            return Err(Error::RequestNotOk {
                url: url.to_string(),
                status,
            });
        }
        Ok(resp.text().await?)
    }
}

/// Retries transport failures of the wrapped [`Fetch`] with exponential backoff.
/// With zero retries every call goes straight through.
pub struct Retrying<F> {
    inner: F,
    retries: u32,
    backoff: Duration,
}

impl<F> Retrying<F> {
    pub fn new(inner: F, retries: u32, backoff: Duration) -> Self {
        Self {
            inner,
            retries,
            backoff,
        }
    }
}

#[async_trait]
impl<F: Fetch> Fetch for Retrying<F> {
    async fn get(&self, url: &Url) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.inner.get(url).await {
                Err(e) if e.kind() == ErrorKind::Fetch && attempt < self.retries => {
                    let delay = self.backoff.saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    log::warn!(
                        "fetch of {} failed: {}, retry {}/{} in {:?}",
                        url,
                        e,
                        attempt,
                        self.retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

/// A fetched page, parsed on demand. The parsed tree is not `Send`, so callers
/// parse, extract and drop it between await points.
#[derive(Debug)]
pub struct Page {
    url: Url,
    body: String,
}

impl Page {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

pub struct DocumentFetcher<F> {
    base: Url,
    transport: F,
}

impl<F: Fetch> DocumentFetcher<F> {
    pub fn new(base: Url, transport: F) -> Self {
        Self { base, transport }
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &F {
        &self.transport
    }

    /// Absolute url for `href`, which may be relative to the base url.
    pub fn resolve(&self, href: &str) -> Result<Url> {
        Ok(self.base.join(href)?)
    }

    pub async fn fetch(&self, url: Url) -> Result<Page> {
        let body = self.transport.get(&url).await?;
        Ok(Page { url, body })
    }
}
