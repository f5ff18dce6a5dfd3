use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args};
use job_scraper::djinni::crawler::{CrawlConfig, Crawler, DEFAULT_BASE_URL, DEFAULT_KEYWORD};
use job_scraper::djinni::fetch::{ClientConfig, HttpClient, Retrying};
use persistence::{CsvSink, ResultSink};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Scrape failed: {0}")]
    Scrape(#[from] job_scraper::djinni::Error),
    #[error("Saving jobs failed: {0}")]
    Persistence(#[from] persistence::Error),
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Listing filter, sent as `primary_keyword`
    #[arg(long, default_value = DEFAULT_KEYWORD)]
    pub(crate) keyword: String,

    /// Listing endpoint, relative job links resolve against it
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub(crate) base_url: Url,

    #[arg(long, default_value = "data")]
    pub(crate) output_dir: PathBuf,

    /// File name of the CSV inside the output dir
    #[arg(long, default_value = "jobs.csv")]
    pub(crate) output: PathBuf,

    /// Max requests in flight while fetching listing or job pages
    #[arg(long, default_value = "10")]
    pub(crate) concurrency: NonZeroUsize,

    /// Skip TLS certificate validation
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub(crate) accept_invalid_certs: bool,

    /// Retries per request on transport errors
    #[arg(long, default_value_t = 0)]
    pub(crate) retries: u32,

    /// Delay before the first retry, doubled on every further one
    #[arg(long, default_value_t = 500)]
    pub(crate) retry_backoff_ms: u64,
}

impl ScrapeArgs {
    pub(crate) fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output)
    }
}

/// Crawls all postings and writes them out once the whole crawl succeeded.
pub async fn scrape(args: ScrapeArgs) -> Result<(), Error> {
    let output_path = args.output_path();
    let jobs = {
        let client = HttpClient::new(&ClientConfig {
            accept_invalid_certs: args.accept_invalid_certs,
        })?;
        let transport = Retrying::new(
            client,
            args.retries,
            Duration::from_millis(args.retry_backoff_ms),
        );
        let mut config = CrawlConfig::new(args.base_url, args.keyword);
        config.concurrency = args.concurrency;
        log::info!(
            "scraping {} for keyword: {}",
            config.base_url,
            config.keyword
        );
        Crawler::new(config, transport).crawl().await?
    };
    CsvSink::new(output_path).write(&jobs)?;
    Ok(())
}
