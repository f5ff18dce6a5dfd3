use std::collections::HashSet;
use std::num::NonZeroUsize;

use futures::{stream, StreamExt};
use url::Url;

use crate::djinni::fetch::{DocumentFetcher, Fetch};
use crate::djinni::types::Job;
use crate::djinni::{detail, listing, pagination, Result};

pub const DEFAULT_BASE_URL: &str = "https://djinni.co/jobs/";
pub const DEFAULT_KEYWORD: &str = "Python";
pub const DEFAULT_CONCURRENCY: usize = 10;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Listing endpoint, relative detail links are resolved against it.
    pub base_url: Url,
    pub keyword: String,
    /// Max requests in flight per fan-out.
    pub concurrency: NonZeroUsize,
}

impl CrawlConfig {
    pub fn new(base_url: Url, keyword: String) -> Self {
        Self {
            base_url,
            keyword,
            concurrency: NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Listing page url, pages are 1-based and the first one has no `page` param.
    pub fn listing_url(&self, page: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("primary_keyword", &self.keyword);
        if page > 1 {
            url.query_pairs_mut().append_pair("page", &page.to_string());
        }
        url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    DiscoverPageCount,
    FetchListings,
    FetchDetails,
    Aggregate,
    Done,
}

/// Crawls every listing page for the configured keyword and scrapes each
/// posting's detail page.
pub struct Crawler<F> {
    fetcher: DocumentFetcher<F>,
    config: CrawlConfig,
}

impl<F: Fetch> Crawler<F> {
    pub fn new(config: CrawlConfig, transport: F) -> Self {
        let fetcher = DocumentFetcher::new(config.base_url.clone(), transport);
        Self { fetcher, config }
    }

    /// Any failing page aborts the whole crawl. Siblings already in flight are
    /// allowed to finish, but nothing is returned for them.
    ///
    /// Jobs come back in completion order, not listing order.
    pub async fn crawl(&self) -> Result<Vec<Job>> {
        self.enter(Phase::Start);

        self.enter(Phase::DiscoverPageCount);
        let first_page = self.fetcher.fetch(self.config.listing_url(1)).await?;
        let (page_count, mut links) = {
            let doc = first_page.document();
            (pagination::page_count(&doc)?, listing::detail_links(&doc)?)
        };
        log::info!(
            "found {} listing pages for keyword: {}",
            page_count,
            self.config.keyword
        );

        self.enter(Phase::FetchListings);
        let listings = stream::iter(2..=page_count)
            .map(|page| self.listing_links(page))
            .buffered(self.config.concurrency.get())
            .collect::<Vec<_>>()
            .await;
        for page_links in listings {
            links.extend(page_links?);
        }
        let links = unique(
            links
                .iter()
                .map(|href| self.fetcher.resolve(href))
                .collect::<Result<Vec<_>>>()?,
        );
        log::info!("found {} job links, scraping detail pages", links.len());

        self.enter(Phase::FetchDetails);
        let jobs = stream::iter(links)
            .map(|link| self.job(link))
            .buffer_unordered(self.config.concurrency.get())
            .collect::<Vec<_>>()
            .await;

        self.enter(Phase::Aggregate);
        let jobs = jobs.into_iter().collect::<Result<Vec<_>>>()?;

        self.enter(Phase::Done);
        log::info!("scraped {} jobs", jobs.len());
        Ok(jobs)
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &F {
        self.fetcher.transport()
    }

    fn enter(&self, phase: Phase) {
        log::debug!("crawl phase: {:?}", phase);
    }

    async fn listing_links(&self, page: u32) -> Result<Vec<String>> {
        let listing = self.fetcher.fetch(self.config.listing_url(page)).await?;
        let links = listing::detail_links(&listing.document())?;
        log::debug!("listing page {} has {} job links", page, links.len());
        Ok(links)
    }

    async fn job(&self, link: Url) -> Result<Job> {
        let page = self.fetcher.fetch(link.clone()).await.map_err(|e| {
            log::error!("failed to fetch job page: {}, error: {}", link, e);
            e
        })?;
        let job = detail::extract(&page.document());
        match &job {
            Ok(_) => log::debug!("scraped job page: {}", page.url()),
            Err(e) => log::error!(
                "failed to extract job page: {}, error: {}",
                page.url(),
                e
            ),
        }
        job
    }
}

/// Drops repeated urls, keeping the first occurrence.
fn unique(links: Vec<Url>) -> Vec<Url> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::djinni::{Error, ErrorKind};

    const BASE: &str = "https://djinni.test/jobs/";

    /// In-memory site that records every url it serves.
    #[derive(Default)]
    struct FakeSite {
        pages: HashMap<String, String>,
        hits: Mutex<HashMap<String, usize>>,
        delay: Option<Duration>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeSite {
        fn page(mut self, url: &str, body: String) -> Self {
            self.pages.insert(url.to_owned(), body);
            self
        }

        fn hits(&self, url: &str) -> usize {
            self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Fetch for FakeSite {
        async fn get(&self, url: &Url) -> Result<String> {
            *self
                .hits
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default() += 1;
            let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or(Error::RequestNotOk {
                    url: url.to_string(),
                    status: reqwest::StatusCode::NOT_FOUND,
                })
        }
    }

    fn listing_page(links: &[&str], page_count: Option<u32>) -> String {
        let jobs = links
            .iter()
            .map(|link| {
                format!(
                    r#"<li class="list-jobs__item"><div class="list-jobs__title"><a class="profile" href="{}">Job</a></div></li>"#,
                    link
                )
            })
            .collect::<String>();
        let pagination = page_count
            .map(|count| {
                let items = (1..=count)
                    .map(|page| format!("<li><a>{}</a></li>", page))
                    .collect::<String>();
                format!(
                    r#"<ul class="pagination pagination_with_numbers">{}<li><a>next</a></li></ul>"#,
                    items
                )
            })
            .unwrap_or_default();
        format!(
            r#"<html><body><ul class="list-jobs">{}</ul>{}</body></html>"#,
            jobs, pagination
        )
    }

    fn detail_page(title: &str) -> String {
        format!(
            r#"<html><body>
            <div class="detail--title-wrapper"><h1>{}</h1></div>
            <div class="job-additional-info--body">
                <div class="job-additional-info--item"><div class="job-additional-info--item-text">Office</div></div>
                <div class="job-additional-info--item"><div class="job-additional-info--item-text"><span>Python</span></div></div>
                <div class="job-additional-info--item"><div class="job-additional-info--item-text">2 years</div></div>
            </div>
            <div class="profile-page-section"><p>Posted today 10 views 3 applications</p></div>
            </body></html>"#,
            title
        )
    }

    fn config() -> CrawlConfig {
        CrawlConfig::new(Url::parse(BASE).unwrap(), "Python".to_owned())
    }

    fn page_url(page: u32) -> String {
        config().listing_url(page).to_string()
    }

    fn detail_url(slug: &str) -> String {
        format!("https://djinni.test/jobs/{}/", slug)
    }

    fn two_page_site() -> FakeSite {
        FakeSite::default()
            .page(
                &page_url(1),
                listing_page(&["/jobs/1-a/", "/jobs/2-b/", "/jobs/3-c/"], Some(2)),
            )
            .page(
                &page_url(2),
                listing_page(&["/jobs/4-d/", "/jobs/5-e/"], Some(2)),
            )
            .page(&detail_url("1-a"), detail_page("A"))
            .page(&detail_url("2-b"), detail_page("B"))
            .page(&detail_url("3-c"), detail_page("C"))
            .page(&detail_url("4-d"), detail_page("D"))
            .page(&detail_url("5-e"), detail_page("E"))
    }

    #[test]
    fn test_listing_urls() {
        let config = config();
        assert_eq!(
            config.listing_url(1).as_str(),
            "https://djinni.test/jobs/?primary_keyword=Python"
        );
        assert_eq!(
            config.listing_url(3).as_str(),
            "https://djinni.test/jobs/?primary_keyword=Python&page=3"
        );
    }

    #[test]
    fn test_unique_keeps_first_occurrence() {
        let links = ["b/", "a/", "b/", "c/", "a/"]
            .into_iter()
            .map(|href| Url::parse(BASE).unwrap().join(href).unwrap())
            .collect();
        let slugs = unique(links)
            .iter()
            .map(|url| url.path().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(slugs, vec!["/jobs/b/", "/jobs/a/", "/jobs/c/"]);
    }

    #[tokio::test]
    async fn test_crawl_two_pages() {
        let _ = env_logger::builder().is_test(true).try_init();
        let crawler = Crawler::new(config(), two_page_site());

        let jobs = crawler.crawl().await.expect("Crawl failed");

        let mut titles = jobs.iter().map(|job| job.title()).collect::<Vec<_>>();
        titles.sort();
        assert_eq!(titles, vec!["A", "B", "C", "D", "E"]);
        let site = crawler.transport();
        assert_eq!(site.hits(&page_url(1)), 1);
        assert_eq!(site.hits(&page_url(2)), 1);
        for slug in ["1-a", "2-b", "3-c", "4-d", "5-e"] {
            assert_eq!(site.hits(&detail_url(slug)), 1, "{} fetched more than once", slug);
        }
    }

    #[tokio::test]
    async fn test_single_page_listing() {
        let site = FakeSite::default()
            .page(&page_url(1), listing_page(&["/jobs/1-a/"], None))
            .page(&detail_url("1-a"), detail_page("A"));
        let crawler = Crawler::new(config(), site);

        let jobs = crawler.crawl().await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(crawler.transport().hits(&page_url(2)), 0);
    }

    #[tokio::test]
    async fn test_empty_listing_yields_no_jobs() {
        let site = FakeSite::default().page(&page_url(1), listing_page(&[], None));
        let crawler = Crawler::new(config(), site);

        assert!(crawler.crawl().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_link_fetched_once() {
        let site = FakeSite::default()
            .page(&page_url(1), listing_page(&["/jobs/1-a/", "/jobs/2-b/"], Some(2)))
            .page(&page_url(2), listing_page(&["/jobs/2-b/"], Some(2)))
            .page(&detail_url("1-a"), detail_page("A"))
            .page(&detail_url("2-b"), detail_page("B"));
        let crawler = Crawler::new(config(), site);

        let jobs = crawler.crawl().await.unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(crawler.transport().hits(&detail_url("2-b")), 1);
    }

    #[tokio::test]
    async fn test_same_job_under_different_hrefs_fetched_once() {
        let site = FakeSite::default()
            .page(&page_url(1), listing_page(&["/jobs/1-a/", "/jobs/2-b/"], Some(2)))
            .page(
                &page_url(2),
                listing_page(&["1-a/", "https://djinni.test/jobs/2-b/"], Some(2)),
            )
            .page(&detail_url("1-a"), detail_page("A"))
            .page(&detail_url("2-b"), detail_page("B"));
        let crawler = Crawler::new(config(), site);

        let jobs = crawler.crawl().await.unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(crawler.transport().hits(&detail_url("1-a")), 1);
        assert_eq!(crawler.transport().hits(&detail_url("2-b")), 1);
    }

    #[tokio::test]
    async fn test_failing_detail_aborts_crawl() {
        let mut site = two_page_site();
        site.pages.remove(&detail_url("4-d"));
        let crawler = Crawler::new(config(), site);

        let err = crawler.crawl().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Fetch);
        // siblings still ran to completion
        assert_eq!(crawler.transport().hits(&detail_url("5-e")), 1);
    }

    #[tokio::test]
    async fn test_unparsable_detail_aborts_crawl() {
        let site = two_page_site().page(&detail_url("3-c"), "<html></html>".to_owned());
        let crawler = Crawler::new(config(), site);

        let err = crawler.crawl().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_failing_listing_page_skips_details() {
        let mut site = two_page_site();
        site.pages.remove(&page_url(2));
        let crawler = Crawler::new(config(), site);

        assert!(crawler.crawl().await.is_err());
        assert_eq!(crawler.transport().hits(&detail_url("1-a")), 0);
    }

    #[tokio::test]
    async fn test_fan_out_respects_concurrency() {
        let site = FakeSite {
            delay: Some(Duration::from_millis(5)),
            ..two_page_site()
        };
        let mut config = config();
        config.concurrency = NonZeroUsize::new(2).unwrap();
        let crawler = Crawler::new(config, site);

        let jobs = crawler.crawl().await.unwrap();

        assert_eq!(jobs.len(), 5);
        assert!(crawler.transport().max_in_flight.load(Ordering::SeqCst) <= 2);
    }
}
