#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crawl_core::ArticleStub;
use crawl_engine::{
    ArticleContent, AssetFetcher, CrawlEvent, FetchError, FetchMetadata, FetchOutput,
    FetchSettings, Fetcher, ListingError, PassthroughCodec, ProgressSink, ReqwestFetcher,
    ResolutionError, SiteAdapter, Sleeper,
};

pub fn init_logging() {
    crawl_logging::initialize_for_tests();
}

/// Sleeper that records requested naps and returns immediately.
#[derive(Default)]
pub struct InstantSleeper {
    naps: Mutex<Vec<Duration>>,
}

impl InstantSleeper {
    pub fn naps(&self) -> Vec<Duration> {
        self.naps.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.naps.lock().unwrap().push(duration);
    }
}

/// Tracks how many calls are running at once and the highest count seen.
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
}

impl InFlight {
    pub fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

pub struct InFlightGuard<'a>(&'a InFlight);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fetcher that answers every URL with the same body after `latency`.
pub struct CountingFetcher {
    latency: Duration,
    calls: InFlight,
}

impl CountingFetcher {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            calls: InFlight::default(),
        }
    }

    pub fn peak(&self) -> usize {
        self.calls.peak()
    }

    pub fn total(&self) -> usize {
        self.calls.total()
    }
}

#[async_trait::async_trait]
impl Fetcher for CountingFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let _guard = self.calls.enter();
        tokio::time::sleep(self.latency).await;
        let bytes = b"asset".to_vec();
        Ok(FetchOutput {
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                status: 200,
                content_type: Some("image/webp".to_string()),
                byte_len: bytes.len() as u64,
            },
            bytes,
        })
    }
}

#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<CrawlEvent>>,
}

impl CollectingSink {
    pub fn take(&self) -> Vec<CrawlEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: CrawlEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// In-memory site with call accounting and injectable failures.
#[derive(Default)]
pub struct MockSite {
    pages: HashMap<u32, Vec<ArticleStub>>,
    articles: HashMap<String, ArticleContent>,
    broken_pages: HashSet<u32>,
    slow_articles: HashSet<String>,
    latency: Option<Duration>,
    resolutions: InFlight,
    flaky: Mutex<HashMap<String, u32>>,
    listing_calls: Mutex<Vec<u32>>,
    article_calls: Mutex<Vec<String>>,
}

impl MockSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32, stubs: &[(&str, &str)]) -> Self {
        self.pages.insert(
            page,
            stubs
                .iter()
                .map(|(title, url)| ArticleStub::new(*title, *url))
                .collect(),
        );
        self
    }

    pub fn article(mut self, url: &str, title: &str, assets: Vec<String>) -> Self {
        self.articles.insert(
            url.to_string(),
            ArticleContent {
                title: title.to_string(),
                asset_urls: assets,
            },
        );
        self
    }

    pub fn broken_page(mut self, page: u32) -> Self {
        self.broken_pages.insert(page);
        self
    }

    pub fn slow_article(mut self, url: &str) -> Self {
        self.slow_articles.insert(url.to_string());
        self
    }

    /// Every article fetch takes `latency`.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Most article fetches that were running at the same time.
    pub fn peak_resolutions(&self) -> usize {
        self.resolutions.peak()
    }

    /// The first `failures` fetches of `url` fail.
    pub fn flaky_article(self, url: &str, failures: u32) -> Self {
        self.flaky.lock().unwrap().insert(url.to_string(), failures);
        self
    }

    pub fn listing_calls(&self) -> Vec<u32> {
        self.listing_calls.lock().unwrap().clone()
    }

    pub fn article_calls(&self) -> Vec<String> {
        self.article_calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SiteAdapter for MockSite {
    async fn list_articles(&self, page: u32) -> Result<Vec<ArticleStub>, ListingError> {
        self.listing_calls.lock().unwrap().push(page);
        if self.broken_pages.contains(&page) {
            return Err(ListingError::Parse {
                page,
                message: "broken listing".into(),
            });
        }
        Ok(self.pages.get(&page).cloned().unwrap_or_default())
    }

    async fn fetch_article(&self, url: &str) -> Result<ArticleContent, ResolutionError> {
        self.article_calls.lock().unwrap().push(url.to_string());
        let _guard = self.resolutions.enter();
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.slow_articles.contains(url) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        {
            let mut flaky = self.flaky.lock().unwrap();
            if let Some(remaining) = flaky.get_mut(url) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(ResolutionError::Parse("flaky".into()));
                }
            }
        }
        self.articles
            .get(url)
            .cloned()
            .ok_or_else(|| ResolutionError::Parse(format!("no article at {url}")))
    }
}

pub fn passthrough_fetcher(sleeper: Arc<InstantSleeper>) -> Arc<AssetFetcher> {
    let fetcher = ReqwestFetcher::new(FetchSettings::default()).unwrap();
    Arc::new(AssetFetcher::new(
        Arc::new(fetcher),
        Arc::new(PassthroughCodec::new("jpg")),
        sleeper,
        Duration::from_secs(2),
    ))
}
