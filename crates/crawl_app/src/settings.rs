//! Run configuration: RON file, defaults and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crawl_core::{pages_for, CrawlPlan};
use crawl_engine::{
    catalog_dir_name, AssetCodec, CrawlSettings, FetchSettings, JpegCodec, PassthroughCodec,
    SiteProfile,
};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum CodecConfig {
    Jpeg { quality: u8 },
    Passthrough { extension: String },
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig::Jpeg { quality: 90 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Content types accepted for listing and article pages; empty accepts any.
    pub allowed_content_types: Vec<String>,
    /// Content types accepted for asset downloads; empty accepts any.
    pub asset_content_types: Vec<String>,
    /// Empty keeps the built-in browser list.
    pub user_agents: Vec<String>,
    pub referer: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            request_timeout_secs: fetch.request_timeout.as_secs(),
            redirect_limit: fetch.redirect_limit,
            max_bytes: fetch.max_bytes,
            allowed_content_types: Vec::new(),
            asset_content_types: Vec::new(),
            user_agents: Vec::new(),
            referer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub site: SiteProfile,
    pub output_dir: PathBuf,
    /// Put downloads and checkpoints in a subdirectory named after the catalog.
    pub catalog_subdir: bool,
    pub checkpoint_prefix: String,
    pub start_page: u32,
    /// Derived from the catalog size when unset.
    pub end_page: Option<u32>,
    pub per_page: usize,
    /// Assumed catalog size when neither `end_page` nor discovery gives one.
    pub fallback_total: usize,
    pub save_interval: u32,
    pub max_workers: usize,
    pub max_concurrent_downloads: usize,
    pub max_concurrent_articles: usize,
    pub max_total_downloads: Option<usize>,
    pub max_retries: u32,
    pub asset_max_retries: u32,
    pub retry_backoff_ms: u64,
    pub resolve_timeout_secs: u64,
    pub http: HttpConfig,
    pub codec: CodecConfig,
}

impl Default for Config {
    fn default() -> Self {
        let crawl = CrawlSettings::default();
        Self {
            site: SiteProfile::default(),
            output_dir: PathBuf::from("downloads"),
            catalog_subdir: true,
            checkpoint_prefix: "catalog".to_string(),
            start_page: 1,
            end_page: None,
            per_page: 100,
            fallback_total: 100,
            save_interval: 1,
            max_workers: crawl.max_workers,
            max_concurrent_downloads: crawl.max_concurrent_downloads,
            max_concurrent_articles: crawl.max_concurrent_articles,
            max_total_downloads: crawl.max_total_downloads,
            max_retries: crawl.max_retries,
            asset_max_retries: crawl.asset_max_retries,
            retry_backoff_ms: crawl.retry_backoff.as_millis() as u64,
            resolve_timeout_secs: crawl.resolve_timeout.as_secs(),
            http: HttpConfig::default(),
            codec: CodecConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Rejects settings that would fail later, before any request is made.
    pub fn validate(&self) -> Result<()> {
        if self.site.listing_url.is_empty() {
            bail!("no listing URL configured; set site.listing_url or pass --listing-url");
        }
        if !self.site.listing_url.contains("{page}") {
            bail!(
                "listing URL {:?} must contain a {{page}} placeholder",
                self.site.listing_url
            );
        }
        if self.start_page == 0 {
            bail!("start_page must be at least 1");
        }
        if let Some(end) = self.end_page {
            if end < self.start_page {
                bail!("end_page {} is before start_page {}", end, self.start_page);
            }
        }
        if self.save_interval == 0 {
            bail!("save_interval must be at least 1");
        }
        if self.per_page == 0 {
            bail!("per_page must be at least 1");
        }
        if self.max_workers == 0 || self.max_concurrent_downloads == 0 {
            bail!("max_workers and max_concurrent_downloads must be at least 1");
        }
        if self.max_concurrent_articles == 0 || self.max_total_downloads == Some(0) {
            bail!("max_concurrent_articles and max_total_downloads must be at least 1");
        }
        if self.max_retries == 0 || self.asset_max_retries == 0 {
            bail!("retry counts must be at least 1");
        }
        if self.checkpoint_prefix.trim().is_empty() {
            bail!("checkpoint_prefix must not be empty");
        }
        match &self.codec {
            CodecConfig::Jpeg { quality } if !(1..=100).contains(quality) => {
                bail!("JPEG quality {} is outside 1-100", quality)
            }
            CodecConfig::Passthrough { extension } if extension.trim().is_empty() => {
                bail!("passthrough codec needs a file extension")
            }
            _ => Ok(()),
        }
    }

    pub fn crawl_settings(&self) -> CrawlSettings {
        CrawlSettings {
            max_workers: self.max_workers,
            max_concurrent_downloads: self.max_concurrent_downloads,
            max_concurrent_articles: self.max_concurrent_articles,
            max_total_downloads: self.max_total_downloads,
            max_retries: self.max_retries,
            asset_max_retries: self.asset_max_retries,
            retry_backoff: self.retry_backoff(),
            resolve_timeout: Duration::from_secs(self.resolve_timeout_secs),
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Client settings for listing and article pages.
    pub fn fetch_settings(&self) -> FetchSettings {
        self.fetch_settings_allowing(&self.http.allowed_content_types)
    }

    /// Client settings for asset downloads, which have their own allow-list.
    pub fn asset_fetch_settings(&self) -> FetchSettings {
        self.fetch_settings_allowing(&self.http.asset_content_types)
    }

    fn fetch_settings_allowing(&self, content_types: &[String]) -> FetchSettings {
        let defaults = FetchSettings::default();
        FetchSettings {
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.http.request_timeout_secs),
            redirect_limit: self.http.redirect_limit,
            max_bytes: self.http.max_bytes,
            allowed_content_types: content_types.to_vec(),
            user_agents: if self.http.user_agents.is_empty() {
                defaults.user_agents
            } else {
                self.http.user_agents.clone()
            },
            referer: self.http.referer.clone(),
        }
    }

    pub fn codec(&self) -> Arc<dyn AssetCodec> {
        match &self.codec {
            CodecConfig::Jpeg { quality } => Arc::new(JpegCodec::new(*quality)),
            CodecConfig::Passthrough { extension } => {
                Arc::new(PassthroughCodec::new(extension.trim_start_matches('.')))
            }
        }
    }

    /// Explicit end page, else enough pages to cover the catalog.
    pub fn end_page(&self, catalog_total: Option<usize>) -> u32 {
        match self.end_page {
            Some(end) => end,
            None => {
                let total = catalog_total.unwrap_or(self.fallback_total);
                pages_for(total, self.per_page).max(self.start_page)
            }
        }
    }

    pub fn plan(&self, catalog_total: Option<usize>) -> Result<CrawlPlan> {
        let end = self.end_page(catalog_total);
        CrawlPlan::new(self.start_page, end, self.save_interval)
            .with_context(|| format!("planning pages {}-{}", self.start_page, end))
    }

    pub fn output_dir_for(&self, catalog_name: Option<&str>) -> PathBuf {
        match catalog_name {
            Some(name) if self.catalog_subdir => self.output_dir.join(catalog_dir_name(name)),
            _ => self.output_dir.clone(),
        }
    }
}
