//! Site adapter seam: how listing pages and detail pages are read.
//!
//! The crawl pipeline only depends on [`SiteAdapter`]. [`HtmlSiteAdapter`]
//! is a selector-driven implementation configured by a [`SiteProfile`].

use std::sync::Arc;

use crawl_core::ArticleStub;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use url::Url;

use crate::decode::decode_page;
use crate::retry::IsRetryable;
use crate::{FetchError, Fetcher};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListingError {
    #[error("listing page {page}: {source}")]
    Fetch { page: u32, source: FetchError },
    #[error("listing page {page}: {message}")]
    Parse { page: u32, message: String },
}

impl IsRetryable for ListingError {
    fn is_retryable(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("fetching article: {0}")]
    Fetch(#[from] FetchError),
    #[error("parsing article: {0}")]
    Parse(String),
    #[error("creating article directory: {0}")]
    Io(String),
}

impl IsRetryable for ResolutionError {
    fn is_retryable(&self) -> bool {
        true
    }
}

/// Invalid adapter configuration; reported once at construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SiteError {
    #[error("invalid selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
    #[error("invalid asset pattern: {0}")]
    InvalidPattern(String),
    #[error("invalid url {url:?}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("listing url template must contain {{page}}: {0}")]
    MissingPagePlaceholder(String),
}

/// What a detail page yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleContent {
    pub title: String,
    pub asset_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogInfo {
    pub name: Option<String>,
    pub total_articles: Option<usize>,
}

#[async_trait::async_trait]
pub trait SiteAdapter: Send + Sync {
    async fn list_articles(&self, page: u32) -> Result<Vec<ArticleStub>, ListingError>;

    async fn fetch_article(&self, url: &str) -> Result<ArticleContent, ResolutionError>;

    /// Catalog name and size, when the site exposes them.
    async fn discover(&self) -> Result<CatalogInfo, ListingError> {
        Ok(CatalogInfo::default())
    }
}

/// Selector-level description of a catalog site; loadable from a config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteProfile {
    /// Landing page of the catalog; used for discovery.
    pub catalog_url: String,
    /// Listing URL with a `{page}` placeholder.
    pub listing_url: String,
    pub card_selector: String,
    /// Anchor inside a card; its text is the title and `href` the article URL.
    pub link_selector: String,
    pub title_selector: String,
    pub asset_selector: String,
    pub asset_attribute: String,
    /// Asset URLs (as written in the page) must match this, when set.
    pub asset_pattern: Option<String>,
    pub strip_asset_query: bool,
    /// Element whose text names the catalog and carries its item count.
    pub catalog_link_selector: Option<String>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            catalog_url: String::new(),
            listing_url: String::new(),
            card_selector: "div.card".to_string(),
            link_selector: "a.visited".to_string(),
            title_selector: "h1.title".to_string(),
            asset_selector: "img".to_string(),
            asset_attribute: "src".to_string(),
            asset_pattern: None,
            strip_asset_query: true,
            catalog_link_selector: None,
        }
    }
}

const UNTITLED: &str = "untitled";

struct CompiledProfile {
    card: Selector,
    link: Selector,
    title: Selector,
    asset: Selector,
    catalog_link: Option<Selector>,
    asset_pattern: Option<Regex>,
    count: Regex,
}

pub struct HtmlSiteAdapter {
    fetcher: Arc<dyn Fetcher>,
    profile: SiteProfile,
    compiled: CompiledProfile,
}

impl HtmlSiteAdapter {
    pub fn new(fetcher: Arc<dyn Fetcher>, profile: SiteProfile) -> Result<Self, SiteError> {
        if !profile.listing_url.contains("{page}") {
            return Err(SiteError::MissingPagePlaceholder(profile.listing_url.clone()));
        }
        parse_url(&profile.listing_url.replace("{page}", "1"))?;

        let compiled = CompiledProfile {
            card: compile(&profile.card_selector)?,
            link: compile(&profile.link_selector)?,
            title: compile(&profile.title_selector)?,
            asset: compile(&profile.asset_selector)?,
            catalog_link: profile
                .catalog_link_selector
                .as_deref()
                .map(compile)
                .transpose()?,
            asset_pattern: profile
                .asset_pattern
                .as_deref()
                .map(Regex::new)
                .transpose()
                .map_err(|err| SiteError::InvalidPattern(err.to_string()))?,
            count: Regex::new(r"\d+").map_err(|err| SiteError::InvalidPattern(err.to_string()))?,
        };

        Ok(Self {
            fetcher,
            profile,
            compiled,
        })
    }

    pub fn listing_url(&self, page: u32) -> String {
        self.profile.listing_url.replace("{page}", &page.to_string())
    }

    fn parse_listing(&self, page_url: &Url, html: &str) -> Vec<ArticleStub> {
        let doc = Html::parse_document(html);
        doc.select(&self.compiled.card)
            .filter_map(|card| card.select(&self.compiled.link).next())
            .filter_map(|link| {
                let href = link.value().attr("href")?;
                let url = page_url.join(href).ok()?;
                Some(ArticleStub::new(element_text(link), url.to_string()))
            })
            .collect()
    }

    fn parse_article(&self, article_url: &Url, html: &str) -> ArticleContent {
        let doc = Html::parse_document(html);
        let title = doc
            .select(&self.compiled.title)
            .next()
            .map(element_text)
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        let asset_urls = doc
            .select(&self.compiled.asset)
            .filter_map(|element| element.value().attr(&self.profile.asset_attribute))
            .filter(|raw| {
                self.compiled
                    .asset_pattern
                    .as_ref()
                    .map_or(true, |pattern| pattern.is_match(raw))
            })
            .filter_map(|raw| {
                let raw = if self.profile.strip_asset_query {
                    raw.split('?').next().unwrap_or(raw)
                } else {
                    raw
                };
                article_url.join(raw).ok().map(|url| url.to_string())
            })
            .collect();

        ArticleContent { title, asset_urls }
    }

    fn parse_catalog(&self, html: &str) -> CatalogInfo {
        let Some(selector) = self.compiled.catalog_link.as_ref() else {
            return CatalogInfo::default();
        };
        let doc = Html::parse_document(html);
        let Some(text) = doc.select(selector).next().map(element_text) else {
            return CatalogInfo::default();
        };
        let total_articles = self
            .compiled
            .count
            .find(&text)
            .and_then(|m| m.as_str().parse().ok());
        CatalogInfo {
            name: Some(text).filter(|name| !name.is_empty()),
            total_articles,
        }
    }
}

#[async_trait::async_trait]
impl SiteAdapter for HtmlSiteAdapter {
    async fn list_articles(&self, page: u32) -> Result<Vec<ArticleStub>, ListingError> {
        let url = self.listing_url(page);
        let output = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|source| ListingError::Fetch { page, source })?;
        let page_url = parse_url(&output.metadata.final_url).map_err(|err| ListingError::Parse {
            page,
            message: err.to_string(),
        })?;
        let html = decode_page(&output.bytes, output.metadata.content_type.as_deref());
        Ok(self.parse_listing(&page_url, &html))
    }

    async fn fetch_article(&self, url: &str) -> Result<ArticleContent, ResolutionError> {
        let output = self.fetcher.fetch(url).await?;
        let article_url = parse_url(&output.metadata.final_url)
            .map_err(|err| ResolutionError::Parse(err.to_string()))?;
        let html = decode_page(&output.bytes, output.metadata.content_type.as_deref());
        Ok(self.parse_article(&article_url, &html))
    }

    async fn discover(&self) -> Result<CatalogInfo, ListingError> {
        if self.compiled.catalog_link.is_none() || self.profile.catalog_url.is_empty() {
            return Ok(CatalogInfo::default());
        }
        let output = self
            .fetcher
            .fetch(&self.profile.catalog_url)
            .await
            .map_err(|source| ListingError::Fetch { page: 0, source })?;
        let html = decode_page(&output.bytes, output.metadata.content_type.as_deref());
        Ok(self.parse_catalog(&html))
    }
}

fn compile(selector: &str) -> Result<Selector, SiteError> {
    Selector::parse(selector).map_err(|err| SiteError::InvalidSelector {
        selector: selector.to_string(),
        message: err.to_string(),
    })
}

fn parse_url(url: &str) -> Result<Url, SiteError> {
    Url::parse(url).map_err(|err| SiteError::InvalidUrl {
        url: url.to_string(),
        message: err.to_string(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
