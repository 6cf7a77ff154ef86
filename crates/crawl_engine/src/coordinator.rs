use std::collections::VecDeque;
use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use crawl_core::{
    update, ArticleDetail, ArticleStub, CheckpointLabel, CrawlPlan, CrawlState, Effect, Msg,
    PageBatch, ProgressView, ResolvedArticle, ResultCollection,
};
use crawl_logging::{crawl_debug, crawl_info, crawl_warn, with_batch_tag, BatchTag};
use futures_util::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::asset::AssetFetcher;
use crate::batch::DownloadBatch;
use crate::progress::{LogProgressSink, ProgressSink};
use crate::resolve::ArticleResolver;
use crate::retry::{retry_fixed, RetryPolicy, Sleeper, TokioSleeper};
use crate::site::SiteAdapter;
use crate::store::{ResultStore, StoreError};
use crate::CrawlEvent;

#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Concurrent article resolutions.
    pub max_workers: usize,
    /// Concurrent asset downloads inside one article.
    pub max_concurrent_downloads: usize,
    /// Articles downloading at the same time.
    pub max_concurrent_articles: usize,
    /// Cap on asset downloads across all articles, if any.
    pub max_total_downloads: Option<usize>,
    /// Attempts for listing and resolution.
    pub max_retries: u32,
    /// Attempts per asset download.
    pub asset_max_retries: u32,
    pub retry_backoff: Duration,
    /// Coordinator-side bound on one resolution task, retries included.
    pub resolve_timeout: Duration,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_workers: 20,
            max_concurrent_downloads: 50,
            max_concurrent_articles: 1,
            max_total_downloads: None,
            max_retries: 3,
            asset_max_retries: 10,
            retry_backoff: Duration::from_secs(2),
            resolve_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub progress: ProgressView,
    pub collection: ResultCollection,
    pub final_checkpoint: Option<PathBuf>,
}

/// Drives the crawl state machine, executing its effects.
///
/// The state is owned here and only mutated through `update`; worker tasks
/// return values and never touch it.
pub struct CrawlCoordinator {
    site: Arc<dyn SiteAdapter>,
    assets: Arc<AssetFetcher>,
    store: ResultStore,
    settings: CrawlSettings,
    sleeper: Arc<dyn Sleeper>,
    sink: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
    batch_tag: Arc<BatchTag>,
}

impl CrawlCoordinator {
    pub fn new(
        site: Arc<dyn SiteAdapter>,
        assets: Arc<AssetFetcher>,
        store: ResultStore,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            site,
            assets,
            store,
            settings,
            sleeper: Arc::new(TokioSleeper),
            sink: Arc::new(LogProgressSink::new()),
            cancel: CancellationToken::new(),
            batch_tag: Arc::new(BatchTag::default()),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Cancelling the token finishes the batch in flight, then finalizes.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(
        &self,
        plan: CrawlPlan,
        catalog_total: Option<usize>,
    ) -> Result<CrawlSummary, CrawlError> {
        self.batch_tag.set(0);
        with_batch_tag(
            Arc::clone(&self.batch_tag),
            self.run_batches(plan, catalog_total),
        )
        .await
    }

    async fn run_batches(
        &self,
        plan: CrawlPlan,
        catalog_total: Option<usize>,
    ) -> Result<CrawlSummary, CrawlError> {
        let restored = self.store.load()?;
        crawl_info!(
            "Starting crawl of pages {}-{} in {} batches; {} articles already done",
            plan.start_page(),
            plan.end_page(),
            plan.batch_count(),
            restored.len()
        );

        let resolver = Arc::new(ArticleResolver::new(
            Arc::clone(&self.site),
            Arc::clone(&self.sleeper),
            self.settings.retry_backoff,
            self.store.dir().to_path_buf(),
        ));
        let downloads = self.download_batch();

        let mut queue = VecDeque::new();
        let mut final_checkpoint = None;
        let mut state = self.apply(
            CrawlState::new(plan, catalog_total),
            &mut queue,
            Msg::Start { restored },
        );

        while let Some(effect) = queue.pop_front() {
            let msg = match effect {
                Effect::ListPages { batch } => {
                    self.batch_tag.set(batch.number as u64);
                    let (stubs, failed_pages) = self.list_pages(batch).await;
                    Msg::PagesListed {
                        stubs,
                        failed_pages,
                    }
                }
                Effect::ResolveArticles { stubs } => {
                    crawl_info!("Resolving {} new articles", stubs.len());
                    let articles = self.resolve_all(&resolver, stubs).await;
                    Msg::ArticlesResolved { articles }
                }
                Effect::DownloadArticles { articles } => {
                    crawl_info!("Downloading assets of {} articles", articles.len());
                    state = self
                        .download_all(&downloads, articles, state, &mut queue)
                        .await;
                    Msg::DownloadsFinished
                }
                Effect::SaveCheckpoint { label } => {
                    let path = self.store.save(state.collection(), label)?;
                    self.sink.emit(CrawlEvent::CheckpointSaved {
                        label,
                        path: path.clone(),
                        articles: state.collection().len(),
                    });
                    if label == CheckpointLabel::Final {
                        final_checkpoint = Some(path);
                    }
                    Msg::CheckpointSaved { label }
                }
                Effect::ReportArticle(report) => {
                    self.sink.emit(CrawlEvent::Article(report));
                    continue;
                }
                Effect::Finish => break,
            };
            // Observed before the result is applied, so a finished checkpoint
            // leads to finalizing instead of the next batch.
            if self.cancel.is_cancelled() && !state.view().stop_requested {
                crawl_info!("Stop requested; finishing the current batch");
                state = self.apply(state, &mut queue, Msg::StopRequested);
            }
            state = self.apply(state, &mut queue, msg);
        }

        self.batch_tag.set(0);
        let progress = state.view();
        crawl_info!(
            "Crawl finished: {} completed this run, {} incomplete, {} unresolved; {} total",
            progress.run.completed,
            progress.run.incomplete,
            progress.run.unresolved,
            progress.progress_label()
        );
        Ok(CrawlSummary {
            progress,
            collection: state.into_collection(),
            final_checkpoint,
        })
    }

    /// Feeds `msg` to the state machine. Reports go straight to the sink;
    /// every other effect is queued for the run loop.
    fn apply(&self, state: CrawlState, queue: &mut VecDeque<Effect>, msg: Msg) -> CrawlState {
        let (mut state, effects) = update(state, msg);
        for effect in effects {
            match effect {
                Effect::ReportArticle(report) => self.sink.emit(CrawlEvent::Article(report)),
                other => queue.push_back(other),
            }
        }
        if state.consume_dirty() {
            self.sink.emit(CrawlEvent::Progress(state.view()));
        }
        state
    }

    fn download_batch(&self) -> DownloadBatch {
        let batch = DownloadBatch::new(Arc::clone(&self.assets), self.settings.asset_max_retries);
        match self.settings.max_total_downloads {
            Some(limit) => batch.with_global_limit(Arc::new(Semaphore::new(limit.max(1)))),
            None => batch,
        }
    }

    async fn list_pages(&self, batch: PageBatch) -> (Vec<ArticleStub>, Vec<u32>) {
        let policy = RetryPolicy::new(self.settings.max_retries, self.settings.retry_backoff);
        let mut stubs = Vec::new();
        let mut failed_pages = Vec::new();

        for page in batch.pages() {
            crawl_info!("Listing page {}", page);
            let listed = retry_fixed(
                policy,
                self.sleeper.as_ref(),
                |_| self.site.list_articles(page),
                |attempt, err| crawl_debug!("Listing attempt {} failed: {}", attempt, err),
            )
            .await;
            match listed {
                Ok(page_stubs) => stubs.extend(page_stubs),
                Err(err) => {
                    crawl_warn!("Skipping page {} this run: {}", page, err.into_inner());
                    failed_pages.push(page);
                }
            }
        }

        crawl_info!(
            "Pages {}-{} list {} articles",
            batch.first_page,
            batch.last_page,
            stubs.len()
        );
        (stubs, failed_pages)
    }

    async fn resolve_all(
        &self,
        resolver: &Arc<ArticleResolver>,
        stubs: Vec<ArticleStub>,
    ) -> Vec<ResolvedArticle> {
        let attempts = self.settings.max_retries;
        let timeout = self.settings.resolve_timeout;

        stream::iter(stubs)
            .map(|stub| {
                let resolver = Arc::clone(resolver);
                let tag = Arc::clone(&self.batch_tag);
                async move {
                    let task_stub = stub.clone();
                    // Spawned tasks leave the coordinator's logging scope.
                    let mut handle = tokio::spawn(with_batch_tag(tag, async move {
                        resolver.resolve(&task_stub, attempts).await
                    }));
                    match tokio::time::timeout(timeout, &mut handle).await {
                        Ok(Ok(resolved)) => {
                            if let ResolvedArticle::Resolved(detail) = &resolved {
                                crawl_debug!(
                                    "Resolved {} - {} ({} assets)",
                                    detail.source_url,
                                    detail.title,
                                    detail.asset_urls.len()
                                );
                            }
                            resolved
                        }
                        Ok(Err(err)) => {
                            crawl_warn!("Resolution task for {} failed: {}", stub.url, err);
                            ResolvedArticle::unresolved(&stub)
                        }
                        Err(_) => {
                            handle.abort();
                            crawl_warn!(
                                "Resolution of {} timed out after {:?}",
                                stub.url,
                                timeout
                            );
                            ResolvedArticle::unresolved(&stub)
                        }
                    }
                }
            })
            .buffer_unordered(self.settings.max_workers.max(1))
            .collect()
            .await
    }

    async fn download_all(
        &self,
        downloads: &DownloadBatch,
        articles: Vec<ArticleDetail>,
        mut state: CrawlState,
        queue: &mut VecDeque<Effect>,
    ) -> CrawlState {
        let limit = self.settings.max_concurrent_downloads;
        let mut finished = pin!(stream::iter(articles)
            .map(|article| async move {
                let assets = downloads
                    .run(&article.asset_urls, &article.dest_dir, limit)
                    .await;
                (article, assets)
            })
            .buffer_unordered(self.settings.max_concurrent_articles.max(1)));

        while let Some((article, assets)) = finished.next().await {
            state = self.apply(
                state,
                queue,
                Msg::ArticleDownloaded {
                    title: article.title,
                    source_url: article.source_url,
                    assets,
                },
            );
        }
        state
    }
}
