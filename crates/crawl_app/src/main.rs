mod cli;
mod logging;
mod settings;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crawl_engine::{
    AssetFetcher, CatalogInfo, CrawlCoordinator, Fetcher, HtmlSiteAdapter, ReqwestFetcher,
    ResultStore, SiteAdapter, TokioSleeper,
};
use crawl_logging::{crawl_error, crawl_info, crawl_warn};
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::settings::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log_level(), cli.log_file.as_deref());

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let pages: Arc<dyn Fetcher> =
        Arc::new(ReqwestFetcher::new(config.fetch_settings()).context("building HTTP client")?);
    let site =
        Arc::new(HtmlSiteAdapter::new(pages, config.site.clone()).context("invalid site profile")?);

    let catalog = discover(site.as_ref()).await;
    let plan = config.plan(catalog.total_articles)?;
    let output_dir = config.output_dir_for(catalog.name.as_deref());
    crawl_info!(
        "Catalog {}: {} articles, pages {}-{}, saving to {}",
        catalog.name.as_deref().unwrap_or("(unnamed)"),
        catalog
            .total_articles
            .map_or_else(|| "unknown".to_string(), |total| total.to_string()),
        plan.start_page(),
        plan.end_page(),
        output_dir.display()
    );

    let store = ResultStore::open(&output_dir, config.checkpoint_prefix.as_str())?;
    let asset_client = ReqwestFetcher::new(config.asset_fetch_settings())
        .context("building asset HTTP client")?;
    let assets = Arc::new(AssetFetcher::new(
        Arc::new(asset_client),
        config.codec(),
        Arc::new(TokioSleeper),
        config.retry_backoff(),
    ));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                crawl_warn!("Interrupted; finishing the current batch (Ctrl-C again to quit now)");
                cancel.cancel();
                if tokio::signal::ctrl_c().await.is_ok() {
                    crawl_error!("Second interrupt; exiting without waiting for the batch");
                    std::process::exit(130);
                }
            }
        }
    });

    let summary = CrawlCoordinator::new(site, assets, store, config.crawl_settings())
        .with_cancellation(cancel)
        .run(plan, catalog.total_articles)
        .await?;

    if let Some(path) = &summary.final_checkpoint {
        crawl_info!(
            "{} articles recorded in {}",
            summary.collection.len(),
            path.display()
        );
    }
    Ok(())
}

/// Catalog metadata is optional; a failed lookup falls back to configured values.
async fn discover(site: &HtmlSiteAdapter) -> CatalogInfo {
    match site.discover().await {
        Ok(info) => info,
        Err(err) => {
            crawl_warn!("Catalog discovery failed: {}", err);
            CatalogInfo::default()
        }
    }
}
