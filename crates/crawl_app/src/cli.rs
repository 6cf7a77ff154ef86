use std::path::PathBuf;

use clap::{ArgAction, Parser};
use log::LevelFilter;

use crate::settings::Config;

#[derive(Debug, Parser)]
#[command(
    name = "catalog-crawl",
    version,
    about = "Crawl a paginated catalog and download every article's images, resumably"
)]
pub struct Cli {
    /// RON config file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listing URL template containing {page}
    #[arg(long)]
    pub listing_url: Option<String>,

    /// Catalog landing page, used to discover its name and size
    #[arg(long)]
    pub catalog_url: Option<String>,

    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub start_page: Option<u32>,

    #[arg(long)]
    pub end_page: Option<u32>,

    /// Pages per batch; a checkpoint is written after each batch
    #[arg(long)]
    pub save_interval: Option<u32>,

    #[arg(long)]
    pub per_page: Option<usize>,

    /// Concurrent article resolutions
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Concurrent downloads inside one article
    #[arg(long)]
    pub max_concurrent_downloads: Option<usize>,

    #[arg(long)]
    pub max_concurrent_articles: Option<usize>,

    #[arg(long)]
    pub max_retries: Option<u32>,

    #[arg(long)]
    pub asset_max_retries: Option<u32>,

    /// Also append log records to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Applies flags given on the command line on top of `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.listing_url {
            config.site.listing_url = url.clone();
        }
        if let Some(url) = &self.catalog_url {
            config.site.catalog_url = url.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(page) = self.start_page {
            config.start_page = page;
        }
        if self.end_page.is_some() {
            config.end_page = self.end_page;
        }
        override_with(&mut config.save_interval, self.save_interval);
        override_with(&mut config.per_page, self.per_page);
        override_with(&mut config.max_workers, self.max_workers);
        override_with(
            &mut config.max_concurrent_downloads,
            self.max_concurrent_downloads,
        );
        override_with(
            &mut config.max_concurrent_articles,
            self.max_concurrent_articles,
        );
        override_with(&mut config.max_retries, self.max_retries);
        override_with(&mut config.asset_max_retries, self.asset_max_retries);
    }
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}
