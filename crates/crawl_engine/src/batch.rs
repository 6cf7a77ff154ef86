use std::path::Path;
use std::sync::Arc;

use crawl_core::{asset_filename, AssetRecord, AssetStatus};
use crawl_logging::crawl_debug;
use futures_util::stream::{self, StreamExt};
use tokio::sync::Semaphore;

use crate::asset::AssetFetcher;

/// Downloads every asset of one article under a concurrency limit.
pub struct DownloadBatch {
    fetcher: Arc<AssetFetcher>,
    max_attempts: u32,
    /// Shared across all batches when a global download cap is configured.
    global_limit: Option<Arc<Semaphore>>,
}

impl DownloadBatch {
    pub fn new(fetcher: Arc<AssetFetcher>, max_attempts: u32) -> Self {
        Self {
            fetcher,
            max_attempts,
            global_limit: None,
        }
    }

    pub fn with_global_limit(mut self, limit: Arc<Semaphore>) -> Self {
        self.global_limit = Some(limit);
        self
    }

    /// One record per input URL, in input order. Asset `i` is stored as `{i}.{ext}`.
    pub async fn run(
        &self,
        asset_urls: &[String],
        dest_dir: &Path,
        concurrency_limit: usize,
    ) -> Vec<AssetRecord> {
        let extension = self.fetcher.extension().to_string();
        let mut records: Vec<(usize, AssetRecord)> = Vec::with_capacity(asset_urls.len());
        let mut pending = Vec::new();

        for (index, url) in asset_urls.iter().enumerate() {
            let dest_filename = asset_filename(index, &extension);
            let dest = dest_dir.join(&dest_filename);
            if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
                records.push((
                    index,
                    AssetRecord {
                        source_url: url.clone(),
                        dest_filename,
                        status: AssetStatus::AlreadyExists,
                    },
                ));
            } else {
                pending.push((index, url, dest_filename, dest));
            }
        }

        if !pending.is_empty() {
            crawl_debug!(
                "Downloading {} of {} assets into {}",
                pending.len(),
                asset_urls.len(),
                dest_dir.display()
            );
        }

        let downloaded: Vec<(usize, AssetRecord)> = stream::iter(pending)
            .map(|(index, url, dest_filename, dest)| async move {
                let _permit = match self.global_limit.as_ref() {
                    Some(limit) => limit.acquire().await.ok(),
                    None => None,
                };
                let status = self.fetcher.fetch(url, &dest, self.max_attempts).await;
                (
                    index,
                    AssetRecord {
                        source_url: url.clone(),
                        dest_filename,
                        status,
                    },
                )
            })
            .buffer_unordered(concurrency_limit.max(1))
            .collect()
            .await;

        records.extend(downloaded);
        records.sort_by_key(|(index, _)| *index);
        records.into_iter().map(|(_, record)| record).collect()
    }
}
