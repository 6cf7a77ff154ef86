use std::sync::atomic::{AtomicUsize, Ordering};

use crawl_core::ArticleOutcome;
use crawl_logging::{crawl_info, crawl_warn};

use crate::CrawlEvent;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: CrawlEvent);
}

/// Forwards events to a channel, e.g. for a UI thread.
pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<CrawlEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<CrawlEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: CrawlEvent) {
        let _ = self.tx.send(event);
    }
}

/// Reports article outcomes, checkpoints and `completed/total` through the logger.
#[derive(Debug, Default)]
pub struct LogProgressSink {
    last_completed: AtomicUsize,
}

impl LogProgressSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: CrawlEvent) {
        match event {
            CrawlEvent::Progress(view) => {
                let previous = self
                    .last_completed
                    .swap(view.completed_total, Ordering::Relaxed);
                if previous != view.completed_total {
                    crawl_info!(
                        "Progress {} (batch {}/{})",
                        view.progress_label(),
                        view.batch.unwrap_or(0),
                        view.batch_count
                    );
                }
            }
            CrawlEvent::Article(report) => match report.outcome {
                ArticleOutcome::Completed { assets } => {
                    crawl_info!("Completed: {} ({} assets)", report.title, assets.len())
                }
                ArticleOutcome::Incomplete { failed, total } => crawl_warn!(
                    "Article {} has {}/{} failed downloads; not marked complete",
                    report.title,
                    failed,
                    total
                ),
                ArticleOutcome::NothingDownloaded { total } => crawl_warn!(
                    "Article {} produced no files ({} assets listed): {}",
                    report.title,
                    total,
                    report.source_url
                ),
                ArticleOutcome::Unresolved => {
                    crawl_warn!("Article could not be resolved: {}", report.source_url)
                }
            },
            CrawlEvent::CheckpointSaved {
                label,
                path,
                articles,
            } => crawl_info!(
                "Checkpoint {} saved to {} ({} articles)",
                label,
                path.display(),
                articles
            ),
        }
    }
}
