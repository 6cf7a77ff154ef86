use crate::{ArticleStub, AssetRecord, CheckpointLabel, ResolvedArticle, ResultCollection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Begin the crawl from the checkpoint loaded at startup.
    Start { restored: ResultCollection },
    /// Listing for the current batch finished; `failed_pages` contributed nothing.
    PagesListed {
        stubs: Vec<ArticleStub>,
        failed_pages: Vec<u32>,
    },
    /// Every resolution task of the current batch reported back.
    ArticlesResolved { articles: Vec<ResolvedArticle> },
    /// One article's download batch completed.
    ArticleDownloaded {
        title: String,
        source_url: String,
        assets: Vec<AssetRecord>,
    },
    /// All download batches of the current batch completed.
    DownloadsFinished,
    /// The store wrote a snapshot.
    CheckpointSaved { label: CheckpointLabel },
    /// Operator asked to stop after the batch in flight.
    StopRequested,
}
