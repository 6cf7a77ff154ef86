use crate::{ArticleDetail, ArticleStub, AssetRecord, CheckpointLabel, PageBatch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ListPages { batch: PageBatch },
    ResolveArticles { stubs: Vec<ArticleStub> },
    DownloadArticles { articles: Vec<ArticleDetail> },
    SaveCheckpoint { label: CheckpointLabel },
    ReportArticle(ArticleReport),
    Finish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleReport {
    pub title: String,
    pub source_url: String,
    pub outcome: ArticleOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    /// Added to the collection.
    Completed { assets: Vec<AssetRecord> },
    /// Some assets failed; the article stays out of the collection.
    Incomplete { failed: usize, total: usize },
    /// Nothing landed on disk (no assets, or every asset not found).
    NothingDownloaded { total: usize },
    /// Detail page could not be resolved this run.
    Unresolved,
}
