use std::fmt;
use std::path::PathBuf;

/// One catalog entry as seen on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleStub {
    pub title: String,
    pub url: String,
}

impl ArticleStub {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetStatus {
    Pending,
    Success,
    AlreadyExists,
    /// The source reported the asset does not exist; never retried.
    NotFound,
    /// Every attempt failed on a transient condition.
    Failed,
}

impl AssetStatus {
    /// True for statuses that leave a usable file on disk.
    pub fn is_on_disk(self) -> bool {
        matches!(self, AssetStatus::Success | AssetStatus::AlreadyExists)
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetStatus::Pending => write!(f, "pending"),
            AssetStatus::Success => write!(f, "success"),
            AssetStatus::AlreadyExists => write!(f, "already exists"),
            AssetStatus::NotFound => write!(f, "not found"),
            AssetStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub source_url: String,
    pub dest_filename: String,
    pub status: AssetStatus,
}

/// Detail page contents that made it through resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDetail {
    pub title: String,
    pub source_url: String,
    pub asset_urls: Vec<String>,
    pub dest_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedArticle {
    Resolved(ArticleDetail),
    /// Resolution gave up; the article is skipped for this run.
    Unresolved { title: String, source_url: String },
}

impl ResolvedArticle {
    pub fn unresolved(stub: &ArticleStub) -> Self {
        ResolvedArticle::Unresolved {
            title: stub.title.clone(),
            source_url: stub.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleResult {
    pub title: String,
    pub source_url: String,
    pub assets: Vec<AssetRecord>,
}

/// Outcome of the per-article completion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// No asset failed and at least one is on disk.
    Complete,
    /// At least one asset exhausted its retries; retry the article next run.
    HasFailures { failed: usize },
    /// Nothing failed but nothing is on disk either (empty or all not-found).
    NothingDownloaded,
}

impl Completion {
    pub fn decide(assets: &[AssetRecord]) -> Self {
        let failed = assets
            .iter()
            .filter(|asset| asset.status == AssetStatus::Failed)
            .count();
        if failed > 0 {
            return Completion::HasFailures { failed };
        }
        if assets.iter().any(|asset| asset.status.is_on_disk()) {
            Completion::Complete
        } else {
            Completion::NothingDownloaded
        }
    }

    pub fn is_complete(self) -> bool {
        self == Completion::Complete
    }
}

/// Name of the asset at `index` inside an article directory.
pub fn asset_filename(index: usize, extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        index.to_string()
    } else {
        format!("{index}.{extension}")
    }
}
