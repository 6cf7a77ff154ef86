//! Checkpoint persistence for completed articles.
//!
//! Snapshots are JSON arrays written through [`AtomicFileWriter`], named
//! `{prefix}_partial_{n}.json` per batch and `{prefix}_final.json` at the end
//! of a run. Loading merges every snapshot present so that progress from a
//! run that crashed before its final checkpoint is not lost.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crawl_core::{ArticleResult, AssetRecord, AssetStatus, CheckpointLabel, ResultCollection};
use crawl_logging::{crawl_debug, crawl_info};
use serde::{Deserialize, Serialize};

use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("checkpoint location unusable: {0}")]
    Location(PersistError),
    #[error("reading checkpoint {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("checkpoint {path} is not valid: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("encoding checkpoint: {0}")]
    Encode(serde_json::Error),
    #[error("writing checkpoint: {0}")]
    Write(PersistError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct PersistedImage {
    url: String,
    filename: String,
    status: PersistedStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum PersistedStatus {
    Pending,
    Success,
    AlreadyExists,
    NotFound,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct PersistedArticle {
    article_title: String,
    article_url: String,
    images: Vec<PersistedImage>,
}

pub struct ResultStore {
    writer: AtomicFileWriter,
    prefix: String,
}

impl ResultStore {
    /// Creates the checkpoint directory if needed. Failure here aborts the crawl.
    pub fn open(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self, StoreError> {
        let dir = dir.into();
        ensure_output_dir(&dir).map_err(StoreError::Location)?;
        Ok(Self {
            writer: AtomicFileWriter::new(dir),
            prefix: prefix.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }

    pub fn filename(&self, label: CheckpointLabel) -> String {
        format!("{}_{}.json", self.prefix, label)
    }

    pub fn path(&self, label: CheckpointLabel) -> PathBuf {
        self.dir().join(self.filename(label))
    }

    /// Union of all checkpoints: final first, then partials newest batch first.
    pub fn load(&self) -> Result<ResultCollection, StoreError> {
        let mut sources = vec![self.path(CheckpointLabel::Final)];
        sources.extend(
            self.partial_numbers()?
                .into_iter()
                .map(|number| self.path(CheckpointLabel::Partial(number))),
        );

        let mut collection = ResultCollection::new();
        for path in sources {
            let Some(articles) = read_checkpoint(&path)? else {
                continue;
            };
            let before = collection.len();
            for article in articles {
                collection.insert(from_persisted(article));
            }
            crawl_debug!(
                "Checkpoint {} contributed {} articles",
                path.display(),
                collection.len() - before
            );
        }

        if !collection.is_empty() {
            crawl_info!(
                "Loaded {} completed articles from {}",
                collection.len(),
                self.dir().display()
            );
        }
        Ok(collection)
    }

    /// Writes a full snapshot of `collection` under `label`.
    pub fn save(
        &self,
        collection: &ResultCollection,
        label: CheckpointLabel,
    ) -> Result<PathBuf, StoreError> {
        let persisted: Vec<PersistedArticle> =
            collection.results().iter().map(to_persisted).collect();
        let content = serde_json::to_string_pretty(&persisted).map_err(StoreError::Encode)?;
        self.writer
            .write(&self.filename(label), &content)
            .map_err(StoreError::Write)
    }

    /// Batch numbers of partial checkpoints on disk, highest first.
    fn partial_numbers(&self) -> Result<Vec<usize>, StoreError> {
        let head = format!("{}_partial_", self.prefix);
        let entries = fs::read_dir(self.dir()).map_err(|source| StoreError::Read {
            path: self.dir().to_path_buf(),
            source,
        })?;

        let mut numbers: Vec<usize> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                name.strip_prefix(&head)?
                    .strip_suffix(".json")?
                    .parse()
                    .ok()
            })
            .collect();
        numbers.sort_unstable_by(|a, b| b.cmp(a));
        Ok(numbers)
    }
}

fn read_checkpoint(path: &Path) -> Result<Option<Vec<PersistedArticle>>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

fn to_persisted(result: &ArticleResult) -> PersistedArticle {
    PersistedArticle {
        article_title: result.title.clone(),
        article_url: result.source_url.clone(),
        images: result
            .assets
            .iter()
            .map(|asset| PersistedImage {
                url: asset.source_url.clone(),
                filename: asset.dest_filename.clone(),
                status: asset.status.into(),
            })
            .collect(),
    }
}

fn from_persisted(article: PersistedArticle) -> ArticleResult {
    ArticleResult {
        title: article.article_title,
        source_url: article.article_url,
        assets: article
            .images
            .into_iter()
            .map(|image| AssetRecord {
                source_url: image.url,
                dest_filename: image.filename,
                status: image.status.into(),
            })
            .collect(),
    }
}

impl From<AssetStatus> for PersistedStatus {
    fn from(status: AssetStatus) -> Self {
        match status {
            AssetStatus::Pending => PersistedStatus::Pending,
            AssetStatus::Success => PersistedStatus::Success,
            AssetStatus::AlreadyExists => PersistedStatus::AlreadyExists,
            AssetStatus::NotFound => PersistedStatus::NotFound,
            AssetStatus::Failed => PersistedStatus::Failed,
        }
    }
}

impl From<PersistedStatus> for AssetStatus {
    fn from(status: PersistedStatus) -> Self {
        match status {
            PersistedStatus::Pending => AssetStatus::Pending,
            PersistedStatus::Success => AssetStatus::Success,
            PersistedStatus::AlreadyExists => AssetStatus::AlreadyExists,
            PersistedStatus::NotFound => AssetStatus::NotFound,
            PersistedStatus::Failed => AssetStatus::Failed,
        }
    }
}
