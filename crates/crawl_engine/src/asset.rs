use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crawl_core::AssetStatus;
use crawl_logging::{crawl_debug, crawl_warn};

use crate::codec::{AssetCodec, CodecError};
use crate::persist::{AtomicFileWriter, PersistError};
use crate::retry::{retry_fixed, IsRetryable, RetryError, RetryPolicy, Sleeper};
use crate::{FetchError, Fetcher};

/// Why a single download attempt did not produce a file.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("fetch: {0}")]
    Fetch(#[from] FetchError),
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
    #[error("write: {0}")]
    Write(#[from] PersistError),
    #[error("invalid destination {0}")]
    Destination(PathBuf),
    #[error("transcode task failed: {0}")]
    Task(String),
}

impl IsRetryable for AttemptError {
    fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Fetch(err) => !err.is_not_found(),
            _ => true,
        }
    }
}

/// Downloads one asset, transcodes it and writes it atomically.
pub struct AssetFetcher {
    fetcher: Arc<dyn Fetcher>,
    codec: Arc<dyn AssetCodec>,
    sleeper: Arc<dyn Sleeper>,
    backoff: Duration,
}

impl AssetFetcher {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        codec: Arc<dyn AssetCodec>,
        sleeper: Arc<dyn Sleeper>,
        backoff: Duration,
    ) -> Self {
        Self {
            fetcher,
            codec,
            sleeper,
            backoff,
        }
    }

    pub fn extension(&self) -> &str {
        self.codec.extension()
    }

    /// Terminal status for `url`. The caller checks for an existing `dest` first.
    pub async fn fetch(&self, url: &str, dest: &Path, max_attempts: u32) -> AssetStatus {
        let policy = RetryPolicy::new(max_attempts, self.backoff);
        let outcome = retry_fixed(
            policy,
            self.sleeper.as_ref(),
            |_| self.attempt(url, dest),
            |attempt, err| {
                crawl_debug!(
                    "Download {} attempt {}/{} failed: {}",
                    url,
                    attempt,
                    policy.attempts(),
                    err
                );
            },
        )
        .await;

        match outcome {
            Ok(()) => AssetStatus::Success,
            Err(RetryError::Permanent { .. }) => {
                crawl_warn!("Asset does not exist: {}", url);
                AssetStatus::NotFound
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                crawl_warn!(
                    "Download failed after {} attempts: {} ({})",
                    attempts,
                    url,
                    last
                );
                AssetStatus::Failed
            }
        }
    }

    async fn attempt(&self, url: &str, dest: &Path) -> Result<(), AttemptError> {
        let output = self.fetcher.fetch(url).await?;

        let (dir, filename) = split_destination(dest)?;
        let codec = Arc::clone(&self.codec);
        // Decoding and the fsync both block; keep them off the async workers.
        tokio::task::spawn_blocking(move || -> Result<(), AttemptError> {
            let canonical = codec.transcode(&output.bytes)?;
            AtomicFileWriter::new(dir).write_bytes(&filename, &canonical)?;
            Ok(())
        })
        .await
        .map_err(|err| AttemptError::Task(err.to_string()))?
    }
}

fn split_destination(dest: &Path) -> Result<(PathBuf, String), AttemptError> {
    let filename = dest
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| AttemptError::Destination(dest.to_path_buf()))?;
    let dir = dest
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((dir, filename.to_string()))
}
