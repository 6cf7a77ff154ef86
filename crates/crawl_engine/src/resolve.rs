use std::path::PathBuf;
use std::sync::Arc;

use crawl_core::{ArticleDetail, ArticleStub, ResolvedArticle};
use crawl_logging::{crawl_debug, crawl_warn};

use crate::filename::article_dir_name;
use crate::retry::{retry_fixed, RetryError, RetryPolicy, Sleeper};
use crate::site::{ResolutionError, SiteAdapter};

/// Turns a listing stub into a detail record, retrying the site adapter.
///
/// Never fails: exhausted retries come back as [`ResolvedArticle::Unresolved`].
pub struct ArticleResolver {
    site: Arc<dyn SiteAdapter>,
    sleeper: Arc<dyn Sleeper>,
    backoff: std::time::Duration,
    output_dir: PathBuf,
}

impl ArticleResolver {
    pub fn new(
        site: Arc<dyn SiteAdapter>,
        sleeper: Arc<dyn Sleeper>,
        backoff: std::time::Duration,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            site,
            sleeper,
            backoff,
            output_dir,
        }
    }

    pub async fn resolve(&self, stub: &ArticleStub, max_attempts: u32) -> ResolvedArticle {
        let policy = RetryPolicy::new(max_attempts, self.backoff);
        let outcome = retry_fixed(
            policy,
            self.sleeper.as_ref(),
            |_| self.resolve_once(stub),
            |attempt, err| {
                crawl_debug!(
                    "Resolve {} attempt {}/{} failed: {}",
                    stub.url,
                    attempt,
                    policy.attempts(),
                    err
                );
            },
        )
        .await;

        match outcome {
            Ok(detail) => ResolvedArticle::Resolved(detail),
            Err(RetryError::Exhausted { attempts, last }) => {
                crawl_warn!(
                    "Giving up on {} after {} attempts: {}",
                    stub.url,
                    attempts,
                    last
                );
                ResolvedArticle::unresolved(stub)
            }
            Err(RetryError::Permanent { error, .. }) => {
                crawl_warn!("Giving up on {}: {}", stub.url, error);
                ResolvedArticle::unresolved(stub)
            }
        }
    }

    async fn resolve_once(&self, stub: &ArticleStub) -> Result<ArticleDetail, ResolutionError> {
        let content = self.site.fetch_article(&stub.url).await?;
        let dest_dir = self
            .output_dir
            .join(article_dir_name(&content.title, &stub.url));
        tokio::fs::create_dir_all(&dest_dir)
            .await
            .map_err(|err| ResolutionError::Io(format!("{}: {err}", dest_dir.display())))?;

        Ok(ArticleDetail {
            title: content.title,
            source_url: stub.url.clone(),
            asset_urls: content.asset_urls,
            dest_dir,
        })
    }
}
