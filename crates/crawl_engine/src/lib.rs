//! Crawl engine: network, filesystem and concurrency around the crawl core.
mod asset;
mod batch;
mod codec;
mod coordinator;
mod decode;
mod fetch;
mod filename;
mod persist;
mod progress;
mod resolve;
mod retry;
mod site;
mod store;
mod types;

pub use asset::{AssetFetcher, AttemptError};
pub use batch::DownloadBatch;
pub use codec::{AssetCodec, CodecError, JpegCodec, PassthroughCodec};
pub use coordinator::{CrawlCoordinator, CrawlError, CrawlSettings, CrawlSummary};
pub use decode::decode_page;
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::{article_dir_name, catalog_dir_name};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use progress::{ChannelProgressSink, LogProgressSink, ProgressSink};
pub use resolve::ArticleResolver;
pub use retry::{retry_fixed, IsRetryable, RetryError, RetryPolicy, Sleeper, TokioSleeper};
pub use site::{
    ArticleContent, CatalogInfo, HtmlSiteAdapter, ListingError, ResolutionError, SiteAdapter,
    SiteError, SiteProfile,
};
pub use store::{ResultStore, StoreError};
pub use types::{CrawlEvent, FailureKind, FetchError, FetchMetadata, FetchOutput};
