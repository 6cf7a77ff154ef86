//! Crawl core: data model and the pure crawl state machine.
mod collection;
mod effect;
mod msg;
mod plan;
mod state;
mod types;
mod update;
mod view_model;

pub use collection::{NewArticles, ResultCollection};
pub use effect::{ArticleOutcome, ArticleReport, Effect};
pub use msg::Msg;
pub use plan::{pages_for, CheckpointLabel, CrawlPlan, PageBatch, PlanError};
pub use state::{CrawlState, Phase};
pub use types::{
    asset_filename, ArticleDetail, ArticleResult, ArticleStub, AssetRecord, AssetStatus,
    Completion, ResolvedArticle,
};
pub use update::update;
pub use view_model::{ProgressView, RunCounters};
