use crate::view_model::{ProgressView, RunCounters};
use crate::{CrawlPlan, PageBatch, ResultCollection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Listing,
    Resolving,
    Downloading,
    Checkpointing,
    Finalizing,
    Done,
}

/// Coordinator-owned crawl state. Only `update` mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlState {
    phase: Phase,
    plan: CrawlPlan,
    batch: Option<PageBatch>,
    collection: ResultCollection,
    counters: RunCounters,
    catalog_total: Option<usize>,
    stop_requested: bool,
    dirty: bool,
}

impl CrawlState {
    pub fn new(plan: CrawlPlan, catalog_total: Option<usize>) -> Self {
        Self {
            phase: Phase::Idle,
            plan,
            batch: None,
            collection: ResultCollection::new(),
            counters: RunCounters::default(),
            catalog_total,
            stop_requested: false,
            dirty: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_batch(&self) -> Option<PageBatch> {
        self.batch
    }

    pub fn collection(&self) -> &ResultCollection {
        &self.collection
    }

    pub fn into_collection(self) -> ResultCollection {
        self.collection
    }

    pub fn view(&self) -> ProgressView {
        ProgressView {
            phase: self.phase,
            batch: self.batch.map(|batch| batch.number),
            batch_count: self.plan.batch_count(),
            completed_total: self.collection.len(),
            catalog_total: self.catalog_total,
            run: self.counters,
            stop_requested: self.stop_requested,
        }
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn plan(&self) -> &CrawlPlan {
        &self.plan
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub(crate) fn request_stop(&mut self) {
        self.stop_requested = true;
        self.dirty = true;
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.dirty = true;
    }

    pub(crate) fn set_batch(&mut self, batch: PageBatch) {
        self.batch = Some(batch);
        self.dirty = true;
    }

    pub(crate) fn restore(&mut self, collection: ResultCollection) {
        self.collection = collection;
        self.dirty = true;
    }

    pub(crate) fn collection_mut(&mut self) -> &mut ResultCollection {
        self.dirty = true;
        &mut self.collection
    }

    pub(crate) fn counters_mut(&mut self) -> &mut RunCounters {
        self.dirty = true;
        &mut self.counters
    }
}
