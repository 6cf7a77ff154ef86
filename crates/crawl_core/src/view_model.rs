use crate::Phase;

/// Counters for the current process run only; the checkpoint carries history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunCounters {
    pub listed: usize,
    /// Listed articles already in the collection.
    pub skipped_done: usize,
    /// Duplicate entries within one batch's listing.
    pub repeated_in_listing: usize,
    pub listing_failures: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub completed: usize,
    pub incomplete: usize,
    pub nothing_downloaded: usize,
    pub assets_downloaded: usize,
    pub assets_existing: usize,
    pub assets_not_found: usize,
    pub assets_failed: usize,
}

/// Read-only progress snapshot handed to logging and progress sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressView {
    pub phase: Phase,
    pub batch: Option<usize>,
    pub batch_count: usize,
    /// Articles in the collection, including those restored from the checkpoint.
    pub completed_total: usize,
    pub catalog_total: Option<usize>,
    pub run: RunCounters,
    pub stop_requested: bool,
}

impl ProgressView {
    /// `completed/total` as shown to the operator; `?` when the total is unknown.
    pub fn progress_label(&self) -> String {
        match self.catalog_total {
            Some(total) => format!("{}/{}", self.completed_total, total),
            None => format!("{}/?", self.completed_total),
        }
    }
}
