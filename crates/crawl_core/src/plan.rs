use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("start page {start} is after end page {end}")]
    EmptyRange { start: u32, end: u32 },
    #[error("page numbers start at 1")]
    ZeroPage,
    #[error("save interval must be at least one page")]
    ZeroSaveInterval,
}

/// One contiguous run of pages processed before a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBatch {
    /// 1-based position of the batch inside the plan.
    pub number: usize,
    pub first_page: u32,
    pub last_page: u32,
}

impl PageBatch {
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.first_page..=self.last_page
    }
}

/// Page range split into checkpoint batches of `save_interval` pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlPlan {
    start_page: u32,
    end_page: u32,
    save_interval: u32,
}

impl CrawlPlan {
    pub fn new(start_page: u32, end_page: u32, save_interval: u32) -> Result<Self, PlanError> {
        if start_page == 0 {
            return Err(PlanError::ZeroPage);
        }
        if start_page > end_page {
            return Err(PlanError::EmptyRange {
                start: start_page,
                end: end_page,
            });
        }
        if save_interval == 0 {
            return Err(PlanError::ZeroSaveInterval);
        }
        Ok(Self {
            start_page,
            end_page,
            save_interval,
        })
    }

    pub fn start_page(&self) -> u32 {
        self.start_page
    }

    pub fn end_page(&self) -> u32 {
        self.end_page
    }

    pub fn batch_count(&self) -> usize {
        let pages = self.end_page - self.start_page + 1;
        pages.div_ceil(self.save_interval) as usize
    }

    /// Batch `number` (1-based), or `None` past the end of the plan.
    pub fn batch(&self, number: usize) -> Option<PageBatch> {
        if number == 0 || number > self.batch_count() {
            return None;
        }
        let offset = (number as u32 - 1) * self.save_interval;
        let first_page = self.start_page + offset;
        let last_page = first_page
            .saturating_add(self.save_interval - 1)
            .min(self.end_page);
        Some(PageBatch {
            number,
            first_page,
            last_page,
        })
    }

    pub fn batches(&self) -> impl Iterator<Item = PageBatch> + '_ {
        (1..=self.batch_count()).filter_map(move |number| self.batch(number))
    }
}

/// Number of listing pages needed to cover `total_articles` at `per_page` entries each.
pub fn pages_for(total_articles: usize, per_page: usize) -> u32 {
    if per_page == 0 {
        return 1;
    }
    total_articles.div_ceil(per_page).max(1) as u32
}

/// Checkpoint naming: one snapshot per batch plus the canonical final one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointLabel {
    Partial(usize),
    Final,
}

impl fmt::Display for CheckpointLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointLabel::Partial(number) => write!(f, "partial_{number}"),
            CheckpointLabel::Final => write!(f, "final"),
        }
    }
}
