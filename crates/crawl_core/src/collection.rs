use std::collections::HashSet;

use crate::{ArticleResult, ArticleStub};

/// Completed articles in insertion order plus the URL set used for dedup.
///
/// Grows monotonically: there is no removal API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultCollection {
    results: Vec<ArticleResult>,
    urls: HashSet<String>,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from persisted records, keeping the first record per URL.
    pub fn from_results(results: impl IntoIterator<Item = ArticleResult>) -> Self {
        let mut collection = Self::new();
        for result in results {
            collection.insert(result);
        }
        collection
    }

    /// Appends `result` unless its URL is already present. Returns whether it was added.
    pub fn insert(&mut self, result: ArticleResult) -> bool {
        if !self.urls.insert(result.source_url.clone()) {
            return false;
        }
        self.results.push(result);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[ArticleResult] {
        &self.results
    }

    /// Splits a listing into stubs that still need work (unknown URLs, first
    /// occurrence only) and counts of what was dropped.
    pub fn filter_new(&self, stubs: Vec<ArticleStub>) -> NewArticles {
        let mut seen = HashSet::new();
        let mut split = NewArticles::default();
        for stub in stubs {
            if !seen.insert(stub.url.clone()) {
                split.repeated += 1;
            } else if self.contains(&stub.url) {
                split.already_done += 1;
            } else {
                split.stubs.push(stub);
            }
        }
        split
    }
}

/// Result of [`ResultCollection::filter_new`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewArticles {
    pub stubs: Vec<ArticleStub>,
    /// Distinct URLs already in the collection.
    pub already_done: usize,
    /// Later occurrences of a URL listed earlier in the same batch.
    pub repeated: usize,
}
