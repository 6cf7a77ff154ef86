use crate::{
    ArticleDetail, ArticleOutcome, ArticleReport, ArticleResult, AssetRecord, AssetStatus,
    CheckpointLabel, Completion, CrawlState, Effect, Msg, Phase, ResolvedArticle,
};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not belong to the current phase are ignored.
pub fn update(mut state: CrawlState, msg: Msg) -> (CrawlState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start { restored } => {
            if state.phase() != Phase::Idle {
                return (state, Vec::new());
            }
            state.restore(restored);
            start_batch(&mut state, 1)
        }
        Msg::PagesListed {
            stubs,
            failed_pages,
        } => {
            if state.phase() != Phase::Listing {
                return (state, Vec::new());
            }
            let listed = stubs.len();
            let fresh = state.collection().filter_new(stubs);
            let counters = state.counters_mut();
            counters.listed += listed;
            counters.skipped_done += fresh.already_done;
            counters.repeated_in_listing += fresh.repeated;
            counters.listing_failures += failed_pages.len();

            if fresh.stubs.is_empty() {
                checkpoint_batch(&mut state)
            } else {
                state.set_phase(Phase::Resolving);
                vec![Effect::ResolveArticles { stubs: fresh.stubs }]
            }
        }
        Msg::ArticlesResolved { articles } => {
            if state.phase() != Phase::Resolving {
                return (state, Vec::new());
            }
            let mut effects = Vec::new();
            let mut details: Vec<ArticleDetail> = Vec::with_capacity(articles.len());
            for article in articles {
                match article {
                    ResolvedArticle::Resolved(detail) => details.push(detail),
                    ResolvedArticle::Unresolved { title, source_url } => {
                        state.counters_mut().unresolved += 1;
                        effects.push(Effect::ReportArticle(ArticleReport {
                            title,
                            source_url,
                            outcome: ArticleOutcome::Unresolved,
                        }));
                    }
                }
            }
            state.counters_mut().resolved += details.len();

            if details.is_empty() {
                effects.extend(checkpoint_batch(&mut state));
            } else {
                state.set_phase(Phase::Downloading);
                effects.push(Effect::DownloadArticles { articles: details });
            }
            effects
        }
        Msg::ArticleDownloaded {
            title,
            source_url,
            assets,
        } => {
            if state.phase() != Phase::Downloading {
                return (state, Vec::new());
            }
            let outcome = record_article(&mut state, &title, &source_url, assets);
            vec![Effect::ReportArticle(ArticleReport {
                title,
                source_url,
                outcome,
            })]
        }
        Msg::DownloadsFinished => {
            if state.phase() != Phase::Downloading {
                return (state, Vec::new());
            }
            checkpoint_batch(&mut state)
        }
        Msg::CheckpointSaved { label } => match (state.phase(), label) {
            (Phase::Checkpointing, CheckpointLabel::Partial(number)) => {
                let next = number + 1;
                if state.stop_requested() || state.plan().batch(next).is_none() {
                    state.set_phase(Phase::Finalizing);
                    vec![Effect::SaveCheckpoint {
                        label: CheckpointLabel::Final,
                    }]
                } else {
                    start_batch(&mut state, next)
                }
            }
            (Phase::Finalizing, CheckpointLabel::Final) => {
                state.set_phase(Phase::Done);
                vec![Effect::Finish]
            }
            _ => Vec::new(),
        },
        Msg::StopRequested => {
            if state.stop_requested() {
                return (state, Vec::new());
            }
            state.request_stop();
            if state.phase() == Phase::Idle {
                state.set_phase(Phase::Done);
                vec![Effect::Finish]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}

fn start_batch(state: &mut CrawlState, number: usize) -> Vec<Effect> {
    match state.plan().batch(number) {
        Some(batch) => {
            state.set_batch(batch);
            state.set_phase(Phase::Listing);
            vec![Effect::ListPages { batch }]
        }
        None => {
            state.set_phase(Phase::Finalizing);
            vec![Effect::SaveCheckpoint {
                label: CheckpointLabel::Final,
            }]
        }
    }
}

fn checkpoint_batch(state: &mut CrawlState) -> Vec<Effect> {
    let number = state.current_batch().map(|batch| batch.number).unwrap_or(1);
    state.set_phase(Phase::Checkpointing);
    vec![Effect::SaveCheckpoint {
        label: CheckpointLabel::Partial(number),
    }]
}

fn record_article(
    state: &mut CrawlState,
    title: &str,
    source_url: &str,
    assets: Vec<AssetRecord>,
) -> ArticleOutcome {
    let counters = state.counters_mut();
    for asset in &assets {
        match asset.status {
            AssetStatus::Success => counters.assets_downloaded += 1,
            AssetStatus::AlreadyExists => counters.assets_existing += 1,
            AssetStatus::NotFound => counters.assets_not_found += 1,
            AssetStatus::Failed => counters.assets_failed += 1,
            AssetStatus::Pending => {}
        }
    }

    match Completion::decide(&assets) {
        Completion::Complete => {
            let inserted = state.collection_mut().insert(ArticleResult {
                title: title.to_string(),
                source_url: source_url.to_string(),
                assets: assets.clone(),
            });
            if inserted {
                state.counters_mut().completed += 1;
            }
            ArticleOutcome::Completed { assets }
        }
        Completion::HasFailures { failed } => {
            state.counters_mut().incomplete += 1;
            ArticleOutcome::Incomplete {
                failed,
                total: assets.len(),
            }
        }
        Completion::NothingDownloaded => {
            state.counters_mut().nothing_downloaded += 1;
            ArticleOutcome::NothingDownloaded {
                total: assets.len(),
            }
        }
    }
}
