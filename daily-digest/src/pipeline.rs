//! One digest run from search to delivery
//!
//! Strictly sequential: fetch, filter, select, then per paper summarize,
//! compose and post. An exhausted search is the only error that aborts the
//! run; every later stage degrades in place and the loop keeps going.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use uuid::Uuid;

use common::AppConfig;
use notification::{MessageComposer, Translator, WebhookSender};
use paper_discovery::{ArxivClient, SemanticScholarClient};
use paper_selection::{FilterEngine, NoCandidates, SelectionPolicy};
use summarization::SummaryDispatcher;

/// Over-fetch factor applied to the search; filtering and selection thin
/// the raw list back down to `selection.count`.
const FETCH_OVERSAMPLE: usize = 3;

fn fetch_limit(max_results: usize) -> usize {
    max_results * FETCH_OVERSAMPLE
}

/// Translation is a fallback for runs without an LLM provider; generated
/// summaries are already in the target language.
fn should_translate(translation_enabled: bool, provider_active: bool) -> bool {
    translation_enabled && !provider_active
}

pub async fn run(config: &AppConfig) -> Result<()> {
    let run_id = Uuid::new_v4();
    let started = Instant::now();
    info!("Digest run {run_id} started");

    let arxiv = ArxivClient::new(&config.arxiv)?;
    let papers = arxiv
        .fetch(
            &config.arxiv.categories,
            fetch_limit(config.arxiv.max_results),
            &config.arxiv.filters.keywords,
        )
        .await
        .context("paper search failed")?;
    if papers.is_empty() {
        warn!("No papers found; nothing to deliver");
        return Ok(());
    }

    let citations = SemanticScholarClient::new()?;
    let filter = FilterEngine::new(&config.arxiv.filters);
    let candidates = filter.apply(papers, &citations).await;

    let policy = SelectionPolicy::new(&config.selection);
    let selected = match policy.select(candidates) {
        Ok(selected) => selected,
        Err(NoCandidates) => {
            warn!("All papers were filtered out; nothing to deliver");
            return Ok(());
        }
    };
    info!("Posting {} paper(s) to Slack", selected.len());

    let dispatcher = SummaryDispatcher::from_config(&config.llm)?;
    let translator = Translator::new(&config.translation)?;
    let composer = MessageComposer::new();
    let sender = WebhookSender::from_config(&config.slack)?;
    let translate = should_translate(config.translation.enabled, dispatcher.is_active());

    let total = selected.len();
    let mut delivered = 0usize;
    for paper in selected {
        let paper = if translate {
            translator.translate_paper(paper).await
        } else {
            paper
        };
        let item = dispatcher.summarize(paper).await;
        let mut message = composer.compose(&item);
        sender.add_greeting(&mut message);

        match sender.send(&message).await {
            Ok(true) => {
                info!("Posted 「{}」", item.paper.cleaned_title());
                delivered += 1;
            }
            Ok(false) => {}
            Err(err) => {
                error!("Failed to post 「{}」: {:#}", item.paper.cleaned_title(), err);
            }
        }
        // Courtesy pause between webhook posts.
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    info!(
        "Digest run {run_id} finished: {delivered}/{total} posted in {:.2}s",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_limit_oversamples_threefold() {
        assert_eq!(fetch_limit(1), 3);
        assert_eq!(fetch_limit(5), 15);
    }

    #[test]
    fn translation_yields_to_an_active_provider() {
        assert!(should_translate(true, false));
        assert!(!should_translate(true, true));
        assert!(!should_translate(false, false));
        assert!(!should_translate(false, true));
    }
}
