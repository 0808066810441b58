//! Relevance filtering
//!
//! A paper either passes or it does not; relative order is preserved and
//! nothing here ever fails a run. Citation lookups are the only outside
//! calls, and a failed lookup counts as zero citations.

use chrono::Utc;
use tracing::{debug, warn};

use common::{CitationSource, FilterConfig, FilterLogic, Paper};

pub struct FilterEngine {
    config: FilterConfig,
}

impl FilterEngine {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Keep papers that satisfy the configured criteria, in input order.
    pub async fn apply(&self, papers: Vec<Paper>, citations: &dyn CitationSource) -> Vec<Paper> {
        let mut kept = Vec::new();
        for paper in papers {
            if !self.is_recent(&paper) {
                debug!(
                    "Dropping {}: older than {} years",
                    paper.id, self.config.max_years_old
                );
                continue;
            }
            let keyword_hit = self.matches_keywords(&paper);

            // a keyword hit settles OR mode outright; no citation call is spent
            if self.config.filter_logic == FilterLogic::Or && keyword_hit {
                kept.push(paper);
                continue;
            }

            let count = match citations.citation_count(paper.base_id()).await {
                Ok(count) => count,
                Err(err) => {
                    warn!("Citation lookup failed for {}: {:#}", paper.id, err);
                    0
                }
            };
            let cited_enough = count >= self.config.min_citations;
            let pass = match self.config.filter_logic {
                FilterLogic::And => keyword_hit && cited_enough,
                FilterLogic::Or => cited_enough,
            };
            if pass {
                kept.push(paper);
            } else {
                debug!("Dropping {}: {} citations, keyword_hit={}", paper.id, count, keyword_hit);
            }
        }
        kept
    }

    /// Age gate applied in both modes. Papers without a usable timestamp
    /// always count as recent.
    fn is_recent(&self, paper: &Paper) -> bool {
        match paper.published {
            Some(published) => {
                let age_days = (Utc::now() - published).num_days();
                age_days as f64 / 365.0 <= self.config.max_years_old as f64
            }
            None => true,
        }
    }

    /// False when no keywords are configured, never vacuously true.
    fn matches_keywords(&self, paper: &Paper) -> bool {
        if self.config.keywords.is_empty() {
            return false;
        }
        let haystack = format!("{} {}", paper.title, paper.summary).to_lowercase();
        self.config
            .keywords
            .iter()
            .any(|k| haystack.contains(&k.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticCitations {
        counts: HashMap<String, u32>,
        lookups: AtomicUsize,
    }

    impl StaticCitations {
        fn new(counts: &[(&str, u32)]) -> Self {
            Self {
                counts: counts.iter().map(|(id, n)| (id.to_string(), *n)).collect(),
                lookups: AtomicUsize::new(0),
            }
        }

        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CitationSource for StaticCitations {
        async fn citation_count(&self, paper_id: &str) -> anyhow::Result<u32> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            match self.counts.get(paper_id) {
                Some(n) => Ok(*n),
                None => Err(anyhow::anyhow!("unknown paper {paper_id}")),
            }
        }
    }

    fn paper(id: &str, title: &str, days_old: i64) -> Paper {
        Paper {
            id: id.to_string(),
            title: title.to_string(),
            summary: "We evaluate on benchmarks.".to_string(),
            authors: vec!["Doe, J.".to_string()],
            categories: vec!["cs.AI".to_string()],
            published: Some(Utc::now() - chrono::Duration::days(days_old)),
            entry_url: format!("https://arxiv.org/abs/{id}"),
            pdf_url: None,
        }
    }

    fn engine(keywords: &[&str], min_citations: u32, logic: FilterLogic) -> FilterEngine {
        FilterEngine::new(&FilterConfig {
            max_years_old: 3,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            min_citations,
            filter_logic: logic,
        })
    }

    #[tokio::test]
    async fn empty_keyword_set_is_never_vacuously_true() {
        // OR mode with no keywords degrades to the citation threshold alone
        let engine = engine(&[], 5, FilterLogic::Or);
        let source = StaticCitations::new(&[("a", 10), ("b", 2)]);
        let kept = engine
            .apply(vec![paper("a", "First", 10), paper("b", "Second", 10)], &source)
            .await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "a");
    }

    #[tokio::test]
    async fn missing_timestamp_counts_as_recent() {
        let engine = engine(&[], 0, FilterLogic::Or);
        let source = StaticCitations::new(&[("a", 0)]);
        let mut undated = paper("a", "Undated", 0);
        undated.published = None;
        let kept = engine.apply(vec![undated], &source).await;
        assert_eq!(kept.len(), 1);
    }

    #[tokio::test]
    async fn old_papers_are_dropped_before_any_other_check() {
        let engine = engine(&["benchmark"], 0, FilterLogic::Or);
        let source = StaticCitations::new(&[]);
        let kept = engine
            .apply(vec![paper("old", "Benchmark suite", 4 * 365)], &source)
            .await;
        assert!(kept.is_empty());
        assert_eq!(source.lookups(), 0);
    }

    #[tokio::test]
    async fn relative_order_is_preserved() {
        let engine = engine(&[], 0, FilterLogic::Or);
        let source = StaticCitations::new(&[("a", 1), ("b", 2), ("c", 3)]);
        let papers = vec![
            paper("a", "First", 1),
            paper("b", "Second", 2),
            paper("c", "Third", 3),
        ];
        let kept = engine.apply(papers, &source).await;
        let ids: Vec<&str> = kept.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn and_mode_requires_keyword_and_citations() {
        let engine = engine(&["diffusion"], 5, FilterLogic::And);
        let source = StaticCitations::new(&[("both", 9), ("kw_only", 2), ("cit_only", 9)]);
        let kept = engine
            .apply(
                vec![
                    paper("both", "Diffusion models", 10),
                    paper("kw_only", "Diffusion sampling", 10),
                    paper("cit_only", "Graph networks", 10),
                ],
                &source,
            )
            .await;
        let ids: Vec<&str> = kept.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["both"]);
    }

    #[tokio::test]
    async fn or_mode_keyword_hit_skips_the_citation_lookup() {
        let engine = engine(&["agents"], 100, FilterLogic::Or);
        let source = StaticCitations::new(&[("plain", 0)]);
        let kept = engine
            .apply(
                vec![
                    paper("match", "Multi-Agents planning", 10),
                    paper("plain", "Sorting networks", 10),
                ],
                &source,
            )
            .await;
        // the keyword match passed without a lookup; the other paper used one
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "match");
        assert_eq!(source.lookups(), 1);
    }

    #[tokio::test]
    async fn failed_lookup_counts_as_zero() {
        let strict = engine(&[], 1, FilterLogic::Or);
        let lenient = engine(&[], 0, FilterLogic::Or);
        let source = StaticCitations::new(&[]);
        let dropped = strict.apply(vec![paper("x", "Unknown", 1)], &source).await;
        assert!(dropped.is_empty());
        let kept = lenient.apply(vec![paper("x", "Unknown", 1)], &source).await;
        assert_eq!(kept.len(), 1);
    }

    #[tokio::test]
    async fn keyword_match_is_case_insensitive_over_title_and_abstract() {
        let engine = engine(&["BENCHMARK"], 100, FilterLogic::Or);
        let source = StaticCitations::new(&[]);
        // "benchmarks" only appears in the abstract text
        let kept = engine.apply(vec![paper("a", "Plain title", 1)], &source).await;
        assert_eq!(kept.len(), 1);
    }
}
