//! Selection policy
//!
//! Decides which filtered papers get delivered: the head of the list, or a
//! single random pick for day-to-day variety.

use tracing::info;

use common::{Paper, SelectionConfig, SelectionMode};

/// Nothing survived filtering. A valid end state for a run: the caller logs
/// it and delivers nothing.
#[derive(Debug, thiserror::Error)]
#[error("no candidate papers to select from")]
pub struct NoCandidates;

pub struct SelectionPolicy {
    config: SelectionConfig,
}

impl SelectionPolicy {
    pub fn new(config: &SelectionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// `top_n` keeps the first `count` papers in input order. `random_one`
    /// picks exactly one, uniform over the input length; `fastrand` is not a
    /// cryptographic source, which is fine for digest variety.
    pub fn select(&self, mut papers: Vec<Paper>) -> Result<Vec<Paper>, NoCandidates> {
        if papers.is_empty() {
            return Err(NoCandidates);
        }
        match self.config.mode {
            SelectionMode::TopN => {
                papers.truncate(self.config.count);
                info!("Selected top {} of the filtered papers", papers.len());
                Ok(papers)
            }
            SelectionMode::RandomOne => {
                let total = papers.len();
                let picked = papers.swap_remove(fastrand::usize(..total));
                info!("Selected {} at random from {} candidates", picked.id, total);
                Ok(vec![picked])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: &str) -> Paper {
        Paper {
            id: id.to_string(),
            title: format!("Paper {id}"),
            summary: "Abstract.".to_string(),
            authors: vec![],
            categories: vec!["cs.AI".to_string()],
            published: None,
            entry_url: format!("https://arxiv.org/abs/{id}"),
            pdf_url: None,
        }
    }

    fn policy(mode: SelectionMode, count: usize) -> SelectionPolicy {
        SelectionPolicy::new(&SelectionConfig { mode, count })
    }

    #[test]
    fn top_n_keeps_the_first_papers_in_order() {
        let papers = vec![paper("a"), paper("b"), paper("c")];
        let picked = policy(SelectionMode::TopN, 2).select(papers).unwrap();
        let ids: Vec<&str> = picked.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn top_n_larger_than_input_keeps_everything() {
        let picked = policy(SelectionMode::TopN, 10)
            .select(vec![paper("a"), paper("b")])
            .unwrap();
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn empty_input_is_no_candidates() {
        assert!(policy(SelectionMode::TopN, 1).select(vec![]).is_err());
        assert!(policy(SelectionMode::RandomOne, 1).select(vec![]).is_err());
    }

    #[test]
    fn random_one_returns_exactly_one_of_the_inputs() {
        let papers = vec![paper("a"), paper("b"), paper("c")];
        let picked = policy(SelectionMode::RandomOne, 1)
            .select(papers.clone())
            .unwrap();
        assert_eq!(picked.len(), 1);
        assert!(papers.iter().any(|p| p.id == picked[0].id));
    }

    #[test]
    fn random_one_is_roughly_uniform() {
        fastrand::seed(7);
        let papers = vec![paper("a"), paper("b"), paper("c"), paper("d")];
        let policy = policy(SelectionMode::RandomOne, 1);
        let mut counts = [0usize; 4];
        for _ in 0..2000 {
            let picked = policy.select(papers.clone()).unwrap();
            let ix = papers.iter().position(|p| p.id == picked[0].id).unwrap();
            counts[ix] += 1;
        }
        // expected 500 per slot; the bounds are loose on purpose
        for &c in &counts {
            assert!(c > 350 && c < 650, "skewed selection counts: {counts:?}");
        }
    }
}
