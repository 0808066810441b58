//! Core paper types shared across the pipeline
//!
//! A [`Paper`] is immutable once fetched. Summarization produces a new
//! [`SummarizedPaper`] value instead of mutating the paper in place, so the
//! same paper can flow through filtering, summarization and formatting
//! without hidden state.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix carried by every failure placeholder, so formatting can tell a
/// notice apart from genuine summary text.
pub const ERROR_SENTINEL: &str = "※";

/// Collapse all whitespace runs (newlines included) into single spaces.
pub fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip a trailing `v<digits>` version marker from an arXiv identifier.
///
/// Bibliographic services key papers by the unversioned id:
/// `2501.01234v2` -> `2501.01234`, `cs/9901001v1` -> `cs/9901001`.
pub fn strip_version(id: &str) -> &str {
    if let Some(pos) = id.rfind('v') {
        let suffix = &id[pos + 1..];
        if pos > 0 && !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
            return &id[..pos];
        }
    }
    id
}

/// A single arXiv entry as returned by the search API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Catalog identifier with the version suffix retained, e.g. `2501.01234v2`.
    pub id: String,
    pub title: String,
    /// Abstract text (the Atom feed calls this the summary).
    pub summary: String,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    /// Submission timestamp; `None` when the feed value is missing or unparsable.
    pub published: Option<DateTime<Utc>>,
    /// Abstract page on arxiv.org.
    pub entry_url: String,
    pub pdf_url: Option<String>,
}

impl Paper {
    pub fn base_id(&self) -> &str {
        strip_version(&self.id)
    }

    pub fn cleaned_title(&self) -> String {
        normalize_ws(&self.title)
    }

    pub fn cleaned_summary(&self) -> String {
        normalize_ws(&self.summary)
    }
}

/// Outcome of one summarization attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperSummary {
    /// Human-readable provider label, e.g. `ChatGPT` or `Gemini`.
    pub provider: String,
    pub text: String,
    /// True when `text` is a failure placeholder rather than model output.
    pub is_error: bool,
}

impl PaperSummary {
    pub fn generated(provider: String, text: String) -> Self {
        Self {
            provider,
            text,
            is_error: false,
        }
    }

    /// A failure notice. The sentinel prefix is added here when missing.
    pub fn failure(provider: String, text: String) -> Self {
        let text = if text.starts_with(ERROR_SENTINEL) {
            text
        } else {
            format!("{ERROR_SENTINEL} {text}")
        };
        Self {
            provider,
            text,
            is_error: true,
        }
    }
}

/// A paper together with its optional summarization outcome.
///
/// `summary: None` means summarization was skipped or never attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizedPaper {
    pub paper: Paper,
    pub summary: Option<PaperSummary>,
}

impl SummarizedPaper {
    /// Pass-through wrapper for a paper that was not summarized.
    pub fn untouched(paper: Paper) -> Self {
        Self {
            paper,
            summary: None,
        }
    }
}

/// Citation lookup keyed by version-stripped catalog id.
#[async_trait]
pub trait CitationSource: Send + Sync {
    async fn citation_count(&self, paper_id: &str) -> Result<u32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_paper() -> Paper {
        Paper {
            id: "2501.01234v2".to_string(),
            title: "Test  Paper\n  Title".to_string(),
            summary: "An   abstract\nwith newlines".to_string(),
            authors: vec!["Alice".to_string()],
            categories: vec!["cs.AI".to_string()],
            published: None,
            entry_url: "https://arxiv.org/abs/2501.01234v2".to_string(),
            pdf_url: None,
        }
    }

    #[test]
    fn strip_version_removes_modern_suffix() {
        assert_eq!(strip_version("2501.01234v2"), "2501.01234");
        assert_eq!(strip_version("2501.01234v10"), "2501.01234");
    }

    #[test]
    fn strip_version_handles_legacy_and_unversioned_ids() {
        assert_eq!(strip_version("cs/9901001v1"), "cs/9901001");
        assert_eq!(strip_version("2501.01234"), "2501.01234");
        assert_eq!(strip_version("v1"), "v1");
    }

    #[test]
    fn cleaned_fields_collapse_whitespace() {
        let paper = sample_paper();
        assert_eq!(paper.cleaned_title(), "Test Paper Title");
        assert_eq!(paper.cleaned_summary(), "An abstract with newlines");
    }

    #[test]
    fn failure_summary_carries_sentinel_exactly_once() {
        let s = PaperSummary::failure("Gemini".to_string(), "quota exceeded".to_string());
        assert!(s.is_error);
        assert!(s.text.starts_with(ERROR_SENTINEL));

        let already = PaperSummary::failure("Gemini".to_string(), "※ already marked".to_string());
        assert_eq!(already.text, "※ already marked");
    }
}
