//! Citation counts from the Semantic Scholar Graph API
//!
//! Lookups are keyed by the version-stripped arXiv id (`arXiv:2501.01234`).
//! Callers treat any error here as "citation count unknown"; the filter
//! layer maps that to zero rather than failing a run.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use common::{strip_version, CitationSource};

pub const SEMANTIC_SCHOLAR_API_URL: &str = "https://api.semanticscholar.org/graph/v1/paper";

const USER_AGENT: &str = "daily-digest/0.1";

pub struct SemanticScholarClient {
    http: Client,
    base_url: String,
}

/// Subset of the paper record the graph API returns for `fields=citationCount`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaperRecord {
    #[serde(default)]
    citation_count: Option<i64>,
}

impl SemanticScholarClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: SEMANTIC_SCHOLAR_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    fn lookup_url(&self, paper_id: &str) -> String {
        format!("{}/arXiv:{}", self.base_url, strip_version(paper_id))
    }
}

#[async_trait]
impl CitationSource for SemanticScholarClient {
    async fn citation_count(&self, paper_id: &str) -> Result<u32> {
        let url = self.lookup_url(paper_id);
        let response = self
            .http
            .get(&url)
            .query(&[("fields", "citationCount")])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(anyhow!("Semantic Scholar rate limit: HTTP {}", status));
        }
        if !status.is_success() {
            return Err(anyhow!("Semantic Scholar API error: HTTP {}", status));
        }

        let record: PaperRecord = response.json().await?;
        let count = record.citation_count.unwrap_or(0).max(0) as u32;
        debug!("{} has {} citations", url, count);
        Ok(count)
    }
}
