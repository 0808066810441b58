//! Provider abstraction and dispatch
//!
//! One provider is active per run, chosen by config; there is no fallback
//! chaining. Whatever happens inside a provider, the dispatcher hands back
//! a [`SummarizedPaper`]: a failure becomes a sentinel-prefixed notice in
//! place of the summary, so a degraded run still delivers something
//! readable instead of aborting.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use common::{LlmConfig, Paper, PaperSummary, ProviderKind, SummarizedPaper};

use crate::extract::SectionExtractor;
use crate::gemini::GeminiSummarizer;
use crate::openai::OpenAiSummarizer;

/// Everything a provider needs to build its prompt.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub published: Option<DateTime<Utc>>,
    /// Extracted PDF context, already truncated to its budget. Empty when
    /// extraction is disabled or failed.
    pub context: String,
}

impl SummaryRequest {
    pub fn from_paper(paper: &Paper, context: String) -> Self {
        Self {
            title: paper.cleaned_title(),
            abstract_text: paper.cleaned_summary(),
            authors: paper.authors.clone(),
            categories: paper.categories.clone(),
            published: paper.published,
            context,
        }
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Display label used in message headers, e.g. `ChatGPT`.
    fn label(&self) -> &str;

    /// API vendor label used in failure notices, e.g. `OpenAI`.
    fn api_label(&self) -> &str {
        self.label()
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<String>;
}

/// Failure classes mirror the search client's style of substring matching.
/// Precedence: rate limits, then permissions, then credential shape, then
/// everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    RateLimited,
    AccessDenied,
    InvalidCredential,
    Other,
}

pub fn classify_provider_failure(message: &str) -> ProviderFailure {
    let lower = message.to_lowercase();
    if lower.contains("rate limit") || lower.contains("quota") || lower.contains("exceeded") {
        ProviderFailure::RateLimited
    } else if lower.contains("permission")
        || lower.contains("access")
        || lower.contains("unauthorized")
    {
        ProviderFailure::AccessDenied
    } else if lower.contains("invalid") && lower.contains("api") && lower.contains("key") {
        ProviderFailure::InvalidCredential
    } else {
        ProviderFailure::Other
    }
}

/// Human-readable notice shown in place of a summary.
pub fn failure_notice(api_label: &str, failure: ProviderFailure) -> String {
    match failure {
        ProviderFailure::RateLimited => {
            format!("※ {api_label} APIの利用制限に達したため、要約を生成できませんでした。")
        }
        ProviderFailure::AccessDenied => {
            format!("※ {api_label} APIのアクセス権限エラーが発生したため、要約を生成できませんでした。")
        }
        ProviderFailure::InvalidCredential => {
            format!("※ 無効な{api_label} APIキーのため、要約を生成できませんでした。")
        }
        ProviderFailure::Other => {
            format!("※ {api_label} API処理中にエラーが発生したため、要約を生成できませんでした。")
        }
    }
}

pub struct SummaryDispatcher {
    provider: Option<Box<dyn Summarizer>>,
    extractor: Option<SectionExtractor>,
}

impl SummaryDispatcher {
    /// Build from config. `provider = none` and unresolvable credentials
    /// both yield a skipping dispatcher, never an error.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let provider: Option<Box<dyn Summarizer>> = match config.provider {
            ProviderKind::None => None,
            ProviderKind::Chatgpt => match resolve_api_key(config, "OPENAI_API_KEY") {
                Some(key) => Some(Box::new(OpenAiSummarizer::new(config, key)?)),
                None => None,
            },
            ProviderKind::Gemini => match resolve_api_key(config, "GEMINI_API_KEY") {
                Some(key) => Some(Box::new(GeminiSummarizer::new(config, key)?)),
                None => None,
            },
        };
        let extractor = if config.extract_sections && provider.is_some() {
            Some(SectionExtractor::new()?)
        } else {
            None
        };
        Ok(Self {
            provider,
            extractor,
        })
    }

    /// Composition seam: run with an explicit provider.
    pub fn with_provider(provider: Box<dyn Summarizer>) -> Self {
        Self {
            provider: Some(provider),
            extractor: None,
        }
    }

    /// Whether a provider will actually be consulted this run.
    pub fn is_active(&self) -> bool {
        self.provider.is_some()
    }

    /// Never fails the pipeline: skipped, succeeded, or a failure notice.
    pub async fn summarize(&self, paper: Paper) -> SummarizedPaper {
        let provider = match &self.provider {
            Some(p) => p,
            None => return SummarizedPaper::untouched(paper),
        };

        let context = match &self.extractor {
            Some(extractor) => extractor.extract(&paper).await,
            None => String::new(),
        };
        let request = SummaryRequest::from_paper(&paper, context);

        match provider.summarize(&request).await {
            Ok(text) => {
                info!("✅ Generated a {} summary for {}", provider.label(), paper.id);
                SummarizedPaper {
                    paper,
                    summary: Some(PaperSummary::generated(provider.label().to_string(), text)),
                }
            }
            Err(err) => {
                let rendered = format!("{err:#}");
                let failure = classify_provider_failure(&rendered);
                warn!(
                    "{} summarization failed for {} ({:?}): {}",
                    provider.label(),
                    paper.id,
                    failure,
                    rendered
                );
                let notice = failure_notice(provider.api_label(), failure);
                SummarizedPaper {
                    paper,
                    summary: Some(PaperSummary::failure(provider.label().to_string(), notice)),
                }
            }
        }
    }
}

fn resolve_api_key(config: &LlmConfig, default_env: &str) -> Option<String> {
    let env_name = config
        .api_key_env
        .clone()
        .unwrap_or_else(|| default_env.to_string());
    match std::env::var(&env_name) {
        Ok(key) if !key.trim().is_empty() => Some(key),
        _ => {
            warn!("{} is not set, skipping summarization", env_name);
            None
        }
    }
}
