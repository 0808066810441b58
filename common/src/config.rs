//! Runtime configuration
//!
//! Layered load: an optional `config.toml` next to the binary, overridden by
//! `DIGEST_*` environment variables (e.g. `DIGEST_ARXIV__MAX_RESULTS=3`).
//! Every section has defaults so the binary runs with no file at all.
//! Credentials never live here; config holds the *names* of environment
//! variables that are resolved at the call site.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub arxiv: ArxivConfig,
    pub selection: SelectionConfig,
    pub llm: LlmConfig,
    pub translation: TranslationConfig,
    pub slack: SlackConfig,
}

impl AppConfig {
    /// Load from `config.toml` (optional) plus `DIGEST_*` env overrides.
    pub fn load() -> Result<Self> {
        Self::load_from("config")
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("DIGEST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to assemble configuration sources")?;
        let cfg: AppConfig = settings
            .try_deserialize()
            .context("invalid configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.arxiv.categories.is_empty() {
            return Err(anyhow::anyhow!("arxiv.categories must not be empty"));
        }
        if self.arxiv.max_results == 0 {
            return Err(anyhow::anyhow!("arxiv.max_results must be at least 1"));
        }
        if self.arxiv.max_retries == 0 {
            return Err(anyhow::anyhow!("arxiv.max_retries must be at least 1"));
        }
        if self.selection.count == 0 {
            return Err(anyhow::anyhow!("selection.count must be at least 1"));
        }
        Ok(())
    }
}

/// Search parameters for the arXiv API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArxivConfig {
    /// Category codes joined with OR in the query, e.g. `cs.AI`, `cs.LG`.
    pub categories: Vec<String>,
    /// Papers delivered per run; the search over-fetches beyond this.
    pub max_results: usize,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    /// Soft wall-clock budget for one fetch attempt.
    pub attempt_timeout_secs: u64,
    pub filters: FilterConfig,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            categories: vec!["cs.AI".to_string()],
            max_results: 5,
            max_retries: 3,
            retry_delay_secs: 3,
            attempt_timeout_secs: 30,
            filters: FilterConfig::default(),
        }
    }
}

/// Relevance criteria applied after the search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Maximum paper age in years.
    pub max_years_old: u32,
    /// Empty set means the keyword predicate is always false, never
    /// vacuously true.
    pub keywords: Vec<String>,
    pub min_citations: u32,
    pub filter_logic: FilterLogic,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_years_old: 3,
            keywords: Vec::new(),
            min_citations: 0,
            filter_logic: FilterLogic::Or,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterLogic {
    And,
    Or,
}

/// How many of the filtered papers get delivered, and in what manner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub mode: SelectionMode,
    /// Used by `top_n`; `random_one` always picks a single paper.
    pub count: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::RandomOne,
            count: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    TopN,
    RandomOne,
}

/// Summarization provider choice. Exactly one provider is active per run;
/// there is no fallback chaining.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    /// Overrides the per-provider default model.
    pub model: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Env var holding the API key; defaults depend on the provider.
    pub api_key_env: Option<String>,
    /// Feed section text extracted from the paper PDF to the provider.
    pub extract_sections: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::None,
            model: None,
            temperature: 0.7,
            max_output_tokens: 2048,
            api_key_env: None,
            extract_sections: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    None,
    Chatgpt,
    Gemini,
}

impl ProviderKind {
    /// Display label used in log lines and message headers.
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::None => "none",
            ProviderKind::Chatgpt => "ChatGPT",
            ProviderKind::Gemini => "Gemini",
        }
    }
}

/// Abstract/title translation for runs without an active LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub target_lang: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_lang: "ja".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Env var holding the incoming-webhook URL.
    pub webhook_url_env: String,
    /// Section prepended to every delivered message.
    pub greeting: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            webhook_url_env: "SLACK_WEBHOOK_URL".to_string(),
            greeting: "おはよう☀️ 今日の論文はこちら!!".to_string(),
        }
    }
}
