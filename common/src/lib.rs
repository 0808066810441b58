pub mod config;
pub mod paper;

pub use config::{
    AppConfig, ArxivConfig, FilterConfig, FilterLogic, LlmConfig, ProviderKind, SelectionConfig,
    SelectionMode, SlackConfig, TranslationConfig,
};
pub use paper::{
    normalize_ws, strip_version, CitationSource, Paper, PaperSummary, SummarizedPaper,
    ERROR_SENTINEL,
};
