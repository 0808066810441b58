pub mod extract;
pub mod gemini;
pub mod openai;
pub mod provider;

pub use extract::SectionExtractor;
pub use gemini::GeminiSummarizer;
pub use openai::OpenAiSummarizer;
pub use provider::{SummaryDispatcher, Summarizer, SummaryRequest};
