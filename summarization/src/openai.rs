//! OpenAI chat-completions provider

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use common::LlmConfig;

use crate::provider::{Summarizer, SummaryRequest};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

const DEFAULT_MODEL: &str = "gpt-4o";
const SYSTEM_PROMPT: &str = "あなたは研究論文を分析する専門家のAIアシスタントです。";

pub struct OpenAiSummarizer {
    http: Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiSummarizer {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            http,
            api_url: OPENAI_API_URL.to_string(),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
        })
    }

    fn build_prompt(request: &SummaryRequest) -> String {
        let mut prompt = format!(
            "以下の論文を日本語で要約し、要点を以下のフォーマットに従って800~1000文字で出力してください。\n\n\
             タイトル: {}\nアブストラクト:\n{}\n",
            request.title, request.abstract_text
        );
        if !request.context.is_empty() {
            prompt.push_str("\n【本文からの抜粋】\n");
            prompt.push_str(&request.context);
            prompt.push('\n');
        }
        prompt.push_str("\n<問題設定>\n\n<提案手法>\n\n<結果>\n\n<結論>\n");
        prompt
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    fn label(&self) -> &str {
        "ChatGPT"
    }

    fn api_label(&self) -> &str {
        "OpenAI"
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": Self::build_prompt(request)},
            ],
            "max_tokens": self.max_tokens,
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI API error: HTTP {} {}", status, snippet(&text)));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("OpenAI response contained no choices"))
    }
}

/// First 400 characters of an error body, enough to classify it.
pub(crate) fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= 400 {
        trimmed.to_string()
    } else {
        let mut s: String = trimmed.chars().take(400).collect();
        s.push('…');
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SummaryRequest {
        SummaryRequest {
            title: "Sparse Routing".to_string(),
            abstract_text: "We route tokens.".to_string(),
            authors: vec!["Doe, J.".to_string()],
            categories: vec!["cs.LG".to_string()],
            published: None,
            context: String::new(),
        }
    }

    #[test]
    fn prompt_includes_title_abstract_and_format_markers() {
        let prompt = OpenAiSummarizer::build_prompt(&request());
        assert!(prompt.contains("タイトル: Sparse Routing"));
        assert!(prompt.contains("We route tokens."));
        assert!(prompt.contains("800~1000文字"));
        assert!(prompt.contains("<問題設定>"));
        assert!(prompt.contains("<結論>"));
        assert!(!prompt.contains("本文からの抜粋"));
    }

    #[test]
    fn prompt_appends_pdf_context_when_present() {
        let mut req = request();
        req.context = "=== 序論・はじめに ===\nRouting matters.".to_string();
        let prompt = OpenAiSummarizer::build_prompt(&req);
        assert!(prompt.contains("本文からの抜粋"));
        assert!(prompt.contains("Routing matters."));
    }

    #[test]
    fn response_parses_down_to_the_first_choice() {
        let raw = r#"{"id":"cmpl-1","choices":[{"index":0,"message":{"role":"assistant","content":"要約テキスト"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "要約テキスト");
    }

    #[test]
    fn snippet_truncates_long_bodies_on_char_boundaries() {
        let long = "え".repeat(900);
        let s = snippet(&long);
        assert_eq!(s.chars().count(), 401);
        assert!(s.ends_with('…'));
        assert_eq!(snippet("short"), "short");
    }
}
