//! Gemini generateContent provider
//!
//! Unlike the chat-completions provider, the whole instruction lives in a
//! single prompt, enriched with paper metadata and any extracted PDF
//! sections. The five-point analysis format is emitted directly in Slack
//! markup so the composer can pass it through untouched.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use common::LlmConfig;

use crate::openai::snippet;
use crate::provider::{Summarizer, SummaryRequest};

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_MODEL: &str = "models/gemini-1.5-pro-latest";

pub struct GeminiSummarizer {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiSummarizer {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            http,
            base_url: GEMINI_API_URL.to_string(),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn build_prompt(request: &SummaryRequest) -> String {
        let authors = if request.authors.is_empty() {
            "不明".to_string()
        } else {
            request.authors.join(", ")
        };
        let published = match request.published {
            Some(date) => date.format("%Y年%m月%d日").to_string(),
            None => "不明".to_string(),
        };
        let categories = if request.categories.is_empty() {
            "不明".to_string()
        } else {
            request.categories.join(", ")
        };

        let mut prompt = format!(
            "あなたは論文解析の専門家です。以下の論文を日本語で分析し、要点を整理して出力してください。\n\n\
             【論文情報】\n\
             タイトル: {}\n\
             著者: {}\n\
             公開日: {}\n\
             カテゴリ: {}\n\n\
             【アブストラクト】\n{}\n",
            request.title, authors, published, categories, request.abstract_text
        );
        if !request.context.is_empty() {
            prompt.push_str("\n【本文からの抜粋】\n");
            prompt.push_str(&request.context);
            prompt.push('\n');
        }
        prompt.push_str(
            "\n【分析指示】\n\
             以下の5つの観点から論文を分析し、各項目80～120文字で簡潔にまとめてください。\n\
             専門用語は必要に応じて分かりやすく説明を加えてください。\n\n\
             1. 📄 研究概要: この論文が何について研究しているのか、全体像を一言で要約\n\
             2. 🎯 解決する課題: どのような問題や課題に取り組んでいるのか\n\
             3. 💡 提案手法: 問題解決のためにどのような新しいアプローチや手法を提案しているのか\n\
             4. 📊 主要な結果: 実験や検証でどのような成果が得られたのか（数値があれば含める）\n\
             5. 📝 意義・インパクト: この研究が学術界や実社会にどのような影響を与えるのか\n\n\
             【出力形式】\n\
             Slack形式で出力してください（太文字は *テキスト* で表現、区切り線は --- を使用）\n\n\
             *📄 研究概要*\n[内容]\n\n---\n\n\
             *🎯 解決する課題*\n[内容]\n\n---\n\n\
             *💡 提案手法*\n[内容]\n\n---\n\n\
             *📊 主要な結果*\n[内容]\n\n---\n\n\
             *📝 意義・インパクト*\n[内容]\n\n\
             【注意事項】\n\
             - 各項目は独立して理解できるように記述\n\
             - 専門用語には簡潔な説明を併記\n\
             - 客観的かつ正確な情報のみを記述\n\
             - 初学者にも理解できるように配慮\n\
             - 推測や憶測は避ける",
        );
        prompt
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    fn label(&self) -> &str {
        "Gemini"
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        let body = serde_json::json!({
            "contents": [
                {"parts": [{"text": Self::build_prompt(request)}]}
            ],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            },
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error: HTTP {} {}", status, snippet(&text)));
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(anyhow!("Gemini response contained no candidate text"));
        }
        Ok(text)
    }
}
