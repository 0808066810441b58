//! Title and abstract translation fallback
//!
//! Used only when no LLM provider is active; a generated summary is already
//! in the target language, so translating underneath it would be wasted
//! work. Talks to the public single-phrase endpoint and treats every
//! failure as "keep the original text".

use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use common::{Paper, TranslationConfig};

pub const TRANSLATE_API_URL: &str = "https://translate.googleapis.com/translate_a/single";

pub struct Translator {
    http: Client,
    base_url: String,
    target_lang: String,
}

impl Translator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            base_url: TRANSLATE_API_URL.to_string(),
            target_lang: config.target_lang.clone(),
        })
    }

    /// Point at a different endpoint, e.g. a local test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Derive a paper whose title and abstract are translated. Per-field
    /// failures keep that field's original text.
    pub async fn translate_paper(&self, paper: Paper) -> Paper {
        let mut out = paper;
        out.title = self.translate(&out.cleaned_title()).await;
        out.summary = self.translate(&out.cleaned_summary()).await;
        info!("Translated title and abstract into {}", self.target_lang);
        out
    }

    async fn translate(&self, text: &str) -> String {
        match self.try_translate(text).await {
            Ok(translated) => translated,
            Err(err) => {
                warn!("Translation failed, keeping the original text: {:#}", err);
                text.to_string()
            }
        }
    }

    async fn try_translate(&self, text: &str) -> Result<String> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", self.target_lang.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("translation endpoint returned HTTP {status}"));
        }
        let value: Value = response.json().await?;
        parse_translation(&value)
    }
}

/// The endpoint answers with nested arrays: element 0 holds the segments,
/// and each segment carries its translated text at index 0.
fn parse_translation(value: &Value) -> Result<String> {
    let segments = value
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("unexpected translation response shape"))?;
    let mut out = String::new();
    for segment in segments {
        if let Some(piece) = segment.get(0).and_then(Value::as_str) {
            out.push_str(piece);
        }
    }
    if out.is_empty() {
        return Err(anyhow!("translation response contained no text"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_are_concatenated_in_order() {
        let raw = r#"[
            [
                ["ルーティングを研究する。", "We study routing.", null, null, 10],
                ["効率が向上する。", "Efficiency improves.", null, null, 3]
            ],
            null,
            "en"
        ]"#;
        let value: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parse_translation(&value).unwrap(),
            "ルーティングを研究する。効率が向上する。"
        );
    }

    #[test]
    fn unexpected_shapes_are_rejected() {
        assert!(parse_translation(&Value::Null).is_err());
        assert!(parse_translation(&serde_json::json!([])).is_err());
        assert!(parse_translation(&serde_json::json!([[]])).is_err());
    }
}
