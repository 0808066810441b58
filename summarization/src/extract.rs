//! PDF section mining for richer prompts
//!
//! Downloads the paper PDF and pulls a handful of high-signal fragments
//! out of the raw text: keyword lists, the usual section bodies and
//! figure/table captions. Extraction is strictly best-effort; any failure
//! collapses to an empty context and the abstract-only prompt still goes out.

use std::time::Duration;

use anyhow::{anyhow, Result};
use regex::Regex;
use reqwest::Client;
use tracing::{debug, warn};

use common::{normalize_ws, Paper};

const SECTION_BUDGET: usize = 500;
const CONTEXT_BUDGET: usize = 6_000;
const MAX_KEYWORDS: usize = 5;
const CAPTIONS_PER_KIND: usize = 2;
const CAPTION_BUDGET: usize = 200;

const INTRO_HEADINGS: &[&str] = &["introduction", r"1\.", "はじめに", "序論"];
const METHOD_HEADINGS: &[&str] = &["method", "approach", "手法", "方法", "methodology"];
const RESULT_HEADINGS: &[&str] = &["result", "experiment", "実験", "結果", "evaluation"];
const CONCLUSION_HEADINGS: &[&str] = &["conclusion", "discussion", "結論", "考察", "まとめ"];

pub struct SectionExtractor {
    http: Client,
}

impl SectionExtractor {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http })
    }

    /// Fetch the PDF and mine it for context. Failures are logged and
    /// collapse to an empty string so the caller needs no error handling.
    pub async fn extract(&self, paper: &Paper) -> String {
        match self.try_extract(paper).await {
            Ok(context) => context,
            Err(err) => {
                warn!("PDF extraction skipped for {}: {:#}", paper.id, err);
                String::new()
            }
        }
    }

    async fn try_extract(&self, paper: &Paper) -> Result<String> {
        let pdf_url = paper
            .pdf_url
            .as_deref()
            .ok_or_else(|| anyhow!("paper has no PDF link"))?;
        debug!("Downloading PDF from {pdf_url}");

        let response = self.http.get(pdf_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("PDF download failed: HTTP {status}"));
        }
        let bytes = response.bytes().await?;

        // pdf_extract's error type is not Send + Sync, so stringify it here.
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|err| anyhow!("PDF text extraction failed: {err}"))?;
        Ok(build_context(&text))
    }
}

/// Assemble the extracted fragments into labelled `===` blocks, capped at
/// the overall context budget. Returns an empty string when nothing at all
/// could be mined from the text.
fn build_context(text: &str) -> String {
    let mut out = String::new();

    if let Some(keywords) = extract_keywords(text) {
        out.push_str("=== キーワード ===\n");
        out.push_str(&keywords);
        out.push_str("\n\n");
    }
    for (label, headings) in [
        ("序論・はじめに", INTRO_HEADINGS),
        ("手法・アプローチ", METHOD_HEADINGS),
        ("実験結果", RESULT_HEADINGS),
        ("結論・考察", CONCLUSION_HEADINGS),
    ] {
        if let Some(body) = extract_section(text, headings) {
            out.push_str(&format!("=== {label} ===\n{body}\n\n"));
        }
    }
    let captions = extract_captions(text);
    if !captions.is_empty() {
        out.push_str("=== 図表情報 ===\n");
        for (i, caption) in captions.iter().enumerate() {
            out.push_str(&format!("{}. {caption}\n", i + 1));
        }
        out.push('\n');
    }

    truncate_chars(out.trim_end(), CONTEXT_BUDGET)
}

/// Find the first heading line matching any of the given keywords and return
/// the text that follows it, up to the next numbered heading, whitespace
/// collapsed and truncated to the per-section budget.
fn extract_section(text: &str, headings: &[&str]) -> Option<String> {
    let next_heading = Regex::new(r"(?m)^\s*\d+\.?\s+[A-Za-z]").ok()?;
    for keyword in headings {
        let pattern = format!(r"(?im)^[ \t]*(?:\d+\.?\s*)?{keyword}[^\n]*\n");
        let Ok(heading) = Regex::new(&pattern) else {
            continue;
        };
        let Some(found) = heading.find(text) else {
            continue;
        };
        let rest = &text[found.end()..];
        let body = match next_heading.find(rest) {
            Some(next) => &rest[..next.start()],
            None => rest,
        };
        let body = normalize_ws(body);
        if body.is_empty() {
            continue;
        }
        return Some(truncate_chars(&body, SECTION_BUDGET));
    }
    None
}

/// Pull up to five terms from a `Keywords:` style line, joined with commas.
fn extract_keywords(text: &str) -> Option<String> {
    let pattern = Regex::new(r"(?i)(?:keywords?|index terms?|キーワード)[:：\s]*([^\n.]+)").ok()?;
    let caps = pattern.captures(text)?;
    let terms: Vec<&str> = caps
        .get(1)?
        .as_str()
        .split(|c| matches!(c, ',' | ';' | '、'))
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .take(MAX_KEYWORDS)
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(", "))
    }
}

/// Collect figure captions then table captions, at most two of each.
fn extract_captions(text: &str) -> Vec<String> {
    let kinds = [
        r"(?i)(?:figure|fig\.?|図)\s*\d+[:.]?\s*[^\n]+",
        r"(?i)(?:table|表)\s*\d+[:.]?\s*[^\n]+",
    ];
    let mut captions = Vec::new();
    for pattern in kinds {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        for found in re.find_iter(text).take(CAPTIONS_PER_KIND) {
            captions.push(truncate_chars(&normalize_ws(found.as_str()), CAPTION_BUDGET));
        }
    }
    captions
}

/// Truncate on a character boundary; byte slicing would split multibyte text.
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    text.chars().take(limit).collect()
}
