//! arXiv search client
//!
//! Talks to the public Atom search API:
//! - Boolean query over category codes, optionally narrowed by keyword hints
//! - Pages of at most 50 entries, newest submissions first
//! - Linear backoff retries with substring-based failure classification
//! - A soft per-attempt deadline; entries already collected are returned
//!   rather than discarded when it passes

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use common::{normalize_ws, strip_version, ArxivConfig, Paper};

pub const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

/// Hard cap on entries requested per network call, independent of caller
/// intent.
const PAGE_CAP: usize = 50;

/// Hints beyond the first three only narrow recall, so they are ignored.
const MAX_KEYWORD_HINTS: usize = 3;

const USER_AGENT: &str = "daily-digest/0.1";

/// Terminal search failure. An empty result list is a valid outcome, not an
/// error.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("arXiv search gave up after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },
}

/// Coarse failure class. Decides the backoff wait, never whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Network,
    RateLimit,
    Generic,
}

/// Classify an error by case-insensitive substring of its rendered chain.
pub fn classify_failure(message: &str) -> FailureClass {
    let lower = message.to_lowercase();
    if lower.contains("rate limit") || lower.contains("quota") {
        FailureClass::RateLimit
    } else if lower.contains("connection") || lower.contains("timeout") {
        FailureClass::Network
    } else {
        FailureClass::Generic
    }
}

/// Wait before the upcoming attempt (1-based). Linear in the attempt number,
/// except rate-limited calls always wait two base units.
pub fn backoff_delay(next_attempt: u32, class: FailureClass, base: Duration) -> Duration {
    match class {
        FailureClass::RateLimit => base * 2,
        _ => base * next_attempt,
    }
}

/// Build the `search_query` expression, e.g.
/// `(cat:cs.AI OR cat:cs.LG) AND (all:"agents" OR all:"planning")`.
pub fn build_query(categories: &[String], keyword_hints: &[String]) -> String {
    let mut parts: Vec<String> = Vec::new();

    let cats: Vec<String> = categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| format!("cat:{c}"))
        .collect();
    if cats.len() == 1 {
        parts.push(cats.into_iter().next().unwrap_or_default());
    } else if !cats.is_empty() {
        parts.push(format!("({})", cats.join(" OR ")));
    }

    let hints: Vec<String> = keyword_hints
        .iter()
        .map(|h| h.trim())
        .filter(|h| !h.is_empty())
        .take(MAX_KEYWORD_HINTS)
        .map(|h| format!("all:\"{}\"", h.replace('"', "")))
        .collect();
    if hints.len() == 1 {
        parts.push(hints.into_iter().next().unwrap_or_default());
    } else if !hints.is_empty() {
        parts.push(format!("({})", hints.join(" OR ")));
    }

    if parts.is_empty() {
        "all:*".to_string()
    } else {
        parts.join(" AND ")
    }
}

pub struct ArxivClient {
    http: Client,
    base_url: String,
    config: ArxivConfig,
}

impl ArxivClient {
    pub fn new(config: &ArxivConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.attempt_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: ARXIV_API_URL.to_string(),
            config: config.clone(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Search the newest submissions in the given categories.
    ///
    /// `limit` bounds the raw entries collected per attempt; each network
    /// call asks for at most 50. At most the first three keyword hints
    /// narrow the query. Partial results are returned when the soft attempt
    /// deadline passes mid-collection.
    pub async fn fetch(
        &self,
        categories: &[String],
        limit: usize,
        keyword_hints: &[String],
    ) -> Result<Vec<Paper>, SearchError> {
        let query = build_query(categories, keyword_hints);
        let base = Duration::from_secs(self.config.retry_delay_secs);
        let mut last_error = String::new();

        for attempt in 1..=self.config.max_retries {
            match self.fetch_attempt(&query, limit).await {
                Ok(mut papers) => {
                    sort_newest_first(&mut papers);
                    info!(
                        "✅ Fetched {} papers from arXiv on attempt {}",
                        papers.len(),
                        attempt
                    );
                    return Ok(papers);
                }
                Err(err) => {
                    last_error = format!("{err:#}");
                    let class = classify_failure(&last_error);
                    warn!(
                        "arXiv fetch attempt {}/{} failed ({:?}): {}",
                        attempt, self.config.max_retries, class, last_error
                    );
                    if attempt < self.config.max_retries {
                        let wait = backoff_delay(attempt + 1, class, base);
                        debug!("Waiting {:?} before attempt {}", wait, attempt + 1);
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }

        Err(SearchError::RetryExhausted {
            attempts: self.config.max_retries,
            last_error,
        })
    }

    /// One attempt: page through the feed until `limit` entries, feed
    /// exhaustion, or the soft deadline.
    async fn fetch_attempt(&self, query: &str, limit: usize) -> Result<Vec<Paper>> {
        let deadline = Instant::now() + Duration::from_secs(self.config.attempt_timeout_secs);
        let mut collected: Vec<Paper> = Vec::new();
        let mut start = 0usize;

        while collected.len() < limit {
            if Instant::now() >= deadline {
                warn!(
                    "Attempt deadline passed with {} of {} entries, keeping what we have",
                    collected.len(),
                    limit
                );
                break;
            }
            let page = page_size(limit - collected.len());
            let body = self.request_page(query, start, page).await?;
            let papers = parse_atom_feed(&body)?;
            let fetched = papers.len();
            for paper in papers {
                collected.push(paper);
                if collected.len() >= limit {
                    break;
                }
            }
            if fetched < page {
                break;
            }
            start += fetched;
        }
        Ok(collected)
    }

    async fn request_page(&self, query: &str, start: usize, page: usize) -> Result<String> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("search_query", query)])
            .query(&[("start", start), ("max_results", page)])
            .query(&[("sortBy", "submittedDate"), ("sortOrder", "descending")])
            .header(
                ACCEPT,
                "application/atom+xml, application/xml;q=0.9, text/xml;q=0.8",
            )
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
            // arXiv throttles with 503; the retry classifier keys on this wording
            return Err(anyhow!("arXiv rate limit exceeded: HTTP {}", status));
        }
        if !status.is_success() {
            return Err(anyhow!("arXiv API error: HTTP {}", status));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !(content_type.contains("xml") || content_type.contains("atom")) {
            return Err(anyhow!(
                "arXiv API unexpected content-type: {}",
                content_type
            ));
        }
        Ok(response.text().await?)
    }
}

fn page_size(remaining: usize) -> usize {
    remaining.min(PAGE_CAP)
}

/// Newest submission first; entries without a timestamp sink to the end.
fn sort_newest_first(papers: &mut [Paper]) {
    papers.sort_by(|a, b| b.published.cmp(&a.published));
}

fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(ix) => &name[ix + 1..],
        None => name,
    }
}

/// `http://arxiv.org/abs/2501.01234v1` -> `2501.01234v1`, keeping the
/// version suffix and any legacy archive prefix (`cs/9901001v1`).
fn entry_id(id_url: &str) -> String {
    let tail = match id_url.find("/abs/") {
        Some(ix) => &id_url[ix + 5..],
        None => id_url,
    };
    let tail = tail.trim();
    tail.strip_prefix("arXiv:").unwrap_or(tail).to_string()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Default)]
struct EntryState {
    in_entry: bool,
    in_author: bool,
    text: String,
    id_url: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    categories: Vec<String>,
    alt_url: Option<String>,
    pdf_url: Option<String>,
}

impl EntryState {
    fn finish(&self) -> Paper {
        let id = entry_id(&self.id_url);
        let entry_url = match &self.alt_url {
            Some(url) => url.clone(),
            None => format!("https://arxiv.org/abs/{id}"),
        };
        let pdf_url = self
            .pdf_url
            .clone()
            .or_else(|| Some(format!("https://arxiv.org/pdf/{}.pdf", strip_version(&id))));
        Paper {
            id,
            title: self.title.clone(),
            summary: self.summary.clone(),
            authors: self.authors.clone(),
            categories: self.categories.clone(),
            published: parse_timestamp(&self.published),
            entry_url,
            pdf_url,
        }
    }
}

fn collect_category(e: &BytesStart<'_>, categories: &mut Vec<String>) {
    for a in e.attributes().flatten() {
        if a.key.as_ref() == b"term" {
            if let Ok(value) = a.unescape_value() {
                if !value.trim().is_empty() {
                    categories.push(value.to_string());
                }
            }
        }
    }
}

fn collect_link(e: &BytesStart<'_>, state: &mut EntryState) {
    let mut rel = None;
    let mut href = None;
    let mut kind = None;
    let mut title = None;
    for a in e.attributes().flatten() {
        let key = String::from_utf8_lossy(a.key.as_ref()).to_string();
        let value = a.unescape_value().map(|v| v.to_string()).unwrap_or_default();
        match key.as_str() {
            "rel" => rel = Some(value),
            "href" => href = Some(value),
            "type" => kind = Some(value),
            "title" => title = Some(value),
            _ => {}
        }
    }
    if let Some(href) = href {
        let is_pdf = kind.as_deref().unwrap_or("").contains("pdf")
            || title
                .as_deref()
                .map(|t| t.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false);
        if rel.as_deref() == Some("alternate") && state.alt_url.is_none() {
            state.alt_url = Some(href);
        } else if is_pdf && state.pdf_url.is_none() {
            state.pdf_url = Some(href);
        }
    }
}

/// Parse an Atom feed into papers. Namespace prefixes are stripped before
/// tag dispatch; self-closing `link`/`category` elements arrive as `Empty`
/// events and are handled the same as open tags.
fn parse_atom_feed(xml: &str) -> Result<Vec<Paper>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut papers: Vec<Paper> = Vec::new();
    let mut cur = EntryState::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match local_name(&name) {
                    "entry" => {
                        cur = EntryState {
                            in_entry: true,
                            ..EntryState::default()
                        };
                    }
                    "author" if cur.in_entry => cur.in_author = true,
                    "category" if cur.in_entry => collect_category(&e, &mut cur.categories),
                    "link" if cur.in_entry => collect_link(&e, &mut cur),
                    _ => {}
                }
                cur.text.clear();
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match local_name(&name) {
                    "category" if cur.in_entry => collect_category(&e, &mut cur.categories),
                    "link" if cur.in_entry => collect_link(&e, &mut cur),
                    _ => {}
                }
            }
            Ok(Event::Text(t)) => {
                if cur.in_entry {
                    let txt = t.unescape().map(|t| t.to_string()).unwrap_or_default();
                    cur.text.push_str(&txt);
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if cur.in_entry {
                    let text = normalize_ws(&cur.text);
                    match local_name(&name) {
                        "id" => cur.id_url = text,
                        "title" => cur.title = text,
                        "summary" => cur.summary = text,
                        "published" => cur.published = text,
                        "name" if cur.in_author => {
                            if !text.is_empty() {
                                cur.authors.push(text);
                            }
                        }
                        "author" => cur.in_author = false,
                        "entry" => {
                            cur.in_entry = false;
                            papers.push(cur.finish());
                        }
                        _ => {}
                    }
                    cur.text.clear();
                }
            }
            Err(e) => return Err(anyhow!("Atom feed parse error: {}", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(papers)
}
