//! Slack Block Kit message model and the per-paper composer
//!
//! The block enums serialize straight into the webhook payload shape, so
//! there is no separate render step. The composer is pure: a missing link
//! narrows the link section instead of failing the message.

use serde::{Deserialize, Serialize};

use common::{Paper, SummarizedPaper};

/// A Block Kit text object. Headers require `plain_text`, sections speak
/// `mrkdwn`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String, emoji: bool },
    Mrkdwn { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: TextObject,
    },
    Section {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<TextObject>>,
    },
    Divider,
}

impl Block {
    pub fn header(text: impl Into<String>) -> Self {
        Block::Header {
            text: TextObject::PlainText {
                text: text.into(),
                emoji: true,
            },
        }
    }

    pub fn section(text: impl Into<String>) -> Self {
        Block::Section {
            text: Some(TextObject::Mrkdwn { text: text.into() }),
            fields: None,
        }
    }

    /// Two-column field layout, e.g. author/category pairs.
    pub fn fields_section(fields: Vec<TextObject>) -> Self {
        Block::Section {
            text: None,
            fields: Some(fields),
        }
    }
}

/// The webhook payload: an ordered block list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackMessage {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Default)]
pub struct MessageComposer;

impl MessageComposer {
    pub fn new() -> Self {
        Self
    }

    /// Block order is fixed: header, content section(s), link section,
    /// divider. A failure notice keeps the abstract visible underneath it
    /// so the reader still learns what the paper is about.
    pub fn compose(&self, item: &SummarizedPaper) -> SlackMessage {
        let paper = &item.paper;
        let mut blocks = vec![Block::header(paper.cleaned_title())];

        match &item.summary {
            Some(summary) if !summary.is_error => {
                blocks.push(Block::section(format!(
                    "*{}による要約:*\n{}",
                    summary.provider, summary.text
                )));
            }
            Some(notice) => {
                blocks.push(Block::section(notice.text.clone()));
                blocks.push(Block::section(format!(
                    "*概要:*\n{}",
                    paper.cleaned_summary()
                )));
            }
            None => {
                blocks.push(Block::section(format!(
                    "*概要:*\n{}",
                    paper.cleaned_summary()
                )));
            }
        }

        blocks.push(Block::section(link_line(paper)));
        blocks.push(Block::Divider);
        SlackMessage { blocks }
    }
}

fn link_line(paper: &Paper) -> String {
    match &paper.pdf_url {
        Some(pdf) => format!("*論文リンク:* <{pdf}|PDF> | <{}|arXiv>", paper.entry_url),
        None => format!("*論文リンク:* <{}|arXiv>", paper.entry_url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::PaperSummary;

    fn paper() -> Paper {
        Paper {
            id: "2501.01234v1".to_string(),
            title: "Sparse  Routing\n in Transformers".to_string(),
            summary: "We study\nlearned routing.".to_string(),
            authors: vec!["Doe, J.".to_string()],
            categories: vec!["cs.LG".to_string()],
            published: None,
            entry_url: "https://arxiv.org/abs/2501.01234v1".to_string(),
            pdf_url: Some("https://arxiv.org/pdf/2501.01234.pdf".to_string()),
        }
    }

    fn section_text(block: &Block) -> &str {
        match block {
            Block::Section {
                text: Some(TextObject::Mrkdwn { text }),
                fields: None,
            } => text,
            other => panic!("expected a mrkdwn section, got {other:?}"),
        }
    }

    #[test]
    fn unsummarized_paper_yields_header_abstract_link_divider() {
        let message = MessageComposer::new().compose(&SummarizedPaper::untouched(paper()));

        assert_eq!(message.blocks.len(), 4);
        match &message.blocks[0] {
            Block::Header {
                text: TextObject::PlainText { text, emoji },
            } => {
                assert_eq!(text, "Sparse Routing in Transformers");
                assert!(*emoji);
            }
            other => panic!("expected a header, got {other:?}"),
        }
        assert_eq!(
            section_text(&message.blocks[1]),
            "*概要:*\nWe study learned routing."
        );
        assert_eq!(
            section_text(&message.blocks[2]),
            "*論文リンク:* <https://arxiv.org/pdf/2501.01234.pdf|PDF> | <https://arxiv.org/abs/2501.01234v1|arXiv>"
        );
        assert_eq!(message.blocks[3], Block::Divider);
    }

    #[test]
    fn genuine_summary_replaces_the_abstract_section() {
        let item = SummarizedPaper {
            paper: paper(),
            summary: Some(PaperSummary::generated(
                "ChatGPT".to_string(),
                "<問題設定>\nルーティングの無駄".to_string(),
            )),
        };
        let message = MessageComposer::new().compose(&item);

        assert_eq!(message.blocks.len(), 4);
        let content = section_text(&message.blocks[1]);
        assert!(content.starts_with("*ChatGPTによる要約:*\n"));
        assert!(content.contains("ルーティングの無駄"));
        assert!(!content.contains("概要"));
    }

    #[test]
    fn failure_notice_keeps_the_abstract_as_fallback() {
        let item = SummarizedPaper {
            paper: paper(),
            summary: Some(PaperSummary::failure(
                "Gemini".to_string(),
                "Gemini APIの利用制限に達したため、要約を生成できませんでした。".to_string(),
            )),
        };
        let message = MessageComposer::new().compose(&item);

        assert_eq!(message.blocks.len(), 5);
        assert!(section_text(&message.blocks[1]).starts_with("※"));
        assert!(section_text(&message.blocks[2]).starts_with("*概要:*\n"));
    }

    #[test]
    fn missing_pdf_link_narrows_the_link_section() {
        let mut p = paper();
        p.pdf_url = None;
        let message = MessageComposer::new().compose(&SummarizedPaper::untouched(p));

        let link = section_text(&message.blocks[2]);
        assert!(!link.contains("|PDF>"));
        assert!(link.contains("|arXiv>"));
    }

    #[test]
    fn blocks_serialize_to_the_block_kit_wire_shape() {
        let message = MessageComposer::new().compose(&SummarizedPaper::untouched(paper()));
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["blocks"][0]["type"], "header");
        assert_eq!(value["blocks"][0]["text"]["type"], "plain_text");
        assert_eq!(value["blocks"][0]["text"]["emoji"], true);
        assert_eq!(value["blocks"][1]["type"], "section");
        assert_eq!(value["blocks"][1]["text"]["type"], "mrkdwn");
        assert!(value["blocks"][1].get("fields").is_none());
        assert_eq!(value["blocks"][3]["type"], "divider");
    }

    #[test]
    fn field_sections_serialize_without_a_text_object() {
        let block = Block::fields_section(vec![
            TextObject::Mrkdwn {
                text: "*著者:*\nDoe, J.".to_string(),
            },
            TextObject::Mrkdwn {
                text: "*カテゴリ:*\ncs.LG".to_string(),
            },
        ]);
        let value = serde_json::to_value(&block).unwrap();

        assert_eq!(value["type"], "section");
        assert!(value.get("text").is_none());
        assert_eq!(value["fields"].as_array().unwrap().len(), 2);
        assert_eq!(value["fields"][0]["type"], "mrkdwn");
    }
}
