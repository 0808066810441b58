//! Slack delivery: Block Kit message model, composer, webhook client and
//! the fallback translator used when no LLM provider is active.

pub mod message;
pub mod slack;
pub mod translate;

pub use message::{Block, MessageComposer, SlackMessage, TextObject};
pub use slack::WebhookSender;
pub use translate::Translator;
