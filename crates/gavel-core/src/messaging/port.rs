use async_trait::async_trait;

use crate::{domain::ChatId, messaging::types::InlineKeyboard, Result};

/// Cross-messenger port.
///
/// Telegram is the first implementation; the shape is the minimal surface the
/// bid workflow needs, so tests can run against an in-memory fake.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Plain text, no parse mode.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// MarkdownV2 text; callers are responsible for escaping dynamic parts
    /// (see `formatting::escape_markdown`).
    async fn send_markdown(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()>;

    /// Photo by URL with a plain-text caption.
    async fn send_photo(&self, chat_id: ChatId, photo_url: &str, caption: &str) -> Result<()>;

    /// Plain text with inline buttons.
    async fn send_keyboard(&self, chat_id: ChatId, text: &str, keyboard: InlineKeyboard)
        -> Result<()>;
}
