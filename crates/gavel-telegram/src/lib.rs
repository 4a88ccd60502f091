//! Telegram adapter (teloxide).
//!
//! This crate implements the `gavel-core` MessagingPort over the Telegram
//! Bot API and owns the update dispatcher.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode, WebAppInfo},
};

use tokio::time::sleep;
use tracing::warn;
use url::Url;

pub mod handlers;
pub mod router;

use gavel_core::{
    domain::{ChatId, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ButtonAction, InlineKeyboard},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Messenger(format!("telegram error: {e}"))
    }

    fn markup(keyboard: InlineKeyboard) -> Result<InlineKeyboardMarkup> {
        let mut rows = Vec::new();
        for button in keyboard.buttons {
            let btn = match button.action {
                ButtonAction::Callback(data) => InlineKeyboardButton::callback(button.label, data),
                ButtonAction::WebApp(url) => {
                    let url = Url::parse(&url)
                        .map_err(|e| Error::Messenger(format!("bad web app url {url}: {e}")))?;
                    InlineKeyboardButton::web_app(button.label, WebAppInfo { url })
                }
            };
            rows.push(vec![btn]);
        }
        Ok(InlineKeyboardMarkup::new(rows))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }

    /// First profile photo (largest size), if the user has one. Failures
    /// degrade to `None`: the photo only decorates the user's store row.
    pub async fn profile_photo(&self, user_id: UserId) -> Option<String> {
        let req = self
            .bot
            .get_user_profile_photos(teloxide::types::UserId(user_id.0 as u64))
            .limit(1);
        match req.await {
            Ok(photos) => photos
                .photos
                .first()
                .and_then(|sizes| sizes.last())
                .map(|p| p.file.id.clone()),
            Err(e) => {
                warn!(user = user_id.0, error = %e, "profile photo lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.with_retry(|| self.bot.send_message(Self::tg_chat(chat_id), text.to_string()))
            .await?;
        Ok(())
    }

    async fn send_markdown(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()> {
        let markup = keyboard.map(Self::markup).transpose()?;
        self.with_retry(|| {
            let mut req = self
                .bot
                .send_message(Self::tg_chat(chat_id), text.to_string())
                .parse_mode(ParseMode::MarkdownV2);
            if let Some(m) = markup.clone() {
                req = req.reply_markup(m);
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: ChatId, photo_url: &str, caption: &str) -> Result<()> {
        let url = Url::parse(photo_url)
            .map_err(|e| Error::Messenger(format!("bad photo url {photo_url}: {e}")))?;
        self.with_retry(|| {
            self.bot
                .send_photo(Self::tg_chat(chat_id), InputFile::url(url.clone()))
                .caption(caption.to_string())
        })
        .await?;
        Ok(())
    }

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<()> {
        let markup = Self::markup(keyboard)?;
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat_id), text.to_string())
                .reply_markup(markup.clone())
        })
        .await?;
        Ok(())
    }
}
