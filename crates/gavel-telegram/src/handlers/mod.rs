//! Telegram update handlers.
//!
//! Each handler resolves the actor, hands the event to the core workflow,
//! and maps the error taxonomy to a chat reply in one place
//! (`report_error`).

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};
use tracing::error;

use gavel_core::{
    domain::{ChatId, UserId},
    messaging::port::MessagingPort,
    workflow::Actor,
    Error,
};

use crate::router::AppState;

mod callback;
mod commands;
mod text;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        // Only text drives the bid workflow; other message kinds are ignored.
        return Ok(());
    };

    // Serialize per chat so one conversation cannot interleave its own
    // workflow steps.
    let _guard = state.chat_locks.lock_chat(msg.chat.id.0).await;

    if text.starts_with('/') {
        return commands::handle_command(msg, state).await;
    }
    text::handle_text(msg, state).await
}

/// Single mapping point from core errors to chat replies.
pub(crate) async fn report_error(state: &AppState, chat_id: ChatId, context: &str, err: Error) {
    error!(chat = chat_id.0, context, error = %err, "handler failed");
    if let Err(e) = state.messenger.send_text(chat_id, &err.user_message()).await {
        error!(chat = chat_id.0, error = %e, "failed to deliver error reply");
    }
}

/// Build the core actor from a Telegram user. The profile photo is fetched
/// here (best-effort) because only the adapter can reach the Bot API.
pub(crate) async fn resolve_actor(state: &AppState, user: &teloxide::types::User) -> Actor {
    let user_id = UserId(user.id.0 as i64);
    Actor {
        user_id,
        username: user.username.clone(),
        profile_image: state.messenger.profile_photo(user_id).await,
    }
}
