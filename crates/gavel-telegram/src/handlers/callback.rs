use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;

use gavel_core::domain::{ChatId, LotId};

use crate::router::AppState;

use super::{report_error, resolve_actor};

/// `raise_bet_<lot>` buttons attached to outbid notifications.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let data = q.data.clone().unwrap_or_default();
    let chat = q.message.as_ref().map(|m| m.chat.id);

    // Acknowledge the press first so the client stops its spinner.
    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some(chat) = chat else {
        return Ok(());
    };
    let Some(lot) = data
        .strip_prefix("raise_bet_")
        .and_then(|s| s.parse::<i64>().ok())
    else {
        return Ok(());
    };

    let chat_id = ChatId(chat.0);
    let _guard = state.chat_locks.lock_chat(chat.0).await;

    info!(lot, user = q.from.id.0, "raise button pressed");
    let actor = resolve_actor(&state, &q.from).await;
    if let Err(err) = state
        .workflow
        .start_bid(chat_id, &actor, LotId(lot), None)
        .await
    {
        report_error(&state, chat_id, "raise_bet", err).await;
    }

    Ok(())
}
