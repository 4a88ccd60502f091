use std::sync::Arc;

use teloxide::prelude::*;

use gavel_core::{
    domain::{ChatId, UserId},
    workflow::Actor,
};

use crate::router::AppState;

use super::report_error;

/// Free text while a session is open: an amount, a confirmation word, or a
/// phone number. The workflow decides which from the session state.
pub async fn handle_text(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if text.trim().is_empty() {
        return Ok(());
    }

    let chat_id = ChatId(msg.chat.id.0);
    // No profile photo here: free text never registers a new user.
    let actor = Actor {
        user_id: UserId(user.id.0 as i64),
        username: user.username.clone(),
        profile_image: None,
    };

    if let Err(err) = state.workflow.handle_text(chat_id, &actor, text).await {
        report_error(&state, chat_id, "handle_text", err).await;
    }

    Ok(())
}
