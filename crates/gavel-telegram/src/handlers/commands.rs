use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;

use gavel_core::{
    admin,
    domain::{ChatId, LotId, UserId},
    messaging::{
        port::MessagingPort,
        types::{InlineButton, InlineKeyboard},
    },
};

use crate::router::AppState;

use super::{report_error, resolve_actor};

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

/// Deep-link payload from the companion app: `bid_<lot>[_<amount>]`.
///
/// The lot id is mandatory; a suggested amount that does not parse is
/// dropped rather than rejecting the whole link.
fn parse_bid_payload(payload: &str) -> Option<(LotId, Option<f64>)> {
    let parts: Vec<&str> = payload.split('_').collect();
    if parts.len() < 3 {
        return None;
    }

    let lot = parts[1].parse::<i64>().ok()?;
    let amount = parts[2]
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|a| a.is_finite() && *a > 0.0);

    Some((LotId(lot), amount))
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(raw) = msg.text() else {
        return Ok(());
    };

    let chat_id = ChatId(msg.chat.id.0);
    let (cmd, args) = parse_command(raw);

    match cmd.as_str() {
        "start" => {
            let payload = args.split_whitespace().next().unwrap_or("");
            if payload.starts_with("bid_") {
                match parse_bid_payload(payload) {
                    Some((lot_id, amount)) => {
                        info!(lot = lot_id.0, user = user.id.0, "bid deep link");
                        let actor = resolve_actor(&state, user).await;
                        if let Err(err) =
                            state.workflow.start_bid(chat_id, &actor, lot_id, amount).await
                        {
                            report_error(&state, chat_id, "start_bid", err).await;
                        }
                    }
                    None => {
                        let _ = state
                            .messenger
                            .send_text(chat_id, "❌ Неверный формат ссылки")
                            .await;
                    }
                }
                return Ok(());
            }

            let keyboard = InlineKeyboard::single(InlineButton::web_app(
                "🌐 Открыть веб-приложение",
                state.cfg.web_app_url.clone(),
            ));
            let _ = state
                .messenger
                .send_keyboard(
                    chat_id,
                    "Добро пожаловать! Для доступа к веб-приложению нажмите кнопку ниже:",
                    keyboard,
                )
                .await;
        }
        "notify" => {
            let caller = UserId(user.id.0 as i64);
            match admin::send_direct(state.cfg.as_ref(), state.messenger.as_ref(), caller, &args)
                .await
            {
                Ok(reply) => {
                    let _ = state.messenger.send_text(chat_id, &reply).await;
                }
                Err(err) => report_error(&state, chat_id, "notify", err).await,
            }
        }
        _ => {}
    }

    Ok(())
}
