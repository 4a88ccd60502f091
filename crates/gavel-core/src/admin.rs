//! Admin direct-message command (`/notify <user_id> <message>`).
//!
//! Out-of-band: it never touches sessions or bets.

use crate::{
    config::Config,
    domain::{ChatId, UserId},
    errors::{Error, Rejection},
    messaging::port::MessagingPort,
    Result,
};

pub fn is_admin(cfg: &Config, user_id: UserId) -> bool {
    cfg.admin_chat_id == Some(user_id.0)
}

/// Send a message to a user on the admin's behalf; returns the reply text
/// for the admin. Non-admin callers and malformed targets are rejected
/// through the error taxonomy.
pub async fn send_direct(
    cfg: &Config,
    messenger: &dyn MessagingPort,
    caller: UserId,
    args: &str,
) -> Result<String> {
    if !is_admin(cfg, caller) {
        return Err(Error::Unauthorized);
    }

    let mut parts = args.trim().splitn(2, char::is_whitespace);
    let target = parts.next().unwrap_or("");
    let message = parts.next().unwrap_or("").trim();
    if target.is_empty() || message.is_empty() {
        return Ok("❌ Формат команды: /notify <user_id> <сообщение>".to_string());
    }

    let target: i64 = target
        .parse()
        .map_err(|_| Error::Rejected(Rejection::BadTarget))?;

    let text = format!("🔔 Сообщение от администратора:\n\n{message}");
    match messenger.send_text(ChatId(target), &text).await {
        Ok(()) => Ok(format!("✅ Сообщение отправлено пользователю {target}")),
        Err(e) => Ok(format!("❌ Ошибка отправки: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{config, FakeMessenger};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn non_admin_is_denied_and_nothing_is_sent() {
        let cfg = config(Some(500));
        let messenger = FakeMessenger::default();

        let err = send_direct(&cfg, &messenger, UserId(111), "222 привет")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
        assert!(messenger.all().is_empty());
    }

    #[tokio::test]
    async fn no_admin_configured_denies_everyone() {
        let cfg = config(None);
        let messenger = FakeMessenger::default();

        let err = send_direct(&cfg, &messenger, UserId(500), "222 привет")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
    }

    #[tokio::test]
    async fn malformed_target_is_rejected() {
        let cfg = config(Some(500));
        let messenger = FakeMessenger::default();

        let err = send_direct(&cfg, &messenger, UserId(500), "abc привет")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::BadTarget)));
        assert!(messenger.all().is_empty());
    }

    #[tokio::test]
    async fn missing_message_reports_usage() {
        let cfg = config(Some(500));
        let messenger = FakeMessenger::default();

        let reply = send_direct(&cfg, &messenger, UserId(500), "222").await.unwrap();
        assert!(reply.contains("Формат команды"));
        assert!(messenger.all().is_empty());
    }

    #[tokio::test]
    async fn message_is_delivered_and_confirmed() {
        let cfg = config(Some(500));
        let messenger = FakeMessenger::default();

        let reply = send_direct(&cfg, &messenger, UserId(500), "222 Ваш лот ждет оплаты")
            .await
            .unwrap();
        assert_eq!(reply, "✅ Сообщение отправлено пользователю 222");

        let sent = messenger.all();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, ChatId(222));
        assert!(sent[0].text.contains("Ваш лот ждет оплаты"));
        assert!(sent[0].text.starts_with("🔔 Сообщение от администратора:"));
    }

    #[tokio::test]
    async fn delivery_failure_is_reported_to_the_admin() {
        let cfg = config(Some(500));
        let messenger = FakeMessenger::default();
        messenger.fail_sends.store(true, Ordering::SeqCst);

        let reply = send_direct(&cfg, &messenger, UserId(500), "222 привет")
            .await
            .unwrap();
        assert!(reply.starts_with("❌ Ошибка отправки"));
    }
}
