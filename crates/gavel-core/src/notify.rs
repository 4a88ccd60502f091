//! Outcome notifications: the outbid former leader, the administrator, and
//! the bidder.

use std::sync::Arc;

use tracing::{error, warn};

use crate::{
    config::Config,
    domain::{ChatId, RowId},
    formatting::{escape_markdown, format_amount},
    messaging::{
        port::MessagingPort,
        types::{InlineButton, InlineKeyboard},
    },
    store::{
        port::RecordStore,
        types::{LotRow, UserRow},
    },
    Result,
};

pub struct Notifier {
    cfg: Arc<Config>,
    store: Arc<dyn RecordStore>,
    messenger: Arc<dyn MessagingPort>,
}

impl Notifier {
    pub fn new(
        cfg: Arc<Config>,
        store: Arc<dyn RecordStore>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            cfg,
            store,
            messenger,
        }
    }

    /// Tell the former leader their bet was beaten. Failures are logged and
    /// swallowed: losing the notice must not fail the commit that triggered
    /// it.
    pub async fn notify_outbid(&self, former_leader: RowId, lot: &LotRow, new_amount: f64) {
        if let Err(e) = self.try_notify_outbid(former_leader, lot, new_amount).await {
            error!(user_row = former_leader.0, error = %e, "outbid notification failed");
        }
    }

    async fn try_notify_outbid(
        &self,
        former_leader: RowId,
        lot: &LotRow,
        new_amount: f64,
    ) -> Result<()> {
        let Some(user) = self.store.user(former_leader).await? else {
            warn!(user_row = former_leader.0, "former leader row missing, skipping outbid notice");
            return Ok(());
        };
        let Some(tg) = user.telegram_id() else {
            warn!(user_row = former_leader.0, "former leader has no messenger id");
            return Ok(());
        };

        let text = format!(
            "♦️ Ваша ставка на лот *«{}»* перебита\\!\nНовая ставка: *{} ₽*",
            escape_markdown(&lot.name),
            escape_markdown(&format_amount(new_amount)),
        );
        let keyboard = InlineKeyboard::single(InlineButton::callback(
            "💰 Повысить ставку",
            format!("raise_bet_{}", lot.id),
        ));

        self.messenger
            .send_markdown(ChatId(tg.0), &text, Some(keyboard))
            .await
    }

    /// Plain-text summary for the administrator. Skipped (with a warning)
    /// when no admin id is configured; delivery failure is logged only.
    pub async fn notify_admin(&self, lot: &LotRow, amount: f64, bidder: &UserRow) {
        let Some(admin) = self.cfg.admin_chat_id else {
            warn!("ADMIN_TELEGRAM_ID is not set, skipping admin notice");
            return;
        };

        let text = format!(
            "🎉 Новая ставка!\n\n\
             Лот: {}\n\
             Номер лота: {}\n\
             Ставка: {} ₽\n\
             TG ID: {}\n\
             Username: @{}\n\
             Телефон: {}",
            lot.name,
            lot.lot_number().unwrap_or_else(|| "Нет данных".to_string()),
            format_amount(amount),
            bidder
                .telegram_id()
                .map(|u| u.0.to_string())
                .unwrap_or_else(|| "нет".to_string()),
            bidder.username.as_deref().unwrap_or("нет"),
            bidder
                .phone_number
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or("не указан"),
        );

        if let Err(e) = self.messenger.send_text(ChatId(admin), &text).await {
            error!(error = %e, "admin notification failed");
        }
    }

    /// Success confirmation with a return-to-application button.
    pub async fn notify_bidder(&self, chat_id: ChatId, amount: f64) -> Result<()> {
        let text = format!(
            "✅ Ставка {} ₽ принята!\n\n\
             Мы сообщим, если вашу ставку перебьют или вы выиграете аукцион.",
            format_amount(amount)
        );
        let keyboard = InlineKeyboard::single(InlineButton::web_app(
            "🖼 Вернуться в приложение",
            self.cfg.web_app_url.clone(),
        ));
        self.messenger.send_keyboard(chat_id, &text, keyboard).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::types::ButtonAction;
    use crate::testutil::{config, lot, user, FakeMessenger, FakeStore};
    use std::sync::atomic::Ordering;

    fn notifier(
        admin: Option<i64>,
    ) -> (Notifier, Arc<FakeStore>, Arc<FakeMessenger>) {
        let store = Arc::new(FakeStore::default());
        let messenger = Arc::new(FakeMessenger::default());
        let n = Notifier::new(config(admin), store.clone(), messenger.clone());
        (n, store, messenger)
    }

    #[tokio::test]
    async fn outbid_notice_names_lot_and_amount_with_raise_button() {
        let (n, store, messenger) = notifier(None);
        store.push_user(user(7, 111, "former", Some("79990000000")));

        let l = lot(12, "Вечное возвращение", "3", "1000", &[]);
        n.notify_outbid(RowId(7), &l, 2000.0).await;

        let sent = messenger.all();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, ChatId(111));
        assert_eq!(sent[0].kind, "markdown");
        assert!(sent[0].text.contains("Вечное возвращение"));
        assert!(sent[0].text.contains("2000"));

        let keyboard = sent[0].keyboard.as_ref().unwrap();
        assert_eq!(
            keyboard.buttons[0].action,
            ButtonAction::Callback("raise_bet_12".to_string())
        );
    }

    #[tokio::test]
    async fn outbid_notice_skips_unresolvable_leader() {
        let (n, _store, messenger) = notifier(None);
        let l = lot(12, "Лот", "3", "1000", &[]);
        n.notify_outbid(RowId(99), &l, 2000.0).await;
        assert!(messenger.all().is_empty());
    }

    #[tokio::test]
    async fn outbid_send_failure_is_swallowed() {
        let (n, store, messenger) = notifier(None);
        store.push_user(user(7, 111, "former", None));
        messenger.fail_sends.store(true, Ordering::SeqCst);

        let l = lot(12, "Лот", "3", "1000", &[]);
        n.notify_outbid(RowId(7), &l, 2000.0).await;
    }

    #[tokio::test]
    async fn admin_notice_carries_bidder_contact_details() {
        let (n, _store, messenger) = notifier(Some(500));
        let l = lot(12, "Лот", "3", "1000", &[]);
        let bidder = user(7, 111, "collector", Some("79991234567"));

        n.notify_admin(&l, 1500.0, &bidder).await;

        let sent = messenger.all();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, ChatId(500));
        assert!(sent[0].text.contains("1500 ₽"));
        assert!(sent[0].text.contains("@collector"));
        assert!(sent[0].text.contains("79991234567"));
    }

    #[tokio::test]
    async fn admin_notice_skipped_without_configured_admin() {
        let (n, _store, messenger) = notifier(None);
        let l = lot(12, "Лот", "3", "1000", &[]);
        let bidder = user(7, 111, "collector", None);

        n.notify_admin(&l, 1500.0, &bidder).await;
        assert!(messenger.all().is_empty());
    }

    #[tokio::test]
    async fn bidder_confirmation_links_back_to_the_app() {
        let (n, _store, messenger) = notifier(None);
        n.notify_bidder(ChatId(42), 1500.0).await.unwrap();

        let sent = messenger.all();
        assert!(sent[0].text.starts_with("✅ Ставка 1500 ₽ принята!"));
        let keyboard = sent[0].keyboard.as_ref().unwrap();
        assert_eq!(
            keyboard.buttons[0].action,
            ButtonAction::WebApp("https://app.example".to_string())
        );
    }
}
