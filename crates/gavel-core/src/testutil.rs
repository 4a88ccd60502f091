//! In-memory fakes behind the store and messenger ports, shared by the
//! core test modules.

use std::sync::{
    atomic::{AtomicBool, AtomicI64, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    config::Config,
    domain::{ChatId, LotId, RowId, UserId},
    errors::Error,
    messaging::{port::MessagingPort, types::InlineKeyboard},
    store::{
        port::RecordStore,
        types::{ArtistRow, BetRow, LotRow, NewBet, NewUser, UserRow},
    },
    Result,
};

pub(crate) fn config(admin: Option<i64>) -> Arc<Config> {
    Arc::new(Config {
        telegram_bot_token: "x".to_string(),
        baserow_base_url: "http://store.local".to_string(),
        baserow_token: "t".to_string(),
        users_table: "1".to_string(),
        lots_table: "2".to_string(),
        bets_table: "3".to_string(),
        artists_table: "4".to_string(),
        admin_chat_id: admin,
        web_app_url: "https://app.example".to_string(),
        http_timeout: Duration::from_secs(1),
    })
}

// ============== Row builders ==============

pub(crate) fn lot(id: i64, name: &str, number: &str, initial_price: &str, artists: &[i64]) -> LotRow {
    let artists: Vec<Value> = artists
        .iter()
        .map(|a| json!({"id": a, "value": ""}))
        .collect();
    serde_json::from_value(json!({
        "id": id,
        "Name": name,
        "LotNumber": number,
        "InitialPrice": initial_price,
        "Artists": artists,
        "Image": [],
    }))
    .unwrap()
}

pub(crate) fn lot_with_image(id: i64, name: &str, initial_price: &str, url: &str) -> LotRow {
    serde_json::from_value(json!({
        "id": id,
        "Name": name,
        "LotNumber": "1",
        "InitialPrice": initial_price,
        "Artists": [],
        "Image": [{"url": url, "name": "img.jpg"}],
    }))
    .unwrap()
}

pub(crate) fn user(id: i64, telegram_id: i64, username: &str, phone: Option<&str>) -> UserRow {
    serde_json::from_value(json!({
        "id": id,
        "TelegramID": telegram_id.to_string(),
        "Username": username,
        "ProfileImage": "",
        "PhoneNumber": phone.unwrap_or(""),
    }))
    .unwrap()
}

pub(crate) fn artist(id: i64, display_name: &str) -> ArtistRow {
    serde_json::from_value(json!({"id": id, "displayName": display_name})).unwrap()
}

pub(crate) fn bet(id: i64, lot: i64, user: i64, amount: &str) -> BetRow {
    bet_with_amount(id, lot, user, json!(amount))
}

pub(crate) fn bet_with_amount(id: i64, lot: i64, user: i64, amount: Value) -> BetRow {
    serde_json::from_value(json!({
        "id": id,
        "BetValue": amount,
        "Lot": [{"id": lot, "value": ""}],
        "User": [{"id": user, "value": ""}],
        "Date": "2025-02-01T10:00:00+00:00",
    }))
    .unwrap()
}

// ============== FakeStore ==============

#[derive(Default)]
pub(crate) struct FakeStore {
    pub lots: Mutex<Vec<LotRow>>,
    pub users: Mutex<Vec<UserRow>>,
    pub bets: Mutex<Vec<BetRow>>,
    pub artists: Mutex<Vec<ArtistRow>>,
    pub created_bets: Mutex<Vec<NewBet>>,
    pub fail_create_bet: AtomicBool,
    pub fail_create_user: AtomicBool,
    pub fail_set_phone: AtomicBool,
    next_id: AtomicI64,
}

impl FakeStore {
    pub fn push_lot(&self, row: LotRow) {
        self.lots.lock().unwrap().push(row);
    }

    pub fn push_user(&self, row: UserRow) {
        self.users.lock().unwrap().push(row);
    }

    pub fn push_bet(&self, row: BetRow) {
        self.bets.lock().unwrap().push(row);
    }

    pub fn push_artist(&self, row: ArtistRow) {
        self.artists.lock().unwrap().push(row);
    }

    pub fn created_bets(&self) -> Vec<NewBet> {
        self.created_bets.lock().unwrap().clone()
    }

    pub fn user_phone(&self, row_id: i64) -> Option<String> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == row_id)
            .and_then(|u| u.phone_number.clone())
    }

    fn alloc_id(&self) -> i64 {
        1000 + self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn lot(&self, id: LotId) -> Result<Option<LotRow>> {
        Ok(self.lots.lock().unwrap().iter().find(|l| l.id == id.0).cloned())
    }

    async fn artist(&self, id: RowId) -> Result<Option<ArtistRow>> {
        Ok(self
            .artists
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id.0)
            .cloned())
    }

    async fn user(&self, id: RowId) -> Result<Option<UserRow>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id.0).cloned())
    }

    async fn find_user_by_telegram_id(&self, telegram_id: UserId) -> Result<Option<UserRow>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.telegram_id() == Some(telegram_id))
            .cloned())
    }

    async fn create_user(&self, new: NewUser) -> Result<UserRow> {
        if self.fail_create_user.load(Ordering::SeqCst) {
            return Err(Error::Store("create user failed".to_string()));
        }
        let row = user(self.alloc_id(), new.telegram_id, &new.username, None);
        self.users.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn set_user_phone(&self, id: RowId, phone: &str) -> Result<()> {
        if self.fail_set_phone.load(Ordering::SeqCst) {
            return Err(Error::Store("update phone failed".to_string()));
        }
        let mut users = self.users.lock().unwrap();
        let Some(row) = users.iter_mut().find(|u| u.id == id.0) else {
            return Err(Error::Store(format!("no user row {}", id.0)));
        };
        row.phone_number = Some(phone.to_string());
        Ok(())
    }

    async fn list_bets(&self) -> Result<Vec<BetRow>> {
        Ok(self.bets.lock().unwrap().clone())
    }

    async fn create_bet(&self, new: NewBet) -> Result<()> {
        if self.fail_create_bet.load(Ordering::SeqCst) {
            return Err(Error::Store("create bet failed".to_string()));
        }
        // Materialize the row so subsequent leader scans observe the insert.
        let row = bet_with_amount(
            self.alloc_id(),
            new.lot,
            new.user.first().copied().unwrap_or_default(),
            json!(new.amount),
        );
        self.bets.lock().unwrap().push(row);
        self.created_bets.lock().unwrap().push(new);
        Ok(())
    }
}

// ============== FakeMessenger ==============

#[derive(Clone, Debug)]
pub(crate) struct SentMessage {
    pub chat_id: ChatId,
    pub kind: &'static str,
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
}

#[derive(Default)]
pub(crate) struct FakeMessenger {
    pub sent: Mutex<Vec<SentMessage>>,
    pub fail_sends: AtomicBool,
}

impl FakeMessenger {
    pub fn all(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_for(&self, chat_id: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.text.clone())
            .collect()
    }

    fn record(
        &self,
        chat_id: ChatId,
        kind: &'static str,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Messenger("send failed".to_string()));
        }
        self.sent.lock().unwrap().push(SentMessage {
            chat_id,
            kind,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.record(chat_id, "text", text, None)
    }

    async fn send_markdown(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()> {
        self.record(chat_id, "markdown", text, keyboard)
    }

    async fn send_photo(&self, chat_id: ChatId, photo_url: &str, caption: &str) -> Result<()> {
        let _ = photo_url;
        self.record(chat_id, "photo", caption, None)
    }

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<()> {
        self.record(chat_id, "keyboard", text, Some(keyboard))
    }
}
