//! Bid workflow state machine.
//!
//! Drives a chat from lot selection through amount intake, optional phone
//! capture, and commit. The states are carried by the session entry: no entry
//! means idle, `awaiting_phone` distinguishes phone capture from amount
//! intake, and staged fields mark a validated-but-uncommitted bid.
//!
//! Validation reads the current maximum and commit writes a new bet in a
//! separate step, so the floor check is repeated at insert time under a
//! per-lot lock: two bidders racing on one lot cannot both pass against a
//! stale maximum.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};

use crate::{
    config::Config,
    domain::{ChatId, LotId, RowId, UserId},
    errors::{Entity, Error, Rejection},
    evaluator,
    formatting::format_amount,
    messaging::port::MessagingPort,
    notify::Notifier,
    session::{BidSession, SessionStore, StagedBid},
    store::{
        port::RecordStore,
        types::{LotRow, NewBet, NewUser, UserRow},
    },
    utils::iso_timestamp_utc,
    Result,
};

/// Confirmation vocabulary for a suggested amount.
const CONFIRM_WORDS: &[&str] = &["подтвердить", "confirm", "да", "yes"];

/// The user behind an inbound event, as resolved by the messenger adapter.
#[derive(Clone, Debug)]
pub struct Actor {
    pub user_id: UserId,
    pub username: Option<String>,
    pub profile_image: Option<String>,
}

/// Per-lot serialization of the read-validate-write window around bet
/// creation.
#[derive(Default)]
struct LotLocks {
    inner: Mutex<HashMap<LotId, Arc<Mutex<()>>>>,
}

impl LotLocks {
    async fn lock(&self, lot_id: LotId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(lot_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub struct BidWorkflow {
    store: Arc<dyn RecordStore>,
    messenger: Arc<dyn MessagingPort>,
    notifier: Notifier,
    sessions: SessionStore,
    lot_locks: LotLocks,
}

impl BidWorkflow {
    pub fn new(
        cfg: Arc<Config>,
        store: Arc<dyn RecordStore>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            notifier: Notifier::new(cfg, store.clone(), messenger.clone()),
            store,
            messenger,
            sessions: SessionStore::default(),
            lot_locks: LotLocks::default(),
        }
    }

    /// Entry: a lot was selected via deep link or raise button. Presents the
    /// lot and opens a session awaiting an amount.
    pub async fn start_bid(
        &self,
        chat_id: ChatId,
        actor: &Actor,
        lot_id: LotId,
        referral_amount: Option<f64>,
    ) -> Result<()> {
        let lot = self
            .store
            .lot(lot_id)
            .await?
            .ok_or(Error::NotFound(Entity::Lot))?;

        self.ensure_registered(actor).await?;

        let initial_price = lot.initial_price();
        let leader = evaluator::current_leader(self.store.as_ref(), lot_id, initial_price).await?;

        // A referral amount is only suggested when it would actually win.
        let suggested = referral_amount.filter(|a| *a > leader.amount);

        let caption = self
            .lot_caption(&lot, initial_price, leader.amount, suggested)
            .await;
        self.present_lot(chat_id, &lot, &caption).await?;

        self.sessions
            .begin(chat_id, lot_id, actor.user_id, suggested)
            .await;

        if let Some(amount) = suggested {
            self.messenger
                .send_text(
                    chat_id,
                    &format!(
                        "💡 Для подтверждения ставки {} ₽ просто отправьте её или введите другую сумму.",
                        format_amount(amount)
                    ),
                )
                .await?;
        }

        Ok(())
    }

    /// Any non-command text while a session is open: an amount, a
    /// confirmation word, or (when the phone gate is up) a phone number.
    pub async fn handle_text(&self, chat_id: ChatId, actor: &Actor, text: &str) -> Result<()> {
        let Some(session) = self.sessions.get(chat_id).await else {
            return Err(Error::SessionExpired);
        };
        if session.user_id != actor.user_id {
            return Err(Error::SessionExpired);
        }

        if session.awaiting_phone {
            return self.capture_phone(chat_id, actor, &session, text).await;
        }
        self.intake_amount(chat_id, actor, &session, text).await
    }

    async fn intake_amount(
        &self,
        chat_id: ChatId,
        actor: &Actor,
        session: &BidSession,
        text: &str,
    ) -> Result<()> {
        let Some(amount) = parse_bid_input(text, session.suggested_amount) else {
            return Err(Error::Rejected(Rejection::BadAmount {
                suggested: session.suggested_amount,
            }));
        };

        let lot = self
            .store
            .lot(session.lot_id)
            .await?
            .ok_or(Error::NotFound(Entity::Lot))?;
        let leader =
            evaluator::current_leader(self.store.as_ref(), session.lot_id, lot.initial_price())
                .await?;
        let bidder = self
            .store
            .find_user_by_telegram_id(actor.user_id)
            .await?
            .ok_or(Error::NotFound(Entity::User))?;

        if amount <= leader.amount {
            return Err(Error::Rejected(Rejection::BidTooLow {
                floor: leader.amount,
            }));
        }
        if leader.holder == Some(bidder.row_id()) {
            return Err(Error::Rejected(Rejection::SelfRaise));
        }

        self.sessions
            .stage(
                chat_id,
                StagedBid {
                    previous_leader: leader.holder,
                    previous_max: leader.amount,
                    amount,
                },
            )
            .await;

        if !bidder.has_phone() {
            self.sessions.set_awaiting_phone(chat_id, true).await;
            self.messenger
                .send_text(chat_id, "📱 Введите номер телефона (79XXXXXXXXX):")
                .await?;
            return Ok(());
        }

        self.commit(chat_id, actor, session.lot_id).await
    }

    async fn capture_phone(
        &self,
        chat_id: ChatId,
        actor: &Actor,
        session: &BidSession,
        text: &str,
    ) -> Result<()> {
        let phone = text.trim();
        if !is_valid_phone(phone) {
            return Err(Error::Rejected(Rejection::BadPhone));
        }

        let user = self
            .store
            .find_user_by_telegram_id(actor.user_id)
            .await?
            .ok_or(Error::NotFound(Entity::User))?;
        self.store.set_user_phone(user.row_id(), phone).await?;

        if session.staged.is_none() {
            // The bid fields were lost while the phone was being collected.
            self.sessions.clear(chat_id).await;
            return Err(Error::SessionExpired);
        }

        self.sessions.set_awaiting_phone(chat_id, false).await;
        self.commit(chat_id, actor, session.lot_id).await
    }

    async fn commit(&self, chat_id: ChatId, actor: &Actor, lot_id: LotId) -> Result<()> {
        let Some(staged) = self.sessions.staged(chat_id).await else {
            self.sessions.clear(chat_id).await;
            return Err(Error::SessionExpired);
        };

        let lot = self
            .store
            .lot(lot_id)
            .await?
            .ok_or(Error::NotFound(Entity::Lot))?;
        let bidder = self
            .store
            .find_user_by_telegram_id(actor.user_id)
            .await?
            .ok_or(Error::NotFound(Entity::User))?;

        // The floor was checked at intake against a snapshot that may be
        // stale by now; repeat it under the lot lock so the check and the
        // insert form one serialized section. The notification targets the
        // leader observed here, not the one staged earlier.
        let outbid_leader;
        {
            let _guard = self.lot_locks.lock(lot_id).await;

            let leader =
                evaluator::current_leader(self.store.as_ref(), lot_id, lot.initial_price())
                    .await?;
            if staged.amount <= leader.amount {
                self.sessions.clear_staged(chat_id).await;
                return Err(Error::Rejected(Rejection::BidTooLow {
                    floor: leader.amount,
                }));
            }
            if leader.holder == Some(bidder.row_id()) {
                self.sessions.clear_staged(chat_id).await;
                return Err(Error::Rejected(Rejection::SelfRaise));
            }

            // A failure here leaves the staged fields in place for a retry.
            self.store
                .create_bet(NewBet {
                    amount: staged.amount,
                    date: iso_timestamp_utc(),
                    user: vec![bidder.id],
                    lot: lot_id.0,
                })
                .await?;

            outbid_leader = leader.holder;
        }

        info!(
            lot = lot_id.0,
            bidder = bidder.id,
            amount = staged.amount,
            "bet committed"
        );

        // The bet exists; clear the staged fields before anything else so a
        // repeated confirmation cannot commit twice.
        self.sessions.clear_staged(chat_id).await;

        if let Some(previous) = outbid_leader {
            if previous != bidder.row_id() {
                self.notifier
                    .notify_outbid(previous, &lot, staged.amount)
                    .await;
            }
        }
        self.notifier.notify_admin(&lot, staged.amount, &bidder).await;

        if let Err(e) = self.notifier.notify_bidder(chat_id, staged.amount).await {
            error!(error = %e, "bid confirmation message failed");
        }

        Ok(())
    }

    async fn ensure_registered(&self, actor: &Actor) -> Result<UserRow> {
        if let Some(user) = self.store.find_user_by_telegram_id(actor.user_id).await? {
            return Ok(user);
        }

        info!(user = actor.user_id.0, "registering first-time bidder");
        self.store
            .create_user(NewUser {
                telegram_id: actor.user_id.0,
                username: actor.username.clone().unwrap_or_default(),
                profile_image: actor.profile_image.clone().unwrap_or_default(),
            })
            .await
    }

    async fn lot_caption(
        &self,
        lot: &LotRow,
        initial_price: f64,
        current_max: f64,
        suggested: Option<f64>,
    ) -> String {
        let mut artists = Vec::new();
        for link in &lot.artists {
            artists.push(self.artist_name(RowId(link.id)).await);
        }
        let artists = if artists.is_empty() {
            "Нет данных".to_string()
        } else {
            artists.join(", ")
        };

        let suggested_line = suggested
            .map(|a| format!("\nПредложенная ставка: {} ₽", format_amount(a)))
            .unwrap_or_default();

        format!(
            "Автор: {artists}\n\
             Лот: {}\n\
             Номер: {}\n\n\
             Начальная цена: {} ₽\n\
             Текущая цена: {} ₽{suggested_line}\n\n\
             Введите сумму ставки:",
            lot.name,
            lot.lot_number().unwrap_or_else(|| "Нет данных".to_string()),
            format_amount(initial_price),
            format_amount(current_max),
        )
    }

    /// Artist lookups are presentation-only: a failed or empty lookup shows a
    /// placeholder instead of failing the lot entry.
    async fn artist_name(&self, id: RowId) -> String {
        match self.store.artist(id).await {
            Ok(Some(artist)) => artist
                .display_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Нет данных".to_string()),
            Ok(None) => "Нет данных".to_string(),
            Err(e) => {
                warn!(artist = id.0, error = %e, "artist lookup failed");
                "Нет данных".to_string()
            }
        }
    }

    async fn present_lot(&self, chat_id: ChatId, lot: &LotRow, caption: &str) -> Result<()> {
        if let Some(url) = lot.image_url() {
            match self.messenger.send_photo(chat_id, url, caption).await {
                Ok(()) => return Ok(()),
                Err(e) => error!(error = %e, "photo delivery failed, falling back to text"),
            }
        }
        self.messenger.send_text(chat_id, caption).await
    }
}

/// An amount is a confirmation word (when an amount was suggested) or a
/// positive decimal with comma or period as the fractional separator.
fn parse_bid_input(text: &str, suggested: Option<f64>) -> Option<f64> {
    let trimmed = text.trim();

    if let Some(amount) = suggested {
        let lower = trimmed.to_lowercase();
        if CONFIRM_WORDS.contains(&lower.as_str()) {
            return Some(amount);
        }
    }

    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|a| a.is_finite() && *a > 0.0)
}

/// Exactly 11 digits, starting with "79".
fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 11 && phone.starts_with("79") && phone.chars().all(|c| c.is_ascii_digit())
}
