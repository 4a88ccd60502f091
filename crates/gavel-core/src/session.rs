//! Per-conversation workflow state.
//!
//! One `BidSession` per chat. The entry lives from lot selection until the
//! chat moves on; staged bid fields only exist between a validated amount and
//! its commit. State is process-local: with multiple worker processes it
//! would have to move out of memory or bids be routed consistently.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::domain::{ChatId, LotId, RowId, UserId};

/// Fields staged between amount validation and commit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StagedBid {
    pub previous_leader: Option<RowId>,
    pub previous_max: f64,
    pub amount: f64,
}

#[derive(Clone, Debug)]
pub struct BidSession {
    pub lot_id: LotId,
    pub user_id: UserId,
    /// Amount carried in from a referral deep link, offered for one-word
    /// confirmation.
    pub suggested_amount: Option<f64>,
    pub awaiting_phone: bool,
    pub staged: Option<StagedBid>,
}

#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<ChatId, BidSession>>,
}

impl SessionStore {
    /// Start (or restart) a bid conversation for this chat. Any prior staged
    /// state for the chat is dropped.
    pub async fn begin(
        &self,
        chat_id: ChatId,
        lot_id: LotId,
        user_id: UserId,
        suggested_amount: Option<f64>,
    ) {
        self.inner.lock().await.insert(
            chat_id,
            BidSession {
                lot_id,
                user_id,
                suggested_amount,
                awaiting_phone: false,
                staged: None,
            },
        );
    }

    pub async fn get(&self, chat_id: ChatId) -> Option<BidSession> {
        self.inner.lock().await.get(&chat_id).cloned()
    }

    pub async fn stage(&self, chat_id: ChatId, staged: StagedBid) {
        if let Some(s) = self.inner.lock().await.get_mut(&chat_id) {
            s.staged = Some(staged);
        }
    }

    pub async fn staged(&self, chat_id: ChatId) -> Option<StagedBid> {
        self.inner.lock().await.get(&chat_id).and_then(|s| s.staged)
    }

    pub async fn set_awaiting_phone(&self, chat_id: ChatId, awaiting: bool) {
        if let Some(s) = self.inner.lock().await.get_mut(&chat_id) {
            s.awaiting_phone = awaiting;
        }
    }

    /// Drop the staged bid fields (and the phone flag) but keep the lot/user
    /// pair so the chat can raise again without re-selecting the lot.
    pub async fn clear_staged(&self, chat_id: ChatId) {
        if let Some(s) = self.inner.lock().await.get_mut(&chat_id) {
            s.staged = None;
            s.awaiting_phone = false;
        }
    }

    /// Back to idle: forget the conversation entirely.
    pub async fn clear(&self, chat_id: ChatId) {
        self.inner.lock().await.remove(&chat_id);
    }

    /// Simulate external loss of the staged fields while the phone gate is
    /// up (test hook).
    #[cfg(test)]
    pub(crate) async fn drop_staged(&self, chat_id: ChatId) {
        if let Some(s) = self.inner.lock().await.get_mut(&chat_id) {
            s.staged = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAT: ChatId = ChatId(10);

    #[tokio::test]
    async fn begin_resets_staged_state() {
        let sessions = SessionStore::default();
        sessions.begin(CHAT, LotId(1), UserId(5), None).await;
        sessions
            .stage(
                CHAT,
                StagedBid {
                    previous_leader: None,
                    previous_max: 1000.0,
                    amount: 1500.0,
                },
            )
            .await;
        sessions.set_awaiting_phone(CHAT, true).await;

        sessions.begin(CHAT, LotId(2), UserId(5), Some(2000.0)).await;
        let s = sessions.get(CHAT).await.unwrap();
        assert_eq!(s.lot_id, LotId(2));
        assert_eq!(s.suggested_amount, Some(2000.0));
        assert!(!s.awaiting_phone);
        assert!(s.staged.is_none());
    }

    #[tokio::test]
    async fn clear_staged_keeps_lot_and_user() {
        let sessions = SessionStore::default();
        sessions.begin(CHAT, LotId(1), UserId(5), None).await;
        sessions
            .stage(
                CHAT,
                StagedBid {
                    previous_leader: Some(RowId(3)),
                    previous_max: 1000.0,
                    amount: 1500.0,
                },
            )
            .await;
        sessions.clear_staged(CHAT).await;

        let s = sessions.get(CHAT).await.unwrap();
        assert_eq!(s.lot_id, LotId(1));
        assert!(s.staged.is_none());
        assert!(sessions.staged(CHAT).await.is_none());
    }

    #[tokio::test]
    async fn clear_forgets_the_chat() {
        let sessions = SessionStore::default();
        sessions.begin(CHAT, LotId(1), UserId(5), None).await;
        sessions.clear(CHAT).await;
        assert!(sessions.get(CHAT).await.is_none());
    }
}
