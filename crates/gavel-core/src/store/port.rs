use async_trait::async_trait;

use crate::{
    domain::{LotId, RowId, UserId},
    store::types::{ArtistRow, BetRow, LotRow, NewBet, NewUser, UserRow},
    Result,
};

/// Access to the external row store.
///
/// The store has no per-lot query for bets, so `list_bets` returns everything
/// and callers filter client-side. Point lookups return `Ok(None)` for a
/// missing row; `Err` is reserved for transport/HTTP failures.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn lot(&self, id: LotId) -> Result<Option<LotRow>>;

    async fn artist(&self, id: RowId) -> Result<Option<ArtistRow>>;

    async fn user(&self, id: RowId) -> Result<Option<UserRow>>;

    /// The store keys users by its own row id; looking one up by messenger
    /// identity means scanning the table.
    async fn find_user_by_telegram_id(&self, telegram_id: UserId) -> Result<Option<UserRow>>;

    async fn create_user(&self, user: NewUser) -> Result<UserRow>;

    async fn set_user_phone(&self, id: RowId, phone: &str) -> Result<()>;

    async fn list_bets(&self) -> Result<Vec<BetRow>>;

    async fn create_bet(&self, bet: NewBet) -> Result<()>;
}
