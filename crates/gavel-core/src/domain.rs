/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Record-store row id (Users/Bets/Artists tables).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowId(pub i64);

/// Record-store row id of a lot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LotId(pub i64);
