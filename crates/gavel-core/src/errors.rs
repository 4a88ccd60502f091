use crate::formatting::format_amount;

/// Core error type.
///
/// Every failure a conversation task can hit is a variant here, so the
/// handlers map errors to user-facing text exactly once (see
/// [`Error::user_message`]) instead of formatting replies at each call site.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("{0:?} not found")]
    NotFound(Entity),

    #[error("rejected: {0:?}")]
    Rejected(Rejection),

    #[error("session expired")]
    SessionExpired,

    #[error("unauthorized")]
    Unauthorized,

    #[error("record store error: {0}")]
    Store(String),

    #[error("messenger error: {0}")]
    Messenger(String),
}

/// Entities a lookup can fail on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    Lot,
    User,
    Artist,
}

/// Validation failures. The attempt is rejected, the session is retained so
/// the user can retry with corrected input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Rejection {
    /// Input is neither a positive amount nor an accepted confirmation word.
    BadAmount { suggested: Option<f64> },
    /// Candidate amount does not exceed the current maximum.
    BidTooLow { floor: f64 },
    /// The candidate bidder already holds the leading bet.
    SelfRaise,
    /// Phone number is not an 11-digit string starting with 79.
    BadPhone,
    /// Admin command target is not a numeric user id.
    BadTarget,
}

impl Error {
    /// The single mapping from the error taxonomy to user-facing text.
    ///
    /// Upstream failures (store/messenger) deliberately collapse to a generic
    /// message; the detail goes to the log, not to the chat.
    pub fn user_message(&self) -> String {
        match self {
            Error::NotFound(Entity::Lot) => "❌ Лот не найден".to_string(),
            Error::NotFound(Entity::User) => "❌ Пользователь не найден".to_string(),
            Error::NotFound(Entity::Artist) => "❌ Автор не найден".to_string(),
            Error::Rejected(Rejection::BadAmount { suggested }) => match suggested {
                Some(amount) => format!(
                    "❌ Введите корректную сумму или отправьте '{}' для подтверждения предложенной ставки",
                    format_amount(*amount)
                ),
                None => "❌ Введите корректную сумму".to_string(),
            },
            Error::Rejected(Rejection::BidTooLow { floor }) => {
                format!("📉 Ставка должна быть выше {} ₽", format_amount(*floor))
            }
            Error::Rejected(Rejection::SelfRaise) => "❌ Нельзя повышать свою ставку".to_string(),
            Error::Rejected(Rejection::BadPhone) => "❌ Неверный формат номера".to_string(),
            Error::Rejected(Rejection::BadTarget) => {
                "❌ Неверный формат ID пользователя".to_string()
            }
            Error::SessionExpired => "❌ Сессия устарела. Начните заново.".to_string(),
            Error::Unauthorized => "❌ Доступ запрещен".to_string(),
            Error::Config(_) | Error::Store(_) | Error::Messenger(_) => {
                "❌ Произошла ошибка".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
