//! Row types as Baserow returns them with `user_field_names=true`.
//!
//! Baserow serializes number fields as strings and link/file fields as arrays
//! of objects, and rows created through the web UI can carry empty or odd
//! values, so scalar fields are kept loosely typed with accessors that parse
//! on read.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{LotId, RowId, UserId};

/// A link-field entry: `{"id": 7, "value": "..."}`.
#[derive(Clone, Debug, Deserialize)]
pub struct LinkRef {
    pub id: i64,
    #[serde(default)]
    pub value: Option<String>,
}

/// A file-field entry; only the URL is used.
#[derive(Clone, Debug, Deserialize)]
pub struct FileRef {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UserRow {
    pub id: i64,
    #[serde(rename = "TelegramID", default)]
    pub telegram_id: Value,
    #[serde(rename = "Username", default)]
    pub username: Option<String>,
    #[serde(rename = "ProfileImage", default)]
    pub profile_image: Option<String>,
    #[serde(rename = "PhoneNumber", default)]
    pub phone_number: Option<String>,
}

impl UserRow {
    pub fn row_id(&self) -> RowId {
        RowId(self.id)
    }

    pub fn telegram_id(&self) -> Option<UserId> {
        value_to_i64(&self.telegram_id).map(UserId)
    }

    /// An empty string counts as "no phone on file".
    pub fn has_phone(&self) -> bool {
        self.phone_number
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LotRow {
    pub id: i64,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "LotNumber", default)]
    pub lot_number: Value,
    #[serde(rename = "InitialPrice", default)]
    pub initial_price: Value,
    #[serde(rename = "Artists", default)]
    pub artists: Vec<LinkRef>,
    #[serde(rename = "Image", default)]
    pub image: Vec<FileRef>,
}

impl LotRow {
    pub fn lot_id(&self) -> LotId {
        LotId(self.id)
    }

    pub fn initial_price(&self) -> f64 {
        value_to_f64(&self.initial_price).unwrap_or(0.0)
    }

    pub fn lot_number(&self) -> Option<String> {
        value_to_display(&self.lot_number)
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image.first().map(|f| f.url.as_str())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct BetRow {
    pub id: i64,
    #[serde(rename = "BetValue", default)]
    pub amount: Value,
    #[serde(rename = "Lot", default)]
    pub lot: Vec<LinkRef>,
    #[serde(rename = "User", default)]
    pub user: Vec<LinkRef>,
    #[serde(rename = "Date", default)]
    pub date: Option<String>,
}

impl BetRow {
    pub fn lot_id(&self) -> Option<LotId> {
        self.lot.first().map(|l| LotId(l.id))
    }

    pub fn bidder(&self) -> Option<RowId> {
        self.user.first().map(|u| RowId(u.id))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ArtistRow {
    pub id: i64,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
}

/// Payload for registering a first-time bidder.
#[derive(Clone, Debug, Serialize)]
pub struct NewUser {
    #[serde(rename = "TelegramID")]
    pub telegram_id: i64,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "ProfileImage")]
    pub profile_image: String,
}

/// Payload for an accepted bid. `User` is a link list, `Lot` a scalar id;
/// Baserow accepts both write forms for link fields.
#[derive(Clone, Debug, Serialize)]
pub struct NewBet {
    #[serde(rename = "BetValue")]
    pub amount: f64,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "User")]
    pub user: Vec<i64>,
    #[serde(rename = "Lot")]
    pub lot: i64,
}

pub fn value_to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn value_to_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn value_to_display(v: &Value) -> Option<String> {
    match v {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_lot_row_with_string_scalars() {
        let lot: LotRow = serde_json::from_value(json!({
            "id": 12,
            "Name": "Вечное возвращение",
            "LotNumber": "3",
            "InitialPrice": "1000.00",
            "Artists": [{"id": 4, "value": "Евгений Нован"}],
            "Image": [{"url": "https://cdn.example/img.jpg", "name": "img.jpg"}]
        }))
        .unwrap();

        assert_eq!(lot.lot_id(), LotId(12));
        assert_eq!(lot.initial_price(), 1000.0);
        assert_eq!(lot.lot_number().as_deref(), Some("3"));
        assert_eq!(lot.image_url(), Some("https://cdn.example/img.jpg"));
        assert_eq!(lot.artists[0].id, 4);
    }

    #[test]
    fn parses_lot_row_with_missing_fields() {
        let lot: LotRow = serde_json::from_value(json!({"id": 1})).unwrap();
        assert_eq!(lot.initial_price(), 0.0);
        assert_eq!(lot.lot_number(), None);
        assert_eq!(lot.image_url(), None);
        assert!(lot.artists.is_empty());
    }

    #[test]
    fn parses_user_row_and_detects_missing_phone() {
        let user: UserRow = serde_json::from_value(json!({
            "id": 7,
            "TelegramID": "123456789",
            "Username": "collector",
            "ProfileImage": "",
            "PhoneNumber": ""
        }))
        .unwrap();

        assert_eq!(user.telegram_id(), Some(UserId(123_456_789)));
        assert!(!user.has_phone());

        let with_phone: UserRow = serde_json::from_value(json!({
            "id": 8,
            "TelegramID": 42,
            "PhoneNumber": "79991234567"
        }))
        .unwrap();
        assert!(with_phone.has_phone());
    }

    #[test]
    fn parses_bet_row_links() {
        let bet: BetRow = serde_json::from_value(json!({
            "id": 31,
            "BetValue": "1500.00",
            "Lot": [{"id": 12, "value": "Вечное возвращение"}],
            "User": [{"id": 7, "value": "collector"}],
            "Date": "2025-02-01T10:00:00+00:00"
        }))
        .unwrap();

        assert_eq!(bet.lot_id(), Some(LotId(12)));
        assert_eq!(bet.bidder(), Some(RowId(7)));
        assert_eq!(value_to_f64(&bet.amount), Some(1500.0));
    }

    #[test]
    fn new_bet_serializes_with_store_field_names() {
        let bet = NewBet {
            amount: 2000.0,
            date: "2025-02-01T10:00:00+00:00".to_string(),
            user: vec![7],
            lot: 12,
        };
        let v = serde_json::to_value(&bet).unwrap();
        assert_eq!(v["BetValue"], json!(2000.0));
        assert_eq!(v["User"], json!([7]));
        assert_eq!(v["Lot"], json!(12));
    }
}
