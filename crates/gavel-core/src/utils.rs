use chrono::Utc;

/// RFC3339 timestamp in UTC, used for Bet rows and log context.
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}
