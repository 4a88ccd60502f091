use std::{
    env, fs,
    path::Path,
    time::Duration,
};

use crate::{errors::Error, Result};

const DEFAULT_WEB_APP_URL: &str = "https://aspyart.com";

/// Typed configuration, loaded from the environment (with `.env` support).
///
/// Everything except the admin id is required: the bot cannot arbitrate bids
/// without the record store, and cannot talk without the messenger credential.
/// A missing admin id only disables admin notifications and the direct-message
/// command.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    // Record store
    pub baserow_base_url: String,
    pub baserow_token: String,
    pub users_table: String,
    pub lots_table: String,
    pub bets_table: String,
    pub artists_table: String,

    pub admin_chat_id: Option<i64>,

    /// Companion web application, linked from welcome and confirmation
    /// messages.
    pub web_app_url: String,

    /// Upper bound on every record-store request. A timed-out call degrades
    /// to a user-visible error instead of hanging the conversation task.
    pub http_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let baserow_base_url = required("BASEROW_BASE_URL")?;
        let baserow_token = required("BASEROW_TOKEN")?;
        let users_table = required("BASEROW_USERS_ID")?;
        let lots_table = required("BASEROW_LOTS_ID")?;
        let bets_table = required("BASEROW_BETS_ID")?;
        let artists_table = required("BASEROW_ARTISTS_ID")?;

        let admin_chat_id = match env_str("ADMIN_TELEGRAM_ID").and_then(non_empty) {
            Some(raw) => Some(raw.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("ADMIN_TELEGRAM_ID is not a numeric id: {raw}"))
            })?),
            None => None,
        };

        let web_app_url = env_str("WEB_APP_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_WEB_APP_URL.to_string());

        let http_timeout = Duration::from_millis(env_u64("HTTP_TIMEOUT_MS").unwrap_or(15_000));

        Ok(Self {
            telegram_bot_token,
            baserow_base_url,
            baserow_token,
            users_table,
            lots_table,
            bets_table,
            artists_table,
            admin_chat_id,
            web_app_url,
            http_timeout,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
