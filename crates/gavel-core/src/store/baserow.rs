//! Baserow HTTP client (`user_field_names=true` row API).

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::{
    config::Config,
    domain::{LotId, RowId, UserId},
    errors::Error,
    store::{
        port::RecordStore,
        types::{ArtistRow, BetRow, LotRow, NewBet, NewUser, UserRow},
    },
    Result,
};

pub struct BaserowClient {
    http: Client,
    base_url: String,
    token: String,
    users_table: String,
    lots_table: String,
    bets_table: String,
    artists_table: String,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    results: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

impl BaserowClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.http_timeout)
            .build()
            .map_err(|e| Error::Store(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            base_url: cfg.baserow_base_url.trim_end_matches('/').to_string(),
            token: cfg.baserow_token.clone(),
            users_table: cfg.users_table.clone(),
            lots_table: cfg.lots_table.clone(),
            bets_table: cfg.bets_table.clone(),
            artists_table: cfg.artists_table.clone(),
        })
    }

    fn auth(&self) -> String {
        format!("Token {}", self.token)
    }

    fn rows_url(&self, table: &str) -> String {
        format!(
            "{}/database/rows/table/{}/?user_field_names=true",
            self.base_url, table
        )
    }

    fn row_url(&self, table: &str, row_id: i64) -> String {
        format!(
            "{}/database/rows/table/{}/{}/?user_field_names=true",
            self.base_url, table, row_id
        )
    }

    async fn get_row<T: DeserializeOwned>(&self, table: &str, row_id: i64) -> Result<Option<T>> {
        let url = self.row_url(table, row_id);
        let resp = self
            .http
            .get(&url)
            .header(AUTHORIZATION, self.auth())
            .send()
            .await
            .map_err(|e| Error::Store(format!("GET row {row_id} in table {table}: {e}")))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Error::Store(format!(
                "GET row {row_id} in table {table}: HTTP {}",
                resp.status()
            )));
        }

        let row = resp
            .json::<T>()
            .await
            .map_err(|e| Error::Store(format!("decode row {row_id} in table {table}: {e}")))?;
        Ok(Some(row))
    }

    /// List every row of a table, following `next` links. The original client
    /// read only the first page; bet arbitration needs the full table.
    async fn list_rows<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let mut url = self.rows_url(table);
        let mut out = Vec::new();

        loop {
            let resp = self
                .http
                .get(&url)
                .header(AUTHORIZATION, self.auth())
                .send()
                .await
                .map_err(|e| Error::Store(format!("LIST table {table}: {e}")))?;

            if !resp.status().is_success() {
                return Err(Error::Store(format!(
                    "LIST table {table}: HTTP {}",
                    resp.status()
                )));
            }

            let page = resp
                .json::<Page<T>>()
                .await
                .map_err(|e| Error::Store(format!("decode table {table} page: {e}")))?;
            out.extend(page.results);

            match page.next {
                Some(next) => url = next,
                None => break,
            }
        }

        debug!(table, rows = out.len(), "listed table");
        Ok(out)
    }
}

#[async_trait]
impl RecordStore for BaserowClient {
    async fn lot(&self, id: LotId) -> Result<Option<LotRow>> {
        self.get_row(&self.lots_table, id.0).await
    }

    async fn artist(&self, id: RowId) -> Result<Option<ArtistRow>> {
        self.get_row(&self.artists_table, id.0).await
    }

    async fn user(&self, id: RowId) -> Result<Option<UserRow>> {
        self.get_row(&self.users_table, id.0).await
    }

    async fn find_user_by_telegram_id(&self, telegram_id: UserId) -> Result<Option<UserRow>> {
        let users: Vec<UserRow> = self.list_rows(&self.users_table).await?;
        Ok(users
            .into_iter()
            .find(|u| u.telegram_id() == Some(telegram_id)))
    }

    async fn create_user(&self, user: NewUser) -> Result<UserRow> {
        let resp = self
            .http
            .post(self.rows_url(&self.users_table))
            .header(AUTHORIZATION, self.auth())
            .json(&user)
            .send()
            .await
            .map_err(|e| Error::Store(format!("create user: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Store(format!("create user: HTTP {}", resp.status())));
        }

        resp.json::<UserRow>()
            .await
            .map_err(|e| Error::Store(format!("decode created user: {e}")))
    }

    async fn set_user_phone(&self, id: RowId, phone: &str) -> Result<()> {
        let resp = self
            .http
            .patch(self.row_url(&self.users_table, id.0))
            .header(AUTHORIZATION, self.auth())
            .json(&serde_json::json!({ "PhoneNumber": phone }))
            .send()
            .await
            .map_err(|e| Error::Store(format!("update phone for user row {}: {e}", id.0)))?;

        if !resp.status().is_success() {
            return Err(Error::Store(format!(
                "update phone for user row {}: HTTP {}",
                id.0,
                resp.status()
            )));
        }
        Ok(())
    }

    async fn list_bets(&self) -> Result<Vec<BetRow>> {
        self.list_rows(&self.bets_table).await
    }

    async fn create_bet(&self, bet: NewBet) -> Result<()> {
        let resp = self
            .http
            .post(self.rows_url(&self.bets_table))
            .header(AUTHORIZATION, self.auth())
            .json(&bet)
            .send()
            .await
            .map_err(|e| Error::Store(format!("create bet: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Store(format!("create bet: HTTP {}", resp.status())));
        }
        Ok(())
    }
}
