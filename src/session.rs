use std::time::Duration;

use reqwest::Url;

use crate::{
    Error, Result,
    query::query,
    row::{SnowflakeDecode, SnowflakeRow},
};

const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// An authenticated Snowflake session.
pub struct SnowflakeSession {
    pub(super) http: reqwest::Client,
    pub(super) base_url: Url,
    pub(super) session_token: String,
    pub(super) timeout: Option<Duration>,
}

impl SnowflakeSession {
    async fn query(&self, sql_text: &str) -> Result<Vec<SnowflakeRow>> {
        let rows = query(
            &self.http,
            &self.base_url,
            sql_text,
            &self.session_token,
            self.timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
        )
        .await?;
        Ok(rows)
    }

    /// The role the session is operating under.
    pub async fn current_role(&self) -> Result<String> {
        self.context_value("CURRENT_ROLE").await
    }

    /// The warehouse in use, or `None` when the session has not selected one.
    pub async fn current_warehouse(&self) -> Result<Option<String>> {
        self.context_value("CURRENT_WAREHOUSE").await
    }

    /// The account locator the session is connected to.
    pub async fn current_account(&self) -> Result<String> {
        self.context_value("CURRENT_ACCOUNT").await
    }

    async fn context_value<T: SnowflakeDecode>(&self, function: &str) -> Result<T> {
        let rows = self
            .query(&format!("SELECT {function}() AS {function}"))
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| Error::UnsupportedFormat(format!("{function}() returned no rows")))?;
        row.get(function)
    }
}

impl std::fmt::Debug for SnowflakeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeSession")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
