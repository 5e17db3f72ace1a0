use std::time::Duration;
use std::{collections::HashMap, sync::Arc};

use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Url};

use crate::auth::user_agent;
use crate::row::SnowflakeRow;
use crate::{Error, Result};

pub(super) const SESSION_EXPIRED: &str = "390112";

pub(super) async fn query(
    http: &Client,
    base_url: &Url,
    sql_text: &str,
    session_token: &str,
    timeout: Duration,
) -> Result<Vec<SnowflakeRow>> {
    let request_id = uuid::Uuid::new_v4();
    let mut url = base_url.join("queries/v1/query-request")?;
    url.query_pairs_mut()
        .append_pair("requestId", &request_id.to_string());

    tracing::debug!(%request_id, sql = %sql_text, "sending query request");

    let response = http
        .post(url)
        .header(ACCEPT, "application/snowflake")
        .header(USER_AGENT, user_agent())
        .header(
            AUTHORIZATION,
            format!(r#"Snowflake Token="{session_token}""#),
        )
        .timeout(timeout)
        .json(&QueryRequest { sql_text })
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(Error::Communication(body));
    }

    let response: SnowflakeResponse =
        serde_json::from_str(&body).map_err(|e| Error::Json(e, body))?;

    if let Some(SESSION_EXPIRED) = response.code.as_deref() {
        return Err(Error::SessionExpired);
    }

    if !response.success {
        return Err(Error::Communication(response.message.unwrap_or_default()));
    }

    let data = response
        .data
        .ok_or_else(|| Error::Communication("missing query-response data".to_string()))?;

    if let Some(format) = data.query_result_format {
        if format != "json" {
            return Err(Error::UnsupportedFormat(format));
        }
    }

    let row_types = data.row_types.ok_or_else(|| {
        Error::UnsupportedFormat("the response doesn't contain 'rowtype'".to_string())
    })?;
    let row_set = data.row_set.ok_or_else(|| {
        Error::UnsupportedFormat("the response doesn't contain 'rowset'".to_string())
    })?;

    let column_indices = row_types
        .into_iter()
        .enumerate()
        .map(|(i, row_type)| (row_type.name.to_ascii_uppercase(), i))
        .collect::<HashMap<_, _>>();
    let column_indices = Arc::new(column_indices);
    Ok(row_set
        .into_iter()
        .map(|row| SnowflakeRow {
            row,
            column_indices: Arc::clone(&column_indices),
        })
        .collect())
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    sql_text: &'a str,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQueryResponse {
    #[serde(rename = "rowset")]
    row_set: Option<Vec<Vec<Option<String>>>>,

    #[serde(rename = "rowtype")]
    row_types: Option<Vec<RawQueryResponseRowType>>,

    query_result_format: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQueryResponseRowType {
    name: String,
}

#[derive(serde::Deserialize, Debug)]
struct SnowflakeResponse {
    data: Option<RawQueryResponse>,
    message: Option<String>,
    success: bool,
    code: Option<String>,
}
