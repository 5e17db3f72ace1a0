use chrono::Utc;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Url};
use serde_json::{Map, Value, json};

use crate::{Error, Result, SnowflakeAuthMethod, SnowflakeClientConfig, SnowflakeConnectionConfig};

use super::client::{client_app_id, client_app_version, client_environment, user_agent};
use super::key_pair::generate_jwt_from_key_pair;

pub(crate) fn get_base_url(
    config: &SnowflakeClientConfig,
    connection_config: &Option<SnowflakeConnectionConfig>,
) -> Result<Url> {
    if let Some(connection_config) = connection_config {
        let host = &connection_config.host;
        let protocol = connection_config
            .protocol
            .clone()
            .unwrap_or_else(|| "https".to_string());
        let mut url = Url::parse(&format!("{protocol}://{host}"))?;
        if let Some(port) = connection_config.port {
            url.set_port(Some(port))
                .map_err(|_| Error::Url("invalid base url port".to_string()))?;
        }
        Ok(url)
    } else {
        Ok(Url::parse(&format!(
            "https://{}.snowflakecomputing.com",
            config.account
        ))?)
    }
}

fn base_login_request_data(username: &str, config: &SnowflakeClientConfig) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("ACCOUNT_NAME".to_string(), json!(config.account));
    data.insert("LOGIN_NAME".to_string(), json!(username));
    data.insert("CLIENT_APP_ID".to_string(), json!(client_app_id()));
    data.insert("CLIENT_APP_VERSION".to_string(), json!(client_app_version()));
    data.insert(
        "CLIENT_ENVIRONMENT".to_string(),
        client_environment(config.timeout.map(|t| t.as_secs())),
    );
    data
}

/// Login to Snowflake and return a session token.
pub(crate) async fn login(
    http: &Client,
    username: &str,
    auth: &SnowflakeAuthMethod,
    config: &SnowflakeClientConfig,
    connection_config: &Option<SnowflakeConnectionConfig>,
) -> Result<String> {
    let base_url = get_base_url(config, connection_config)?;
    let url = base_url.join("session/v1/login-request")?;

    let mut queries: Vec<(&str, &str)> = vec![];
    if let Some(warehouse) = &config.warehouse {
        queries.push(("warehouse", warehouse));
    }
    if let Some(database) = &config.database {
        queries.push(("databaseName", database));
    }
    if let Some(schema) = &config.schema {
        queries.push(("schemaName", schema));
    }
    if let Some(role) = &config.role {
        queries.push(("roleName", role));
    }

    tracing::debug!(%url, account = %config.account, "sending login request");

    let login_data = login_request_data(username, auth, config)?;
    let mut request = http
        .post(url)
        .query(&queries)
        .header(ACCEPT, "application/json")
        .header(USER_AGENT, user_agent())
        .json(&json!({
            "data": login_data
        }));
    if let Some(timeout) = config.timeout {
        request = request.timeout(timeout);
    }

    let resp = request.send().await?;

    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(Error::Communication(body));
    }

    let parsed: Response = serde_json::from_str(&body).map_err(|e| Error::Json(e, body))?;
    if !parsed.success {
        return Err(Error::Communication(parsed.message.unwrap_or_default()));
    }

    let data = parsed
        .data
        .ok_or_else(|| Error::Communication("missing login-response data".to_string()))?;

    Ok(data.token)
}

fn login_request_data(
    username: &str,
    auth: &SnowflakeAuthMethod,
    config: &SnowflakeClientConfig,
) -> Result<Value> {
    let mut data = base_login_request_data(username, config);
    match auth {
        SnowflakeAuthMethod::Password(password) => {
            data.insert("PASSWORD".to_string(), json!(password));
        }
        SnowflakeAuthMethod::KeyPair { pem, passphrase } => {
            let jwt = generate_jwt_from_key_pair(
                pem,
                passphrase.as_deref(),
                username,
                &config.account,
                Utc::now().timestamp(),
            )?;
            data.insert("TOKEN".to_string(), json!(jwt));
            data.insert("AUTHENTICATOR".to_string(), json!("SNOWFLAKE_JWT"));
        }
        SnowflakeAuthMethod::Oauth { token } => {
            data.insert("TOKEN".to_string(), json!(token));
            data.insert("AUTHENTICATOR".to_string(), json!("OAUTH"));
        }
    }
    Ok(Value::Object(data))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponseData {
    token: String,
}

#[derive(serde::Deserialize)]
struct Response {
    data: Option<LoginResponseData>,
    message: Option<String>,
    success: bool,
}
